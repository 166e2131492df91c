//! This file serves as the root for all SeaORM entity modules.

pub mod account;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::account::Entity as Account;
}
