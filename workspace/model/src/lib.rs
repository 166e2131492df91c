pub mod entities;
pub mod mail;

// Re-export tracing for use in this crate
pub use tracing;
