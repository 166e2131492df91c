use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // The table keeps its legacy name so pre-existing databases can be reused.
        manager
            .create_table(
                Table::create()
                    .table(AuthUser::Table)
                    .if_not_exists()
                    .col(pk_auto(AuthUser::Id))
                    .col(string_len(AuthUser::Password, 128))
                    .col(timestamp_with_time_zone_null(AuthUser::LastLogin))
                    .col(boolean(AuthUser::IsSuperuser).default(false))
                    .col(string_len(AuthUser::Username, 255).unique_key())
                    .col(string_len(AuthUser::FirstName, 30).default(""))
                    .col(string_len(AuthUser::LastName, 30).default(""))
                    .col(string_len(AuthUser::Email, 254).default(""))
                    .col(boolean(AuthUser::IsStaff).default(false))
                    .col(boolean(AuthUser::IsActive).default(true))
                    .col(
                        timestamp_with_time_zone(AuthUser::DateJoined)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AuthUser::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum AuthUser {
    Table,
    Id,
    Password,
    LastLogin,
    IsSuperuser,
    Username,
    FirstName,
    LastName,
    Email,
    IsStaff,
    IsActive,
    DateJoined,
}
