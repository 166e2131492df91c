use crate::mail::{MailError, Mailer};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use sea_orm::entity::prelude::*;
use serde::Serialize;
use thiserror::Error;

/// Maximum length of a username. Longer than the stock 30/150 limits so
/// that Kerberos principals and e-mail style names fit.
pub const USERNAME_MAX_LENGTH: usize = 255;

/// Maximum length of `first_name` and `last_name`.
pub const NAME_MAX_LENGTH: usize = 30;

/// Characters left untouched when building URLs from a username.
const URL_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~')
    .remove(b'/');

/// A registered user account.
///
/// Stored in the legacy `auth_user` table so existing databases keep working.
/// Accounts are never deleted in normal operation; `is_active` is cleared instead.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "auth_user")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Argon2 PHC string, never exposed.
    #[serde(skip_serializing)]
    pub password: String,
    pub last_login: Option<DateTimeUtc>,
    pub is_superuser: bool,
    #[sea_orm(unique)]
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub is_staff: bool,
    pub is_active: bool,
    pub date_joined: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn username(&self) -> &str {
        &self.username
    }

    /// First name plus last name with a space in between, trimmed.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    pub fn short_name(&self) -> &str {
        &self.first_name
    }

    /// Canonical URL of the account page, e.g. `/users/jdoe%40example.com/`.
    pub fn absolute_url(&self) -> String {
        format!("/users/{}/", utf8_percent_encode(&self.username, URL_SAFE))
    }

    /// Sends an e-mail to this account's address only.
    pub async fn email_user(
        &self,
        mailer: &dyn Mailer,
        subject: &str,
        message: &str,
        from_email: Option<&str>,
    ) -> Result<(), MailError> {
        mailer
            .send_mail(subject, message, from_email, std::slice::from_ref(&self.email))
            .await
    }
}

/// Reasons a username is rejected before it reaches the database.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UsernameError {
    #[error("Username must not be empty")]
    Empty,

    #[error("Username must have at most {USERNAME_MAX_LENGTH} characters, got {0}")]
    TooLong(usize),

    #[error("Enter a valid username. Letters, numbers and @/./+/-/_ characters only (found {0:?})")]
    InvalidCharacter(char),
}

/// Checks a username against `^[\w.@+-]+$` and the length limit.
pub fn validate_username(username: &str) -> Result<(), UsernameError> {
    if username.is_empty() {
        return Err(UsernameError::Empty);
    }

    let length = username.chars().count();
    if length > USERNAME_MAX_LENGTH {
        return Err(UsernameError::TooLong(length));
    }

    match username
        .chars()
        .find(|c| !(c.is_alphanumeric() || matches!(c, '_' | '.' | '@' | '+' | '-')))
    {
        Some(c) => Err(UsernameError::InvalidCharacter(c)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample(first: &str, last: &str, username: &str) -> Model {
        Model {
            id: 1,
            password: String::new(),
            last_login: None,
            is_superuser: false,
            username: username.to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: "jane@example.com".to_string(),
            is_staff: false,
            is_active: true,
            date_joined: Utc::now(),
        }
    }

    #[test]
    fn full_name_joins_and_trims() {
        assert_eq!(sample("Jane", "Doe", "jane").full_name(), "Jane Doe");
        assert_eq!(sample("", "", "jane").full_name(), "");
        assert_eq!(sample("Jane", "", "jane").full_name(), "Jane");
        assert_eq!(sample("", "Doe", "jane").full_name(), "Doe");
    }

    #[test]
    fn short_name_is_first_name() {
        assert_eq!(sample("Jane", "Doe", "jane").short_name(), "Jane");
    }

    #[test]
    fn absolute_url_quotes_username() {
        assert_eq!(sample("", "", "jane").absolute_url(), "/users/jane/");
        assert_eq!(
            sample("", "", "jane+doe@example.com").absolute_url(),
            "/users/jane%2Bdoe%40example.com/"
        );
        assert_eq!(sample("", "", "a_b.c-d").absolute_url(), "/users/a_b.c-d/");
    }

    #[test]
    fn username_validation() {
        assert_eq!(validate_username("jane.doe@example.com"), Ok(()));
        assert_eq!(validate_username("host/worker.example.com").unwrap_err(), UsernameError::InvalidCharacter('/'));
        assert_eq!(validate_username(""), Err(UsernameError::Empty));
        assert_eq!(validate_username("with space"), Err(UsernameError::InvalidCharacter(' ')));
        assert_eq!(validate_username("žluťoučký"), Ok(()));

        let long = "a".repeat(USERNAME_MAX_LENGTH);
        assert_eq!(validate_username(&long), Ok(()));
        let too_long = "a".repeat(USERNAME_MAX_LENGTH + 1);
        assert_eq!(
            validate_username(&too_long),
            Err(UsernameError::TooLong(USERNAME_MAX_LENGTH + 1))
        );
    }
}
