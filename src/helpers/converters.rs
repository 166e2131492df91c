use common::{AccountDto, Principal};
use model::entities::account;
use serde_json::{Value, json};

use crate::views::TemplateObject;

/// Public representation of an account.
pub fn account_to_dto(model: &account::Model) -> AccountDto {
    AccountDto {
        id: model.id,
        username: model.username.clone(),
        first_name: model.first_name.clone(),
        last_name: model.last_name.clone(),
        full_name: model.full_name(),
        email: model.email.clone(),
        is_staff: model.is_staff,
        is_superuser: model.is_superuser,
        is_active: model.is_active,
        date_joined: model.date_joined,
        last_login: model.last_login,
        url: model.absolute_url(),
    }
}

/// The principal a logged-in account acts as.
pub fn account_to_principal(model: &account::Model) -> Principal {
    Principal {
        id: model.id,
        username: model.username.clone(),
        is_staff: model.is_staff,
        is_superuser: model.is_superuser,
    }
}

impl TemplateObject for account::Model {
    fn to_template(&self) -> Value {
        json!(account_to_dto(self))
            .as_object()
            .cloned()
            .map(|mut object| {
                object.insert("short_name".to_string(), json!(self.short_name()));
                object.insert("absolute_url".to_string(), json!(self.absolute_url()));
                Value::Object(object)
            })
            .unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn jane() -> account::Model {
        account::Model {
            id: 7,
            password: "$argon2id$v=19$secret".to_string(),
            last_login: None,
            is_superuser: false,
            username: "jane@example.com".to_string(),
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            email: "jane@example.com".to_string(),
            is_staff: true,
            is_active: true,
            date_joined: Utc::now(),
        }
    }

    #[test]
    fn test_dto_never_carries_the_password() {
        let dto = account_to_dto(&jane());
        assert_eq!(dto.full_name, "Jane Doe");
        assert_eq!(dto.url, "/users/jane%40example.com/");
        let json = serde_json::to_string(&dto).unwrap();
        assert!(!json.contains("argon2"));
    }

    #[test]
    fn test_template_object_has_derived_fields() {
        let value = jane().to_template();
        assert_eq!(value["username"], "jane@example.com");
        assert_eq!(value["full_name"], "Jane Doe");
        assert_eq!(value["short_name"], "Jane");
        assert_eq!(value["absolute_url"], "/users/jane%40example.com/");
        assert!(value.get("password").is_none());
    }

    #[test]
    fn test_principal_flags() {
        let principal = account_to_principal(&jane());
        assert_eq!(principal.id, 7);
        assert!(principal.is_staff);
        assert!(!principal.is_superuser);
    }
}
