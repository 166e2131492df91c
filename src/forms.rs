//! Search forms for the HTML views.

use common::Principal;
use model::entities::account;
use sea_orm::sea_query::{Expr, Func, LikeExpr, SimpleExpr};
use sea_orm::{ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder};

use crate::views::{FormData, FormErrors, SearchForm, SearchQuery};

/// Longest accepted search string.
pub const SEARCH_MAX_LENGTH: usize = 255;

/// Search over accounts.
///
/// Fields: `search` (substring of username, name or e-mail, case-insensitive),
/// `staff` and `active` (`yes`, `no` or blank).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountSearchForm {
    pub search: Option<String>,
    pub staff: Option<bool>,
    pub active: Option<bool>,
}

fn clean_flag(data: &FormData, field: &str, errors: &mut FormErrors) -> Option<bool> {
    match data.get(field).map(str::trim).unwrap_or_default() {
        "" => None,
        "yes" | "true" | "1" => Some(true),
        "no" | "false" | "0" => Some(false),
        other => {
            errors.entry(field.to_string()).or_default().push(format!(
                "Select a valid choice. '{}' is not one of the available choices.",
                other
            ));
            None
        }
    }
}

/// Case-insensitive substring match.
fn icontains(column: account::Column, needle: &str) -> SimpleExpr {
    let escaped = needle
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    Expr::expr(Func::lower(Expr::col(column)))
        .like(LikeExpr::new(format!("%{}%", escaped)).escape('\\'))
}

impl AccountSearchForm {
    fn condition(&self) -> Condition {
        let mut condition = Condition::all();
        if let Some(search) = &self.search {
            condition = condition.add(
                Condition::any()
                    .add(icontains(account::Column::Username, search))
                    .add(icontains(account::Column::FirstName, search))
                    .add(icontains(account::Column::LastName, search))
                    .add(icontains(account::Column::Email, search)),
            );
        }
        if let Some(active) = self.active {
            condition = condition.add(account::Column::IsActive.eq(active));
        }
        condition
    }
}

impl SearchForm<account::Entity> for AccountSearchForm {
    fn clean(data: &FormData) -> Result<Self, FormErrors> {
        let mut errors = FormErrors::new();

        let search = data
            .get("search")
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        if let Some(search) = &search {
            let length = search.chars().count();
            if length > SEARCH_MAX_LENGTH {
                errors.entry("search".to_string()).or_default().push(format!(
                    "Ensure this value has at most {} characters (it has {}).",
                    SEARCH_MAX_LENGTH, length
                ));
            }
        }

        let staff = clean_flag(data, "staff", &mut errors);
        let active = clean_flag(data, "active", &mut errors);

        if errors.is_empty() {
            Ok(Self { search, staff, active })
        } else {
            Err(errors)
        }
    }

    fn get_query(&self, _principal: Option<&Principal>) -> SearchQuery<account::Entity> {
        match self.staff {
            // Staff directory: superusers first, then alphabetical.
            Some(true) => SearchQuery::Collection(
                account::Entity::find()
                    .filter(account::Column::IsStaff.eq(true))
                    .filter(self.condition())
                    .order_by_desc(account::Column::IsSuperuser)
                    .order_by_asc(account::Column::Username),
            ),
            Some(false) => SearchQuery::Filter(
                self.condition()
                    .add(account::Column::IsStaff.eq(false)),
            ),
            None => SearchQuery::Filter(self.condition()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(list: &[(&str, &str)]) -> FormData {
        FormData::from_pairs(list.iter().copied())
    }

    #[test]
    fn test_blank_form_is_valid() {
        let form = AccountSearchForm::clean(&FormData::default()).unwrap();
        assert_eq!(form, AccountSearchForm::default());
        assert!(matches!(form.get_query(None), SearchQuery::Filter(_)));
    }

    #[test]
    fn test_fields_are_cleaned() {
        let form = AccountSearchForm::clean(&data(&[
            ("search", "  jane "),
            ("staff", "no"),
            ("active", "yes"),
        ]))
        .unwrap();
        assert_eq!(form.search.as_deref(), Some("jane"));
        assert_eq!(form.staff, Some(false));
        assert_eq!(form.active, Some(true));
    }

    #[test]
    fn test_invalid_choice_is_reported() {
        let errors = AccountSearchForm::clean(&data(&[("staff", "maybe"), ("active", "x")]))
            .unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors["staff"][0].contains("'maybe'"));
    }

    #[test]
    fn test_search_length_is_limited() {
        let long = "a".repeat(SEARCH_MAX_LENGTH + 1);
        let errors = AccountSearchForm::clean(&data(&[("search", long.as_str())])).unwrap_err();
        assert!(errors.contains_key("search"));
    }

    #[test]
    fn test_staff_search_supplies_a_collection() {
        let form = AccountSearchForm::clean(&data(&[("staff", "yes")])).unwrap();
        assert!(matches!(form.get_query(None), SearchQuery::Collection(_)));
    }
}
