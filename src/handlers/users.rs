//! HTML pages for browsing accounts.

use crate::auth::CurrentPrincipal;
use crate::forms::AccountSearchForm;
use crate::handlers::accounts::ordered_accounts;
use crate::schemas::AppState;
use crate::views::{
    AccessGate, ExtraDetailView, ExtraListView, FormData, SearchView, ViewError, ViewRequest,
};
use axum::{
    extract::{Path, RawQuery, State},
    response::Response,
    Form,
};
use model::entities::account;
use sea_orm::{ColumnTrait, Condition, EntityTrait};
use tracing::{debug, instrument, trace};

fn user_list_view(state: &AppState) -> ExtraListView<account::Entity> {
    ExtraListView::new(
        "user/list.html",
        AccessGate::new(state.settings.users_acl_permission),
        ordered_accounts,
    )
    .context_object_name("usr_list")
    .title("Users")
    .paginate_by(state.settings.page_size)
}

fn user_search_view(state: &AppState) -> SearchView<account::Entity, AccountSearchForm> {
    let list = ExtraListView::new(
        "user/search.html",
        AccessGate::new(state.settings.users_acl_permission),
        ordered_accounts,
    )
    .context_object_name("usr_list")
    .title("Search users")
    .paginate_by(state.settings.page_size);
    SearchView::new(list)
}

/// `/users/{key}/` is looked up by username first, then by numeric id.
fn detail_lookups(key: &str) -> Vec<Condition> {
    let mut lookups = vec![Condition::all().add(account::Column::Username.eq(key))];
    if let Ok(id) = key.parse::<i32>() {
        lookups.push(Condition::all().add(account::Column::Id.eq(id)));
    }
    lookups
}

/// Account list page.
#[instrument(skip(state, principal))]
pub async fn user_list(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
    RawQuery(query): RawQuery,
) -> Result<Response, ViewError> {
    trace!("Entering user_list function");
    let request = ViewRequest::new(&state.db, &state.templates, principal.principal(), query.as_deref());
    user_list_view(&state).get(&request).await
}

/// Account search page, GET reads the form from the query string.
#[instrument(skip(state, principal))]
pub async fn user_search(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
    RawQuery(query): RawQuery,
) -> Result<Response, ViewError> {
    trace!("Entering user_search function");
    let request = ViewRequest::new(&state.db, &state.templates, principal.principal(), query.as_deref());
    user_search_view(&state).get(&request).await
}

/// Account search page, submitted form.
#[instrument(skip(state, principal, fields))]
pub async fn user_search_submit(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
    RawQuery(query): RawQuery,
    Form(fields): Form<Vec<(String, String)>>,
) -> Result<Response, ViewError> {
    trace!("Entering user_search_submit function");
    debug!("Search form submitted with {} fields", fields.len());
    let request = ViewRequest::new(&state.db, &state.templates, principal.principal(), query.as_deref());
    user_search_view(&state)
        .post(&request, FormData::from_pairs(fields))
        .await
}

/// Account detail page.
#[instrument(skip(state, principal))]
pub async fn user_detail(
    Path(key): Path<String>,
    State(state): State<AppState>,
    principal: CurrentPrincipal,
) -> Result<Response, ViewError> {
    trace!("Entering user_detail function for {}", key);
    let request = ViewRequest::new(&state.db, &state.templates, principal.principal(), None);
    ExtraDetailView::new(
        "user/detail.html",
        "usr",
        AccessGate::new(state.settings.users_acl_permission),
        account::Entity::find,
    )
    .title("User detail")
    .get(&request, detail_lookups(&key))
    .await
}
