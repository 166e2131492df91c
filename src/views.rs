//! Generic list, detail and search views over SeaORM entities.
//!
//! A view is assembled from two injected capabilities: an [`AccessGate`]
//! (who may look) and a [`CollectionProvider`] (what there is to look at).
//! Handlers build a [`ViewRequest`] from the incoming request and hand it to
//! the view, which renders a template or the access-denied page.

pub mod access;
pub mod collection;
pub mod detail;
pub mod list;
pub mod paginate;
pub mod search;

pub use access::AccessGate;
pub use collection::{Collection, CollectionProvider};
pub use detail::ExtraDetailView;
pub use list::ExtraListView;
pub use paginate::Page;
pub use search::{FormData, FormErrors, SearchForm, SearchQuery, SearchView};

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use common::Principal;
use sea_orm::{DatabaseConnection, DbErr, EntityTrait};
use serde_json::Value;
use thiserror::Error;
use tracing::{error, warn};
use url::form_urlencoded;

use crate::templates::TemplateRenderer;

/// Template context.
pub type Context = serde_json::Map<String, Value>;

/// Turns a model into the value a template sees.
pub trait TemplateObject {
    fn to_template(&self) -> Value;
}

/// Everything a view needs from the current request.
#[derive(Debug)]
pub struct ViewRequest<'a> {
    pub db: &'a DatabaseConnection,
    pub templates: &'a TemplateRenderer,
    pub principal: Option<&'a Principal>,
    /// Query string parameters in their original order
    pub params: Vec<(String, String)>,
}

impl<'a> ViewRequest<'a> {
    pub fn new(
        db: &'a DatabaseConnection,
        templates: &'a TemplateRenderer,
        principal: Option<&'a Principal>,
        query: Option<&str>,
    ) -> Self {
        Self {
            db,
            templates,
            principal,
            params: parse_params(query.unwrap_or_default()),
        }
    }

    /// Last value of a query parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .rev()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Decode an `application/x-www-form-urlencoded` string into ordered pairs.
pub fn parse_params(encoded: &str) -> Vec<(String, String)> {
    form_urlencoded::parse(encoded.as_bytes())
        .into_owned()
        .collect()
}

/// Error types for the views
#[derive(Error, Debug)]
pub enum ViewError {
    /// Error from the database operations
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// Error from template rendering
    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    /// The requested object does not exist or is not visible
    #[error("No object found matching the query")]
    NotFound,

    /// The `page` parameter cannot be served
    #[error("Invalid page: {0}")]
    InvalidPage(String),
}

impl IntoResponse for ViewError {
    fn into_response(self) -> Response {
        let status = match &self {
            ViewError::Database(_) | ViewError::Template(_) => {
                error!("View failed: {}", self);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ViewError::NotFound | ViewError::InvalidPage(_) => {
                warn!("{}", self);
                StatusCode::NOT_FOUND
            }
        };

        let message = match status {
            StatusCode::NOT_FOUND => self.to_string(),
            _ => "Internal server error".to_string(),
        };
        (status, Html(format!("<h1>{}</h1><p>{}</p>", status, message))).into_response()
    }
}

/// Render `template` with `context` into a 200 response.
pub(crate) fn render(
    templates: &TemplateRenderer,
    template: &str,
    context: &Context,
) -> Result<Response, ViewError> {
    let body = templates.render(template, context)?;
    Ok(Html(body).into_response())
}

/// Serve `view` directly, or through a [`SearchView`] with form `F` when
/// `searchable` is set.
#[deprecated(note = "build an `ExtraListView` or `SearchView` and call it directly")]
pub async fn object_list<E, F>(
    request: &ViewRequest<'_>,
    view: ExtraListView<E>,
    searchable: bool,
) -> Result<Response, ViewError>
where
    E: EntityTrait,
    E::Model: TemplateObject + Send + Sync,
    F: SearchForm<E>,
{
    warn!(
        template = view.template_name(),
        "object_list is deprecated, use ExtraListView or SearchView instead"
    );
    if searchable {
        SearchView::<E, F>::new(view).get(request).await
    } else {
        view.get(request).await
    }
}

/// Serialize a page of models for the template.
pub(crate) fn template_objects<E>(models: &[E::Model]) -> Vec<Value>
where
    E: EntityTrait,
    E::Model: TemplateObject,
{
    models.iter().map(TemplateObject::to_template).collect()
}
