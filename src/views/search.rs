use axum::response::Response;
use common::Principal;
use sea_orm::{Condition, EntityTrait, Select};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use tracing::{debug, info, instrument};
use url::form_urlencoded;

use super::{Collection, Context, ExtraListView, TemplateObject, ViewError, ViewRequest};

/// Validation errors keyed by field name.
pub type FormErrors = BTreeMap<String, Vec<String>>;

/// Submitted form fields. A repeated field keeps its last value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormData(BTreeMap<String, String>);

impl FormData {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }
}

/// What a valid search form asks for.
pub enum SearchQuery<E: EntityTrait> {
    /// A ready collection that replaces the view's base collection.
    Collection(Select<E>),
    /// A condition applied to the view's base collection.
    Filter(Condition),
}

/// A form that can turn submitted data into a query.
pub trait SearchForm<E: EntityTrait>: Sized + Send + Sync {
    /// Validate submitted data.
    fn clean(data: &FormData) -> Result<Self, FormErrors>;

    fn get_query(&self, principal: Option<&Principal>) -> SearchQuery<E>;
}

/// The current query string without `page`, ready to be appended to
/// pagination links: `?q=foo&page=2` gives `&q=foo`.
pub fn query_suffix(params: &[(String, String)]) -> String {
    let mut remaining = params.iter().filter(|(key, _)| key.as_str() != "page").peekable();
    if remaining.peek().is_none() {
        return String::new();
    }

    let encoded = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(remaining)
        .finish();
    format!("&{}", encoded)
}

/// A list view filtered by a search form.
///
/// GET requests read the form from the query string and go through the same
/// path as a POST with the same fields, so search result pages can be
/// bookmarked and paginated.
pub struct SearchView<E: EntityTrait, F> {
    list: ExtraListView<E>,
    form: PhantomData<fn() -> F>,
}

impl<E, F> SearchView<E, F>
where
    E: EntityTrait,
    E::Model: TemplateObject + Send + Sync,
    F: SearchForm<E>,
{
    pub fn new(list: ExtraListView<E>) -> Self {
        Self {
            list,
            form: PhantomData,
        }
    }

    pub async fn get(&self, request: &ViewRequest<'_>) -> Result<Response, ViewError> {
        let data = FormData::from_pairs(request.params.iter().cloned());
        self.post(request, data).await
    }

    #[instrument(skip_all, fields(template = self.list.template_name()))]
    pub async fn post(&self, request: &ViewRequest<'_>, data: FormData) -> Result<Response, ViewError> {
        if let Err(denied) = self.list.gate().dispatch(request.templates, request.principal) {
            return Ok(denied);
        }

        let (collection, errors) = self.results(request.principal, &data);
        let mut context = Context::new();
        context.insert(
            "form".to_string(),
            json!({
                "data": data,
                "errors": errors,
                "is_valid": errors.is_empty(),
            }),
        );

        let mut context = self.list.context_data(request, &collection, context).await?;
        context.insert("get_vars".to_string(), json!(query_suffix(&request.params)));
        self.list.render(request, &context)
    }

    /// Resolve the result collection for `data`; invalid forms yield no results.
    pub fn results(&self, principal: Option<&Principal>, data: &FormData) -> (Collection<E>, FormErrors) {
        match F::clean(data) {
            Ok(form) => {
                let collection = match form.get_query(principal) {
                    SearchQuery::Collection(select) => {
                        debug!("Search form supplied its own collection");
                        self.list.gate().scope(select, principal)
                    }
                    SearchQuery::Filter(condition) => {
                        self.list.collection(principal).filter(condition)
                    }
                };
                (collection, FormErrors::new())
            }
            Err(errors) => {
                info!("Search form is invalid: {:?}", errors);
                (Collection::Empty, errors)
            }
        }
    }
}
