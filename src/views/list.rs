use axum::response::Response;
use common::Principal;
use sea_orm::EntityTrait;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, instrument, trace};

use super::{
    AccessGate, Collection, CollectionProvider, Context, Page, TemplateObject, ViewError,
    ViewRequest, render, template_objects,
};

/// A list view with an optional page title, extra context and pagination.
pub struct ExtraListView<E: EntityTrait> {
    template_name: &'static str,
    context_object_name: Option<&'static str>,
    paginate_by: Option<u64>,
    title: Option<String>,
    extra_context: Option<Context>,
    gate: AccessGate,
    provider: Arc<dyn CollectionProvider<E>>,
}

impl<E> ExtraListView<E>
where
    E: EntityTrait,
    E::Model: TemplateObject + Send + Sync,
{
    pub fn new(
        template_name: &'static str,
        gate: AccessGate,
        provider: impl CollectionProvider<E> + 'static,
    ) -> Self {
        Self {
            template_name,
            context_object_name: None,
            paginate_by: None,
            title: None,
            extra_context: None,
            gate,
            provider: Arc::new(provider),
        }
    }

    /// Additional name under which `object_list` is exposed.
    pub fn context_object_name(mut self, name: &'static str) -> Self {
        self.context_object_name = Some(name);
        self
    }

    pub fn paginate_by(mut self, page_size: Option<u64>) -> Self {
        self.paginate_by = page_size.filter(|size| *size > 0);
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn extra_context(mut self, extra: Context) -> Self {
        self.extra_context = Some(extra);
        self
    }

    pub fn template_name(&self) -> &'static str {
        self.template_name
    }

    pub fn gate(&self) -> &AccessGate {
        &self.gate
    }

    /// The provider's collection, scoped by the access gate.
    pub fn collection(&self, principal: Option<&Principal>) -> Collection<E> {
        self.gate.scope(self.provider.collection(), principal)
    }

    #[instrument(skip_all, fields(template = self.template_name))]
    pub async fn get(&self, request: &ViewRequest<'_>) -> Result<Response, ViewError> {
        if let Err(denied) = self.gate.dispatch(request.templates, request.principal) {
            return Ok(denied);
        }

        let collection = self.collection(request.principal);
        let context = self.context_data(request, &collection, Context::new()).await?;
        self.render(request, &context)
    }

    /// Paginate `collection` and build the full template context on top of `context`.
    pub async fn context_data(
        &self,
        request: &ViewRequest<'_>,
        collection: &Collection<E>,
        mut context: Context,
    ) -> Result<Context, ViewError> {
        if collection.is_empty_sentinel() {
            trace!("Nothing visible, rendering an empty list");
        }
        let objects = match self.paginate_by {
            Some(per_page) => {
                let count = collection.count(request.db).await?;
                let page = Page::resolve(request.param("page"), count, per_page)?;
                trace!("Serving page {} of {}", page.number, page.num_pages);
                let models = collection
                    .fetch(request.db, page.offset(), Some(per_page))
                    .await?;

                context.insert("is_paginated".to_string(), json!(page.has_other_pages()));
                context.insert(
                    "paginator".to_string(),
                    json!({ "count": page.count, "num_pages": page.num_pages, "per_page": per_page }),
                );
                context.insert("page_obj".to_string(), json!(page));
                models
            }
            None => {
                context.insert("is_paginated".to_string(), json!(false));
                context.insert("paginator".to_string(), Value::Null);
                context.insert("page_obj".to_string(), Value::Null);
                collection.fetch(request.db, 0, None).await?
            }
        };
        debug!("Listing {} objects", objects.len());

        let objects = Value::Array(template_objects::<E>(&objects));
        if let Some(name) = self.context_object_name {
            context.insert(name.to_string(), objects.clone());
        }
        context.insert("object_list".to_string(), objects);

        if let Some(extra) = &self.extra_context {
            context.extend(extra.clone());
        }
        if let Some(title) = &self.title {
            context.insert("title".to_string(), json!(title));
        }
        Ok(context)
    }

    pub fn render(&self, request: &ViewRequest<'_>, context: &Context) -> Result<Response, ViewError> {
        render(request.templates, self.template_name, context)
    }
}
