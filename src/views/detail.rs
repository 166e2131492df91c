use axum::response::Response;
use sea_orm::{Condition, EntityTrait};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, instrument};

use super::{
    AccessGate, CollectionProvider, Context, TemplateObject, ViewError, ViewRequest, render,
};

/// A detail view with an optional page title and extra context.
pub struct ExtraDetailView<E: EntityTrait> {
    template_name: &'static str,
    context_object_name: &'static str,
    title: Option<String>,
    extra_context: Option<Context>,
    gate: AccessGate,
    provider: Arc<dyn CollectionProvider<E>>,
}

impl<E> ExtraDetailView<E>
where
    E: EntityTrait,
    E::Model: TemplateObject + Send + Sync,
{
    pub fn new(
        template_name: &'static str,
        context_object_name: &'static str,
        gate: AccessGate,
        provider: impl CollectionProvider<E> + 'static,
    ) -> Self {
        Self {
            template_name,
            context_object_name,
            title: None,
            extra_context: None,
            gate,
            provider: Arc::new(provider),
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn extra_context(mut self, extra: Context) -> Self {
        self.extra_context = Some(extra);
        self
    }

    /// Look up the single object matching `lookup` among the visible ones.
    pub async fn object(
        &self,
        request: &ViewRequest<'_>,
        lookup: Condition,
    ) -> Result<E::Model, ViewError> {
        self.gate
            .scope(self.provider.collection(), request.principal)
            .filter(lookup)
            .one(request.db)
            .await?
            .ok_or(ViewError::NotFound)
    }

    /// Try `lookups` in order and return the first object found.
    pub async fn first_match(
        &self,
        request: &ViewRequest<'_>,
        lookups: Vec<Condition>,
    ) -> Result<E::Model, ViewError> {
        for lookup in lookups {
            match self.object(request, lookup).await {
                Err(ViewError::NotFound) => continue,
                found => return found,
            }
        }
        Err(ViewError::NotFound)
    }

    /// Render the first object matched by `lookups`, tried in order.
    #[instrument(skip_all, fields(template = self.template_name))]
    pub async fn get(
        &self,
        request: &ViewRequest<'_>,
        lookups: Vec<Condition>,
    ) -> Result<Response, ViewError> {
        if let Err(denied) = self.gate.dispatch(request.templates, request.principal) {
            return Ok(denied);
        }

        let object = self.first_match(request, lookups).await?;
        debug!("Object found, rendering {}", self.template_name);

        let mut context = Context::new();
        let value = object.to_template();
        context.insert("object".to_string(), value.clone());
        context.insert(self.context_object_name.to_string(), value);
        if let Some(extra) = &self.extra_context {
            context.extend(extra.clone());
        }
        if let Some(title) = &self.title {
            context.insert("title".to_string(), json!(title));
        }

        render(request.templates, self.template_name, &context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_utils::{create_account, setup_test_db};
    use crate::templates::TemplateRenderer;
    use axum::http::StatusCode;
    use common::{AccessMode, Principal};
    use model::entities::account;
    use sea_orm::ColumnTrait;

    fn detail_view(mode: AccessMode) -> ExtraDetailView<account::Entity> {
        ExtraDetailView::new("user/detail.html", "usr", AccessGate::new(mode), account::Entity::find)
            .title("User detail")
    }

    #[tokio::test]
    async fn test_object_lookup() {
        let db = setup_test_db().await;
        let jane = create_account(&db, "jane", false).await;
        let templates = TemplateRenderer::new().unwrap();
        let request = ViewRequest::new(&db, &templates, None, None);
        let view = detail_view(AccessMode::None);

        let found = view
            .object(&request, Condition::all().add(account::Column::Id.eq(jane.id)))
            .await
            .unwrap();
        assert_eq!(found.username, "jane");

        let missing = view
            .object(&request, Condition::all().add(account::Column::Id.eq(jane.id + 100)))
            .await;
        assert!(matches!(missing, Err(ViewError::NotFound)));
    }

    #[tokio::test]
    async fn test_staff_mode_hides_object_from_non_staff() {
        let db = setup_test_db().await;
        let jane = create_account(&db, "jane", false).await;
        let templates = TemplateRenderer::new().unwrap();
        let principal = Principal {
            id: jane.id,
            username: jane.username.clone(),
            is_staff: false,
            is_superuser: false,
        };
        let request = ViewRequest::new(&db, &templates, Some(&principal), None);
        let view = detail_view(AccessMode::Staff);

        let response = view
            .get(&request, vec![Condition::all().add(account::Column::Id.eq(jane.id))])
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let bypass = view
            .object(&request, Condition::all().add(account::Column::Id.eq(jane.id)))
            .await;
        assert!(matches!(bypass, Err(ViewError::NotFound)));
    }

    #[tokio::test]
    async fn test_first_match_prefers_earlier_lookups() {
        let db = setup_test_db().await;
        let numeric = create_account(&db, "2", false).await;
        let bob = create_account(&db, "bob", false).await;
        assert_eq!(bob.id, 2);
        let templates = TemplateRenderer::new().unwrap();
        let request = ViewRequest::new(&db, &templates, None, None);
        let view = detail_view(AccessMode::None);

        let by_username = view
            .first_match(
                &request,
                vec![
                    Condition::all().add(account::Column::Username.eq("2")),
                    Condition::all().add(account::Column::Id.eq(2)),
                ],
            )
            .await
            .unwrap();
        assert_eq!(by_username.id, numeric.id);

        let fallback = view
            .first_match(
                &request,
                vec![
                    Condition::all().add(account::Column::Username.eq("missing")),
                    Condition::all().add(account::Column::Id.eq(bob.id)),
                ],
            )
            .await
            .unwrap();
        assert_eq!(fallback.username, "bob");
    }
}
