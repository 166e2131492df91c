use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use common::{AccessDenied, AccessPolicy, Principal};
use sea_orm::{EntityTrait, Select};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, info};

use super::collection::Collection;
use crate::templates::{BASE_TEMPLATE, TemplateRenderer};

/// Guards a view with an [`AccessPolicy`].
///
/// The gate is consulted twice: once before the view runs ([`AccessGate::dispatch`])
/// and once when the view asks for its collection ([`AccessGate::scope`]).
/// Both go through the same policy evaluation; only the first logs denials at `info`.
#[derive(Clone, Debug)]
pub struct AccessGate {
    policy: Arc<dyn AccessPolicy>,
}

impl AccessGate {
    pub fn new(policy: impl AccessPolicy + 'static) -> Self {
        Self {
            policy: Arc::new(policy),
        }
    }

    pub fn check(&self, principal: Option<&Principal>) -> Result<(), AccessDenied> {
        let decision = self.policy.evaluate(principal);
        if let Err(denied) = &decision {
            info!(
                principal = principal.map(|p| p.username.as_str()).unwrap_or("<anonymous>"),
                "Access denied: {}",
                denied
            );
        }
        decision
    }

    /// `Err` holds the rendered 403 page.
    pub fn dispatch(
        &self,
        templates: &TemplateRenderer,
        principal: Option<&Principal>,
    ) -> Result<(), Response> {
        self.check(principal)
            .map_err(|denied| denied_response(templates, denied))
    }

    /// Restrict `select` to what the principal may see.
    pub fn scope<E: EntityTrait>(
        &self,
        select: Select<E>,
        principal: Option<&Principal>,
    ) -> Collection<E> {
        match self.policy.evaluate(principal) {
            Ok(()) => Collection::Query(select),
            Err(denied) => {
                debug!("Collection scoped to no results: {}", denied);
                Collection::Empty
            }
        }
    }
}

/// The access-denied page, status 403.
pub fn denied_response(templates: &TemplateRenderer, denied: AccessDenied) -> Response {
    let message = denied.to_string();
    let body = match templates.render(BASE_TEMPLATE, json!({ "error_message": message })) {
        Ok(body) => body,
        Err(e) => {
            error!("Failed to render access-denied page: {}", e);
            message
        }
    };
    (StatusCode::FORBIDDEN, Html(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::AccessMode;
    use model::entities::account;

    fn staff() -> Principal {
        Principal {
            id: 1,
            username: "admin".to_string(),
            is_staff: true,
            is_superuser: false,
        }
    }

    #[test]
    fn test_dispatch_and_scope_agree() {
        let modes = [AccessMode::None, AccessMode::Authenticated, AccessMode::Staff];
        let principals = [None, Some(Principal { is_staff: false, ..staff() }), Some(staff())];
        let templates = TemplateRenderer::new().unwrap();

        for mode in modes {
            let gate = AccessGate::new(mode);
            for principal in &principals {
                let dispatched = gate.dispatch(&templates, principal.as_ref()).is_ok();
                let scoped = gate.scope(account::Entity::find(), principal.as_ref());
                assert_eq!(
                    dispatched,
                    !scoped.is_empty_sentinel(),
                    "mode {} disagrees for {:?}",
                    mode,
                    principal
                );
            }
        }
    }

    #[test]
    fn test_denied_response_is_forbidden() {
        let templates = TemplateRenderer::new().unwrap();
        let response = AccessGate::new(AccessMode::Authenticated)
            .dispatch(&templates, None)
            .unwrap_err();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
