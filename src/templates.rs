//! HTML templates.
//!
//! Templates are compiled into the binary and rendered with minijinja.
//! Files ending in `.html` are auto-escaped.

use minijinja::Environment;
use serde::Serialize;
use std::fmt;
use tracing::{error, trace};

/// Template shared by every page; also renders access-denied errors.
pub const BASE_TEMPLATE: &str = "base.html";

const TEMPLATES: &[(&str, &str)] = &[
    (BASE_TEMPLATE, include_str!("../templates/base.html")),
    ("pagination.html", include_str!("../templates/pagination.html")),
    ("user/list.html", include_str!("../templates/user/list.html")),
    ("user/search.html", include_str!("../templates/user/search.html")),
    ("user/detail.html", include_str!("../templates/user/detail.html")),
];

pub struct TemplateRenderer {
    env: Environment<'static>,
}

impl TemplateRenderer {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        for &(name, source) in TEMPLATES {
            trace!("Loading template {}", name);
            env.add_template(name, source)?;
        }
        Ok(Self { env })
    }

    /// Render `name` with the given context.
    pub fn render<S: Serialize>(&self, name: &str, context: S) -> Result<String, minijinja::Error> {
        let template = self.env.get_template(name)?;
        template.render(context).inspect_err(|e| {
            error!("Failed to render template {}: {}", name, e);
        })
    }
}

impl fmt::Debug for TemplateRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateRenderer")
            .field("templates", &TEMPLATES.iter().map(|(name, _)| *name).collect::<Vec<_>>())
            .finish()
    }
}
