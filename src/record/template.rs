//! Body scaffolds for new records.
//!
//! Each record kind has a default Markdown scaffold. A record's
//! `schema_ref` can name a different template; configuration may add or
//! override templates. Templates are rendered with `minijinja` and see the
//! record's `id`, `title` and `kind`.

use crate::record::domain::{RecordBuilder, RecordKind};
use minijinja::Environment;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

const TASK_TEMPLATE: &str = "# {{ title }}

## Description

## Acceptance Criteria

- [ ] 
";

const FEATURE_TEMPLATE: &str = "# {{ title }}

## Goal

## Scope

## Acceptance Criteria

- [ ] 
";

const EPIC_TEMPLATE: &str = "# {{ title }}

## Vision

## Features
";

const BUG_TEMPLATE: &str = "# {{ title }}

## Steps to Reproduce

## Expected Behaviour

## Actual Behaviour

## Acceptance Criteria

- [ ] 
";

const ADR_TEMPLATE: &str = "# {{ title }}

## Context

## Decision

## Consequences
";

const GENERIC_TEMPLATE: &str = "# {{ title }}
";

/// Errors raised while rendering templates.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TemplateError {
    /// The template failed to render.
    #[error("failed to render template '{name}': {reason}")]
    Render {
        /// Template name.
        name: String,
        /// Renderer message.
        reason: String,
    },
}

/// Named body templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateCatalog {
    templates: BTreeMap<String, String>,
}

impl Default for TemplateCatalog {
    fn default() -> Self {
        let templates = [
            (RecordKind::Task, TASK_TEMPLATE),
            (RecordKind::Chore, TASK_TEMPLATE),
            (RecordKind::Test, TASK_TEMPLATE),
            (RecordKind::Spike, TASK_TEMPLATE),
            (RecordKind::Feature, FEATURE_TEMPLATE),
            (RecordKind::Epic, EPIC_TEMPLATE),
            (RecordKind::Bug, BUG_TEMPLATE),
            (RecordKind::Adr, ADR_TEMPLATE),
        ]
        .into_iter()
        .map(|(kind, template)| (kind.as_str().to_owned(), template.to_owned()))
        .collect();
        Self { templates }
    }
}

impl TemplateCatalog {
    /// Creates a catalog holding only the built-in templates.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a named template.
    #[must_use]
    pub fn with_template(mut self, name: impl Into<String>, template: impl Into<String>) -> Self {
        self.templates.insert(name.into(), template.into());
        self
    }

    /// Returns the template source registered under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.templates.get(name).map(String::as_str)
    }

    /// Renders the body scaffold for a record under construction.
    ///
    /// The builder's `schema_ref` selects the template when it names one;
    /// otherwise the kind's template is used, falling back to a title-only
    /// scaffold.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Render`] when the template is invalid.
    pub fn render_body(&self, builder: &RecordBuilder) -> Result<String, TemplateError> {
        let (name, source) = builder
            .schema_ref()
            .and_then(|name| self.get(name).map(|source| (name, source)))
            .or_else(|| {
                let kind = builder.kind().as_str();
                self.get(kind).map(|source| (kind, source))
            })
            .unwrap_or(("generic", GENERIC_TEMPLATE));

        let mut environment = Environment::new();
        environment.set_keep_trailing_newline(true);
        environment
            .render_str(source, build_context(builder))
            .map_err(|err| TemplateError::Render {
                name: name.to_owned(),
                reason: err.to_string(),
            })
    }
}

fn build_context(builder: &RecordBuilder) -> Map<String, Value> {
    let mut context = Map::new();
    context.insert("id".to_owned(), Value::from(builder.id().as_str()));
    context.insert("title".to_owned(), Value::from(builder.title()));
    context.insert("kind".to_owned(), Value::from(builder.kind().as_str()));
    context
}
