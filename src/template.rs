// src/template.rs

//! Liquid template adapter.
//!
//! This is the only place untyped user data meets executable text: commands,
//! env entries, and generated child names all go through [`TemplateEngine::render`].
//! Rendering is pure (no side effects, deterministic) so callers can render
//! the same text any number of times and tests can substitute param maps
//! freely.

use crate::config::model::ParamMap;
use crate::errors::{PipedagError, Result};

/// Shared, stateless-per-call template engine.
pub struct TemplateEngine {
    parser: liquid::Parser,
}

impl TemplateEngine {
    pub fn new() -> Result<Self> {
        let parser = liquid::ParserBuilder::with_stdlib()
            .build()
            .map_err(|e| PipedagError::Other(anyhow::Error::new(e)))?;
        Ok(Self { parser })
    }

    /// Render `text` with `params` bound as template globals.
    ///
    /// Supports `{{ var }}` substitution, the standard filters, and loop
    /// tags. Failures carry the offending source text.
    pub fn render(&self, text: &str, params: &ParamMap) -> Result<String> {
        let template = self.parser.parse(text).map_err(|e| PipedagError::Template {
            text: text.to_string(),
            source: Box::new(e),
        })?;

        let globals = globals_from(params);

        template.render(&globals).map_err(|e| PipedagError::Template {
            text: text.to_string(),
            source: Box::new(e),
        })
    }
}

fn globals_from(params: &ParamMap) -> liquid::Object {
    let mut globals = liquid::Object::new();
    for (key, value) in params.iter() {
        globals.insert(
            liquid::model::KString::from_string(key.clone()),
            value.to_liquid(),
        );
    }
    globals
}
