//! Template loading and placeholder substitution.

use super::tokens::TokenTable;
use super::RenderError;
use log::debug;
use regex::Regex;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::LazyLock;

/// Separator written after every rendered document
pub const DOCUMENT_SEPARATOR: &str = "\n---\n";

/// `{{` and `}}` escape literal braces; `{name}` is a placeholder.
static PLACEHOLDER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{|\}\}|\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern is valid")
});

/// Where template text comes from.
pub trait TemplateSource {
    fn load(&self, id: &str) -> Result<String, RenderError>;
}

/// Templates read from files relative to a root directory.
#[derive(Debug, Clone)]
pub struct DirTemplates {
    root: PathBuf,
}

impl DirTemplates {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl TemplateSource for DirTemplates {
    fn load(&self, id: &str) -> Result<String, RenderError> {
        let path = self.root.join(id);
        std::fs::read_to_string(&path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => RenderError::TemplateNotFound {
                id: id.to_string(),
                path,
            },
            _ => RenderError::Io(source),
        })
    }
}

/// Templates held in memory, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct MapTemplates {
    templates: BTreeMap<String, String>,
}

impl MapTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, id: impl Into<String>, text: impl Into<String>) -> Self {
        self.templates.insert(id.into(), text.into());
        self
    }
}

impl TemplateSource for MapTemplates {
    fn load(&self, id: &str) -> Result<String, RenderError> {
        self.templates
            .get(id)
            .cloned()
            .ok_or_else(|| RenderError::TemplateNotFound {
                id: id.to_string(),
                path: PathBuf::from(id),
            })
    }
}

/// Substitute every placeholder of one template.
///
/// Braces that do not form a placeholder or an escape are copied verbatim.
pub fn substitute(id: &str, text: &str, tokens: &TokenTable) -> Result<String, RenderError> {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for caps in PLACEHOLDER_PATTERN.captures_iter(text) {
        let whole = caps.get(0).expect("capture 0 is always present");
        out.push_str(&text[last..whole.start()]);
        match caps.get(1) {
            Some(name) => {
                let value = tokens.get(name.as_str()).ok_or_else(|| RenderError::MissingToken {
                    template: id.to_string(),
                    token: name.as_str().to_string(),
                })?;
                out.push_str(value);
            }
            None => out.push_str(&whole.as_str()[..1]),
        }
        last = whole.end();
    }
    out.push_str(&text[last..]);

    Ok(out)
}

/// Renders an ordered list of templates into one manifest stream.
pub struct ManifestRenderer<'a> {
    source: &'a dyn TemplateSource,
}

impl<'a> ManifestRenderer<'a> {
    pub fn new(source: &'a dyn TemplateSource) -> Self {
        Self { source }
    }

    /// Render every template, in order, each followed by a document separator.
    pub fn render<S: AsRef<str>>(
        &self,
        template_ids: &[S],
        tokens: &TokenTable,
    ) -> Result<Vec<u8>, RenderError> {
        let mut out = Vec::new();
        self.render_into(template_ids, tokens, &mut out)?;
        Ok(out)
    }

    /// Render into a writer. Nothing is written for a template that fails
    /// to load or substitute, but earlier templates may already be written.
    pub fn render_into<S: AsRef<str>, W: Write>(
        &self,
        template_ids: &[S],
        tokens: &TokenTable,
        out: &mut W,
    ) -> Result<(), RenderError> {
        for id in template_ids {
            let id = id.as_ref();
            let text = self.source.load(id)?;
            let rendered = substitute(id, &text, tokens)?;
            out.write_all(rendered.as_bytes())?;
            out.write_all(DOCUMENT_SEPARATOR.as_bytes())?;
            debug!("Rendered template {}", id);
        }
        Ok(())
    }
}
