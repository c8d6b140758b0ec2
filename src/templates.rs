//! HTML page templates and placeholder substitution.
//!
//! Templates are looked up by name in an optional override directory first
//! (read on every request, so edits show up without a restart) and fall back
//! to the copies embedded in the binary.
//!
//! Substitution is plain string replacement of `{{key}}` markers. Values are
//! NOT HTML-escaped: callers must only pass trusted text.

use rust_embed::Embed;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::secrets::SecretKind;

#[derive(Embed)]
#[folder = "templates"]
struct BuiltinTemplates;

pub const TITLE_MARKER: &str = "{{title}}";
pub const MESSAGE_MARKER: &str = "{{message}}";

/// The pages this server knows how to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    LoginPublic,
    LoginAdmin,
    Protected,
    Error,
}

impl Page {
    /// Login page for a tier.
    pub fn login(kind: SecretKind) -> Self {
        match kind {
            SecretKind::Public => Page::LoginPublic,
            SecretKind::Admin => Page::LoginAdmin,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Page::LoginPublic => "login_public",
            Page::LoginAdmin => "login_admin",
            Page::Protected => "protected",
            Page::Error => "error",
        }
    }

    fn file_name(self) -> String {
        format!("{}.html", self.name())
    }
}

/// Template loading errors
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Template not found: {0}")]
    NotFound(&'static str),

    #[error("IO error reading template: {0}")]
    Io(String),
}

/// Resolves templates from disk overrides and the embedded defaults.
#[derive(Debug, Clone, Default)]
pub struct TemplateStore {
    dir: Option<PathBuf>,
}

impl TemplateStore {
    /// Only the embedded templates.
    pub fn builtin() -> Self {
        Self { dir: None }
    }

    /// Prefer files in `dir`, fall back to the embedded templates.
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }

    /// Raw template text for `page`.
    pub fn load(&self, page: Page) -> Result<String, TemplateError> {
        if let Some(ref dir) = self.dir {
            let path = dir.join(page.file_name());
            match std::fs::read_to_string(&path) {
                Ok(text) => return Ok(text),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    tracing::trace!(path = %path.display(), "No template override, using builtin");
                }
                Err(e) => return Err(TemplateError::Io(format!("{}: {}", path.display(), e))),
            }
        }

        BuiltinTemplates::get(&page.file_name())
            .map(|file| String::from_utf8_lossy(&file.data).into_owned())
            .ok_or(TemplateError::NotFound(page.name()))
    }

    /// Login page for `kind`, with `message` (may be empty) filled in.
    pub fn login_page(&self, kind: SecretKind, message: &str) -> Result<String, TemplateError> {
        Ok(render_login_page(&self.load(Page::login(kind))?, message))
    }

    pub fn error_page(&self, title: &str, message: &str) -> Result<String, TemplateError> {
        Ok(render_error_page(&self.load(Page::Error)?, title, message))
    }

    pub fn protected_page(&self) -> Result<String, TemplateError> {
        self.load(Page::Protected)
    }
}

/// Replace every occurrence of each marker with its value. Markers are
/// substituted in order, and text inserted by one replacement is not rescanned
/// for the same marker.
pub fn render(template: &str, substitutions: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (marker, value) in substitutions {
        out = out.replace(*marker, value);
    }
    out
}

/// Fill `{{title}}` and `{{message}}`.
pub fn render_error_page(template: &str, title: &str, message: &str) -> String {
    render(template, &[(TITLE_MARKER, title), (MESSAGE_MARKER, message)])
}

/// Fill `{{message}}`. Templates without the marker come back unchanged.
pub fn render_login_page(template: &str, message: &str) -> String {
    render(template, &[(MESSAGE_MARKER, message)])
}
