//! Name-or-id field resolution.
//!
//! HTML is ambiguous about how a form field is addressed: markup written by
//! hand targets fields by `id`, generated markup usually by `name`, and
//! array-style names (`tags[]`) are valid in neither a CSS id nor an
//! unescaped id selector. This module turns a bare token into a compound CSS
//! query that covers both conventions at once, optionally restricted to the
//! element kinds that make sense for the lookup at hand.

use thiserror::Error;

use crate::document::{Document, Element, QueryError};

/// Kinds used when any element with the name or id will do.
pub const GENERIC_KINDS: &[&str] = &["*"];

/// Kinds used by the link fallback of `click`.
pub const ANCHOR_KINDS: &[&str] = &["a"];

/// Kinds carrying a textual value.
pub const VALUE_KINDS: &[&str] = &["input", "textarea"];

/// Kinds participating in selection state.
pub const SELECTION_KINDS: &[&str] = &["select", "input[type=\"radio\"]"];

/// Kinds participating in checked state.
pub const CHECKED_KINDS: &[&str] = &["input[type=\"checkbox\"]", "input[type=\"radio\"]"];

/// A name-or-id token resolved to zero elements.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("there is no {} with the name or ID [{}]", .kinds.join(", "), .token)]
pub struct FieldNotFound {
    pub token: String,
    pub kinds: Vec<String>,
}

impl FieldNotFound {
    pub fn new(token: impl Into<String>, kinds: &[&str]) -> Self {
        Self {
            token: token.into(),
            kinds: kinds.iter().map(|kind| (*kind).to_string()).collect(),
        }
    }
}

/// Reduce a field token to the key staged inputs and form controls share.
///
/// `"name"`, `"#name"`, and `"name[]"` all address the same logical field.
pub fn normalize_key(token: &str) -> String {
    let token = token.strip_prefix('#').unwrap_or(token);
    token.strip_suffix("[]").unwrap_or(token).to_string()
}

/// Build the compound CSS query matching `token` by id or by name.
///
/// A leading `#` is stripped; `[` and `]` are escaped so array-style names
/// survive use in an id selector. Each kind contributes an id alternative and
/// a name alternative, all joined into one query.
pub fn name_or_id_query(token: &str, kinds: &[&str]) -> String {
    let name = token.strip_prefix('#').unwrap_or(token);
    let identifier = name.replace('[', "\\[").replace(']', "\\]");

    kinds
        .iter()
        .map(|kind| format!("{kind}#{identifier}, {kind}[name='{name}']"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Resolve `token` against `document`, failing loudly when nothing matches.
///
/// The query itself is always syntactically valid for well-formed tokens, but
/// tokens containing selector metacharacters other than brackets surface as a
/// [`QueryError`] from the CSS engine rather than a panic.
pub fn resolve(
    document: &Document,
    token: &str,
    kinds: &[&str],
) -> Result<Vec<Element>, ResolveError> {
    let query = name_or_id_query(token, kinds);
    let matches = document.select(&query)?;

    if matches.is_empty() {
        return Err(FieldNotFound::new(token, kinds).into());
    }

    Ok(matches)
}

/// Failure modes of [`resolve`].
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Missing(#[from] FieldNotFound),
    #[error(transparent)]
    Query(#[from] QueryError),
}
