//! Page constraint framework.
//!
//! Every `see*`/`dont_see*` assertion is implemented by exactly one
//! constraint: a stateless value object with a single
//! [`Constraint::matches`] evaluation over the current page view. Negative
//! assertions never get their own predicate logic; they wrap the positive
//! constraint in [`Negate`].
//!
//! A view is either a live [`Document`] or the raw response body. Text and
//! source constraints work on both; constraints that must walk elements
//! refuse the raw form with [`ConstraintError::NotEvaluable`].

use regex::Regex;
use thiserror::Error;

use crate::document::{Document, QueryError};
use crate::selector::{FieldNotFound, ResolveError};

mod form;
mod page;

pub use form::{HasValue, IsChecked, IsSelected};
pub use page::{AttrRequirement, HasElement, HasInElement, HasLink, HasSource, HasText, HrefAbsolutizer};

/// What a constraint is evaluated against.
#[derive(Debug, Clone, Copy)]
pub enum PageView<'a> {
    /// A parsed document, possibly narrowed to a scoped sub-tree.
    Dom(&'a Document),
    /// The raw response body of a non-HTML response.
    Raw(&'a str),
}

impl<'a> PageView<'a> {
    /// The view's HTML source.
    pub fn html(&self) -> &'a str {
        match self {
            PageView::Dom(document) => document.raw(),
            PageView::Raw(body) => body,
        }
    }

    /// The view's visible text, whitespace collapsed.
    pub fn text(&self) -> String {
        match self {
            PageView::Dom(document) => document.text(),
            PageView::Raw(body) => {
                let stripped = strip_tags(body);
                stripped.split_whitespace().collect::<Vec<_>>().join(" ")
            }
        }
    }

    /// The parsed document, or [`ConstraintError::NotEvaluable`] for a raw
    /// body view.
    pub fn document(&self) -> Result<&'a Document, ConstraintError> {
        match self {
            PageView::Dom(document) => Ok(document),
            PageView::Raw(_) => Err(ConstraintError::NotEvaluable),
        }
    }
}

/// Failures surfaced while evaluating a constraint.
#[derive(Debug, Error)]
pub enum ConstraintError {
    #[error("cannot inspect elements of a response without a parsed document")]
    NotEvaluable,
    #[error(transparent)]
    MissingField(#[from] FieldNotFound),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    Pattern(#[from] regex::Error),
}

impl From<ResolveError> for ConstraintError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::Missing(missing) => ConstraintError::MissingField(missing),
            ResolveError::Query(query) => ConstraintError::Query(query),
        }
    }
}

/// A composable boolean predicate over a page view.
pub trait Constraint {
    fn matches(&self, view: &PageView<'_>) -> Result<bool, ConstraintError>;
}

/// Inverts another constraint's verdict; errors pass through untouched.
pub struct Negate<C>(C);

impl<C: Constraint> Negate<C> {
    pub fn new(inner: C) -> Self {
        Self(inner)
    }
}

impl<C: Constraint> Constraint for Negate<C> {
    fn matches(&self, view: &PageView<'_>) -> Result<bool, ConstraintError> {
        Ok(!self.0.matches(view)?)
    }
}

/// Case-insensitive pattern accepting a literal text and its entity-escaped
/// form as alternatives, so assertions hold whether markup characters arrive
/// literally or escaped.
pub(crate) struct MatchPattern {
    regex: Regex,
}

impl MatchPattern {
    pub(crate) fn new(text: &str) -> Result<Self, regex::Error> {
        let literal = regex::escape(text);
        let escaped = regex::escape(&encode_entities(text));
        let alternatives = if literal == escaped {
            literal
        } else {
            format!("(?:{literal}|{escaped})")
        };

        Ok(Self {
            regex: Regex::new(&format!("(?i){alternatives}"))?,
        })
    }

    pub(crate) fn is_match(&self, haystack: &str) -> bool {
        self.regex.is_match(haystack)
    }
}

fn encode_entities(text: &str) -> String {
    let mut encoded = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => encoded.push_str("&amp;"),
            '<' => encoded.push_str("&lt;"),
            '>' => encoded.push_str("&gt;"),
            '"' => encoded.push_str("&quot;"),
            '\'' => encoded.push_str("&#039;"),
            other => encoded.push(other),
        }
    }
    encoded
}

fn strip_tags(html: &str) -> String {
    static TAG: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    let tag = TAG.get_or_init(|| Regex::new("<[^>]*>").expect("static pattern"));
    tag.replace_all(html, "").into_owned()
}
