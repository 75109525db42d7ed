//! Constraints over page content: source, text, elements, and links.

use std::sync::Arc;

use crate::document::Element;

use super::{Constraint, ConstraintError, MatchPattern, PageView};

/// The raw page source contains the given text, literal or entity-escaped.
pub struct HasSource {
    source: String,
}

impl HasSource {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

impl Constraint for HasSource {
    fn matches(&self, view: &PageView<'_>) -> Result<bool, ConstraintError> {
        Ok(MatchPattern::new(&self.source)?.is_match(view.html()))
    }
}

/// The page's visible text contains the given text.
pub struct HasText {
    text: String,
}

impl HasText {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl Constraint for HasText {
    fn matches(&self, view: &PageView<'_>) -> Result<bool, ConstraintError> {
        Ok(MatchPattern::new(&self.text)?.is_match(&view.text()))
    }
}

/// One attribute requirement of [`HasElement`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrRequirement {
    /// The attribute must merely be present.
    Present(String),
    /// The attribute must carry exactly this value.
    Equals(String, String),
}

impl AttrRequirement {
    fn satisfied_by(&self, element: &Element) -> bool {
        match self {
            AttrRequirement::Present(name) => element.has_attr(name),
            AttrRequirement::Equals(name, value) => element.attr(name) == Some(value.as_str()),
        }
    }
}

/// At least one element matches the selector, optionally carrying every
/// required attribute.
pub struct HasElement {
    selector: String,
    attributes: Vec<AttrRequirement>,
}

impl HasElement {
    pub fn new(selector: impl Into<String>, attributes: Vec<AttrRequirement>) -> Self {
        Self {
            selector: selector.into(),
            attributes,
        }
    }
}

impl Constraint for HasElement {
    fn matches(&self, view: &PageView<'_>) -> Result<bool, ConstraintError> {
        let elements = view.document()?.select(&self.selector)?;

        if elements.is_empty() {
            return Ok(false);
        }

        if self.attributes.is_empty() {
            return Ok(true);
        }

        Ok(elements.iter().any(|element| {
            self.attributes
                .iter()
                .all(|requirement| requirement.satisfied_by(element))
        }))
    }
}

/// Some element matching the selector contains the given text.
pub struct HasInElement {
    selector: String,
    text: String,
}

impl HasInElement {
    pub fn new(selector: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            text: text.into(),
        }
    }
}

impl Constraint for HasInElement {
    fn matches(&self, view: &PageView<'_>) -> Result<bool, ConstraintError> {
        let elements = view.document()?.select(&self.selector)?;
        let pattern = MatchPattern::new(&self.text)?;

        Ok(elements
            .iter()
            .any(|element| pattern.is_match(element.inner_html())))
    }
}

/// Resolves a possibly-relative href to the form a URL assertion compares
/// against. The default is identity; a session substitutes a base-URL join.
pub type HrefAbsolutizer = Arc<dyn Fn(&str) -> String>;

/// A link with the given visible text exists, optionally pointing at the
/// given URL.
pub struct HasLink {
    text: String,
    url: Option<String>,
    absolutize: Option<HrefAbsolutizer>,
}

impl HasLink {
    pub fn new(text: impl Into<String>, url: Option<String>) -> Self {
        Self {
            text: text.into(),
            url,
            absolutize: None,
        }
    }

    /// Install a resolver used to compare relative hrefs against an absolute
    /// expectation.
    pub fn with_absolutizer(mut self, absolutize: HrefAbsolutizer) -> Self {
        self.absolutize = Some(absolutize);
        self
    }
}

impl Constraint for HasLink {
    fn matches(&self, view: &PageView<'_>) -> Result<bool, ConstraintError> {
        let links = view.document()?.select_links(&self.text);

        if links.is_empty() {
            return Ok(false);
        }

        // Without a URL the text match alone settles it.
        let Some(expected) = &self.url else {
            return Ok(true);
        };

        Ok(links.iter().any(|link| {
            let href = link.attr("href").unwrap_or("");
            if href == expected {
                return true;
            }
            match &self.absolutize {
                Some(absolutize) => absolutize(href) == *expected,
                None => false,
            }
        }))
    }
}
