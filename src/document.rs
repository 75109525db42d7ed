//! Parsed-HTML query capability.
//!
//! Wraps the `scraper` engine behind the small surface the rest of the crate
//! needs: CSS filtering into owned element snapshots, link and button lookup,
//! sub-tree narrowing for scoped assertions, and a form handle that models
//! browser submission semantics (checked checkboxes only, first-option
//! defaults for selects, buttons excluded from the submitted set).
//!
//! Elements are detached snapshots rather than live node references; a
//! narrowed view is a re-parsed fragment of the matched elements' outer HTML.
//! That keeps documents and views plain owned values that can sit on a scope
//! stack without tying them to the lifetime of the page they came from.

use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

use crate::http::Method;
use crate::selector::normalize_key;

/// A selector string the CSS engine refused to parse.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid CSS selector [{selector}]")]
pub struct QueryError {
    pub selector: String,
}

impl QueryError {
    fn new(selector: &str) -> Self {
        Self {
            selector: selector.to_string(),
        }
    }
}

fn parse_selector(css: &str) -> Result<Selector, QueryError> {
    Selector::parse(css).map_err(|_| QueryError::new(css))
}

/// Collapse runs of whitespace the way rendered text reads.
fn normalize_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The parsed representation of a fetched page, or a narrowed fragment of one.
pub struct Document {
    raw: String,
    tree: Html,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("raw_len", &self.raw.len())
            .finish()
    }
}

impl Document {
    /// Parse a full HTML document body.
    pub fn parse(body: &str) -> Self {
        Self {
            raw: body.to_string(),
            tree: Html::parse_document(body),
        }
    }

    /// Parse an HTML fragment, as produced by [`Document::narrow`].
    pub fn fragment(html: &str) -> Self {
        Self {
            raw: html.to_string(),
            tree: Html::parse_fragment(html),
        }
    }

    /// The source this document was parsed from.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The document's visible text with whitespace collapsed.
    pub fn text(&self) -> String {
        normalize_text(&self.tree.root_element().text().collect::<String>())
    }

    /// All elements matching a CSS selector, as owned snapshots.
    pub fn select(&self, css: &str) -> Result<Vec<Element>, QueryError> {
        let selector = parse_selector(css)?;
        Ok(self
            .tree
            .select(&selector)
            .map(Element::from_ref)
            .collect())
    }

    /// All anchors whose visible text equals `text` exactly.
    pub fn select_links(&self, text: &str) -> Vec<Element> {
        let selector = anchor_selector();
        self.tree
            .select(selector)
            .filter(|anchor| normalize_text(&anchor.text().collect::<String>()) == text)
            .map(Element::from_ref)
            .collect()
    }

    /// The form owning the first submit control matching `label`.
    ///
    /// A control matches by visible text (buttons), or by `value`, `id`, or
    /// `name` attribute (buttons and submit-style inputs).
    pub fn select_button_form(&self, label: &str) -> Option<Form> {
        let forms = form_selector();
        let buttons = button_selector();

        for form in self.tree.select(forms) {
            for control in form.select(buttons) {
                if button_matches(&control, label) {
                    return Some(Form::from_ref(form));
                }
            }
        }

        None
    }

    /// The first form in document order, if any.
    pub fn first_form(&self) -> Option<Form> {
        self.tree.select(form_selector()).next().map(Form::from_ref)
    }

    /// Narrow to the sub-tree(s) matched by `css`.
    ///
    /// All matches are kept, concatenated into one fragment, so a narrowed
    /// view over `li` still covers every list item. Zero matches produce an
    /// empty view; lookups inside it then fail the way the caller expects.
    pub fn narrow(&self, css: &str) -> Result<Document, QueryError> {
        let selector = parse_selector(css)?;
        let combined = self
            .tree
            .select(&selector)
            .map(|element| element.html())
            .collect::<Vec<_>>()
            .join("\n");

        Ok(Document::fragment(&combined))
    }
}

fn anchor_selector() -> &'static Selector {
    static ANCHOR: std::sync::OnceLock<Selector> = std::sync::OnceLock::new();
    ANCHOR.get_or_init(|| Selector::parse("a").expect("static selector"))
}

fn form_selector() -> &'static Selector {
    static FORM: std::sync::OnceLock<Selector> = std::sync::OnceLock::new();
    FORM.get_or_init(|| Selector::parse("form").expect("static selector"))
}

fn button_selector() -> &'static Selector {
    static BUTTON: std::sync::OnceLock<Selector> = std::sync::OnceLock::new();
    BUTTON.get_or_init(|| {
        Selector::parse("button, input[type=\"submit\"], input[type=\"button\"], input[type=\"image\"]")
            .expect("static selector")
    })
}

fn control_selector() -> &'static Selector {
    static CONTROL: std::sync::OnceLock<Selector> = std::sync::OnceLock::new();
    CONTROL.get_or_init(|| Selector::parse("input, textarea, select").expect("static selector"))
}

fn option_selector() -> &'static Selector {
    static OPTION: std::sync::OnceLock<Selector> = std::sync::OnceLock::new();
    OPTION.get_or_init(|| Selector::parse("option").expect("static selector"))
}

fn button_matches(control: &ElementRef<'_>, label: &str) -> bool {
    if normalize_text(&control.text().collect::<String>()) == label {
        return true;
    }

    ["value", "id", "name"]
        .iter()
        .any(|attribute| control.value().attr(attribute) == Some(label))
}

/// An owned snapshot of a matched element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attrs: Vec<(String, String)>,
    text: String,
    raw_text: String,
    inner_html: String,
    html: String,
}

impl Element {
    fn from_ref(element: ElementRef<'_>) -> Self {
        let raw_text = element.text().collect::<String>();
        Self {
            name: element.value().name().to_string(),
            attrs: element
                .value()
                .attrs()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
            text: normalize_text(&raw_text),
            raw_text,
            inner_html: element.inner_html(),
            html: element.html(),
        }
    }

    pub fn node_name(&self) -> &str {
        &self.name
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(attr, _)| attr == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    /// Visible text with whitespace collapsed.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Text content exactly as authored, significant for textarea values.
    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn inner_html(&self) -> &str {
        &self.inner_html
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    /// Match a CSS selector against this element's own sub-tree.
    pub fn select(&self, css: &str) -> Result<Vec<Element>, QueryError> {
        Document::fragment(&self.html).select(css)
    }
}

#[derive(Debug, Clone)]
struct SelectOption {
    submit_value: String,
    selected: bool,
}

#[derive(Debug, Clone)]
enum Control {
    Text {
        name: String,
        value: String,
    },
    Textarea {
        name: String,
        value: String,
    },
    Checkbox {
        name: String,
        value: String,
        checked: bool,
    },
    Radio {
        name: String,
        value: String,
        checked: bool,
    },
    Select {
        name: String,
        multiple: bool,
        options: Vec<SelectOption>,
        override_value: Option<String>,
    },
}

impl Control {
    fn name(&self) -> &str {
        match self {
            Control::Text { name, .. }
            | Control::Textarea { name, .. }
            | Control::Checkbox { name, .. }
            | Control::Radio { name, .. }
            | Control::Select { name, .. } => name,
        }
    }
}

/// A form located on the page, carrying enough state to assemble a submission.
#[derive(Debug, Clone)]
pub struct Form {
    method: Method,
    action: Option<String>,
    controls: Vec<Control>,
    extras: Vec<(String, String)>,
}

impl Form {
    fn from_ref(form: ElementRef<'_>) -> Self {
        let method = form
            .value()
            .attr("method")
            .and_then(Method::parse)
            .unwrap_or(Method::Get);
        let action = form
            .value()
            .attr("action")
            .filter(|action| !action.is_empty())
            .map(str::to_string);

        let mut controls = Vec::new();
        for control in form.select(control_selector()) {
            if control.value().attr("disabled").is_some() {
                continue;
            }
            let Some(name) = control.value().attr("name") else {
                continue;
            };
            let name = name.to_string();

            match control.value().name() {
                "textarea" => controls.push(Control::Textarea {
                    name,
                    value: control.text().collect::<String>(),
                }),
                "select" => {
                    let options = control
                        .select(option_selector())
                        .map(|option| SelectOption {
                            submit_value: option
                                .value()
                                .attr("value")
                                .map(str::to_string)
                                .unwrap_or_else(|| option.text().collect::<String>()),
                            selected: option.value().attr("selected").is_some(),
                        })
                        .collect();
                    controls.push(Control::Select {
                        name,
                        multiple: control.value().attr("multiple").is_some(),
                        options,
                        override_value: None,
                    });
                }
                "input" => {
                    let kind = control
                        .value()
                        .attr("type")
                        .unwrap_or("text")
                        .to_ascii_lowercase();
                    let value = control.value().attr("value").unwrap_or("").to_string();
                    let checked = control.value().attr("checked").is_some();

                    match kind.as_str() {
                        "submit" | "button" | "image" | "reset" | "file" => {}
                        "checkbox" => controls.push(Control::Checkbox {
                            name,
                            value: if value.is_empty() { "on".to_string() } else { value },
                            checked,
                        }),
                        "radio" => controls.push(Control::Radio {
                            name,
                            value,
                            checked,
                        }),
                        _ => controls.push(Control::Text { name, value }),
                    }
                }
                _ => {}
            }
        }

        Self {
            method,
            action,
            controls,
            extras: Vec::new(),
        }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// The form's `action` attribute, when present and non-empty.
    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    /// Apply a textual value to the field addressed by `token`.
    ///
    /// Text inputs and textareas take the value directly; selects mark the
    /// option with that submit value (overriding when none matches); radio
    /// groups check the radio carrying that value. Tokens unknown to the
    /// form are appended to the submitted parameters.
    pub fn apply_text(&mut self, token: &str, value: &str) {
        let key = normalize_key(token);
        let mut matched = false;

        for control in &mut self.controls {
            if normalize_key(control.name()) != key {
                continue;
            }
            matched = true;

            match control {
                Control::Text { value: current, .. }
                | Control::Textarea { value: current, .. } => {
                    *current = value.to_string();
                }
                Control::Checkbox {
                    value: current,
                    checked,
                    ..
                } => {
                    *current = value.to_string();
                    *checked = true;
                }
                Control::Radio { value: current, checked, .. } => {
                    *checked = current.as_str() == value;
                }
                Control::Select {
                    options,
                    override_value,
                    ..
                } => {
                    let mut found = false;
                    for option in options.iter_mut() {
                        option.selected = option.submit_value == value;
                        found |= option.selected;
                    }
                    *override_value = (!found).then(|| value.to_string());
                }
            }
        }

        if !matched {
            self.extras.push((key, value.to_string()));
        }
    }

    /// Apply a checked/unchecked state to the checkbox addressed by `token`.
    ///
    /// A `true` flag for a token the form doesn't know still submits the
    /// field (with the browser default `on`); a `false` flag submits nothing.
    pub fn apply_flag(&mut self, token: &str, flag: bool) {
        let key = normalize_key(token);
        let mut matched = false;

        for control in &mut self.controls {
            if normalize_key(control.name()) != key {
                continue;
            }
            if let Control::Checkbox { checked, .. } = control {
                matched = true;
                *checked = flag;
            }
        }

        if !matched && flag {
            self.extras.push((key, "on".to_string()));
        }
    }

    /// The parameter list a browser would submit, in document order.
    pub fn parameters(&self) -> Vec<(String, String)> {
        let mut parameters = Vec::new();

        for control in &self.controls {
            match control {
                Control::Text { name, value } | Control::Textarea { name, value } => {
                    parameters.push((name.clone(), value.clone()));
                }
                Control::Checkbox {
                    name,
                    value,
                    checked,
                }
                | Control::Radio {
                    name,
                    value,
                    checked,
                } => {
                    if *checked {
                        parameters.push((name.clone(), value.clone()));
                    }
                }
                Control::Select {
                    name,
                    multiple,
                    options,
                    override_value,
                } => {
                    if let Some(value) = override_value {
                        parameters.push((name.clone(), value.clone()));
                        continue;
                    }

                    let selected: Vec<_> =
                        options.iter().filter(|option| option.selected).collect();
                    if selected.is_empty() {
                        // An unselected single select submits its first option.
                        if !multiple {
                            if let Some(first) = options.first() {
                                parameters.push((name.clone(), first.submit_value.clone()));
                            }
                        }
                    } else {
                        for option in selected {
                            parameters.push((name.clone(), option.submit_value.clone()));
                        }
                    }
                }
            }
        }

        parameters.extend(self.extras.iter().cloned());
        parameters
    }
}
