//! Constraints over form-field state: values, checked boxes, selections.
//!
//! Unlike the content constraints, these resolve their target through the
//! name-or-id query and treat an unresolvable field as a caller mistake —
//! asserting on the value of a field the page doesn't have fails loudly
//! instead of reporting `false`.

use crate::document::Element;
use crate::selector::{self, CHECKED_KINDS, SELECTION_KINDS, VALUE_KINDS};

use super::{Constraint, ConstraintError, PageView};

fn resolve_field(
    view: &PageView<'_>,
    token: &str,
    kinds: &[&str],
) -> Result<Vec<Element>, ConstraintError> {
    let document = view.document()?;
    Ok(selector::resolve(document, token, kinds)?)
}

/// The field holds exactly the expected value.
pub struct HasValue {
    field: String,
    expected: String,
}

impl HasValue {
    pub fn new(field: impl Into<String>, expected: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            expected: expected.into(),
        }
    }
}

impl Constraint for HasValue {
    fn matches(&self, view: &PageView<'_>) -> Result<bool, ConstraintError> {
        let fields = resolve_field(view, &self.field, VALUE_KINDS)?;
        let field = &fields[0];

        let value = if field.node_name() == "input" {
            field.attr("value").unwrap_or("").to_string()
        } else {
            field.raw_text().to_string()
        };

        Ok(value == self.expected)
    }
}

/// The checkbox (or radio) carries a `checked` attribute.
pub struct IsChecked {
    field: String,
}

impl IsChecked {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }
}

impl Constraint for IsChecked {
    fn matches(&self, view: &PageView<'_>) -> Result<bool, ConstraintError> {
        let fields = resolve_field(view, &self.field, CHECKED_KINDS)?;
        Ok(fields[0].has_attr("checked"))
    }
}

/// The given value is selected — in a select's option list or a radio group.
pub struct IsSelected {
    field: String,
    value: String,
}

impl IsSelected {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Every value currently selected for the resolved field.
    ///
    /// For a select this walks its options wherever they sit (optgroups
    /// included) and keeps those carrying `selected`, so multi-selects yield
    /// several values. For a radio group it is the value of the radio
    /// carrying `checked`, if any.
    fn selected_values(fields: &[Element]) -> Result<Vec<String>, ConstraintError> {
        if fields[0].node_name() == "select" {
            let options = fields[0].select("option")?;
            return Ok(options
                .iter()
                .filter(|option| option.has_attr("selected"))
                .map(option_value)
                .collect());
        }

        Ok(fields
            .iter()
            .filter(|radio| radio.has_attr("checked"))
            .map(|radio| radio.attr("value").unwrap_or("").to_string())
            .take(1)
            .collect())
    }
}

fn option_value(option: &Element) -> String {
    match option.attr("value") {
        Some(value) => value.to_string(),
        None => option.raw_text().to_string(),
    }
}

impl Constraint for IsSelected {
    fn matches(&self, view: &PageView<'_>) -> Result<bool, ConstraintError> {
        let fields = resolve_field(view, &self.field, SELECTION_KINDS)?;
        let selected = Self::selected_values(&fields)?;
        Ok(selected.iter().any(|value| *value == self.value))
    }
}
