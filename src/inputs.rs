//! Pending-input staging buffer.
//!
//! Interaction calls (`type_text`, `check`, `uncheck`, `select`) don't touch
//! the document; they record the intended value here, keyed by the
//! normalized field name, and the next form submission coalesces the staged
//! map into the request. Staging validates eagerly that *something* on the
//! page answers to the token; whether it is genuinely a form control is the
//! submission's problem.

use std::collections::BTreeMap;

use crate::document::Document;
use crate::selector::{self, normalize_key, FieldNotFound, GENERIC_KINDS};

/// A value staged for a form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Typed text or a selected option token.
    Text(String),
    /// Checkbox state: checked or cleared.
    Flag(bool),
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Flag(value)
    }
}

/// Accumulates staged inputs between navigations.
#[derive(Debug, Default)]
pub struct InputStagingBuffer {
    staged: BTreeMap<String, FieldValue>,
}

impl InputStagingBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a value for the field addressed by `token`.
    ///
    /// The token must resolve to at least one element by name or id within
    /// `scope`; repeated stagings of the same logical field overwrite each
    /// other, whatever mix of `#field`, `field`, and `field[]` spellings the
    /// caller used.
    pub fn stage(
        &mut self,
        scope: &Document,
        token: &str,
        value: FieldValue,
    ) -> Result<(), FieldNotFound> {
        match selector::resolve(scope, token, GENERIC_KINDS) {
            Ok(_) => {
                self.staged.insert(normalize_key(token), value);
                Ok(())
            }
            Err(selector::ResolveError::Missing(missing)) => Err(missing),
            // A token the CSS engine rejects can't name anything on the page.
            Err(selector::ResolveError::Query(_)) => {
                Err(FieldNotFound::new(token, GENERIC_KINDS))
            }
        }
    }

    /// Hand the staged map to a submission, leaving the buffer empty.
    pub fn drain(&mut self) -> BTreeMap<String, FieldValue> {
        std::mem::take(&mut self.staged)
    }

    /// Discard everything staged; runs unconditionally after navigation.
    pub fn clear(&mut self) {
        self.staged.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    #[cfg(test)]
    fn get(&self, key: &str) -> Option<&FieldValue> {
        self.staged.get(key)
    }
}
