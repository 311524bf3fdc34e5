//! The composed document and its canonical key-value form.
//!
//! The serde representation is the persisted and exported contract: the key
//! names below must not change, and unset optionals serialize as `null`.

use serde::{Deserialize, Serialize};

use crate::color::DEFAULT_COLOR;
use crate::errors::ValidationError;
use crate::limits::{
    MAX_AUTHOR_LEN, MAX_DESCRIPTION_LEN, MAX_FIELDS, MAX_FIELD_NAME_LEN, MAX_FIELD_VALUE_LEN,
    MAX_FOOTER_LEN, MAX_TITLE_LEN,
};

/// One name/value entry of a document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

impl DocumentField {
    pub fn new(name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            inline,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_len("Field name", &self.name, MAX_FIELD_NAME_LEN)?;
        check_len("Field value", &self.value, MAX_FIELD_VALUE_LEN)
    }
}

/// Rich-content document ("embed")
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Document {
    pub title: Option<String>,
    pub description: Option<String>,
    pub color: u32,
    pub fields: Vec<DocumentField>,
    pub author: Option<String>,
    pub footer: Option<String>,
    pub image: Option<String>,
    pub thumbnail: Option<String>,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            title: None,
            description: None,
            color: DEFAULT_COLOR,
            fields: Vec::new(),
            author: None,
            footer: None,
            image: None,
            thumbnail: None,
        }
    }
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the title; `None` or blank text clears it.
    pub fn set_title(&mut self, title: Option<String>) -> Result<(), ValidationError> {
        let title = title.filter(|t| !t.trim().is_empty());
        if let Some(ref t) = title {
            check_len("Title", t, MAX_TITLE_LEN)?;
        }
        self.title = title;
        Ok(())
    }

    pub fn set_description(&mut self, description: String) -> Result<(), ValidationError> {
        check_len("Description", &description, MAX_DESCRIPTION_LEN)?;
        self.description = Some(description);
        Ok(())
    }

    /// Append a field. Rejected, never truncated, once [`MAX_FIELDS`] is
    /// reached.
    pub fn push_field(&mut self, field: DocumentField) -> Result<(), ValidationError> {
        if self.fields.len() >= MAX_FIELDS {
            return Err(ValidationError::FieldLimitExceeded { limit: MAX_FIELDS });
        }
        field.validate()?;
        self.fields.push(field);
        Ok(())
    }

    /// Check every limit at once (used on documents that did not go through
    /// the setters, e.g. ones read from disk).
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(ref t) = self.title {
            check_len("Title", t, MAX_TITLE_LEN)?;
        }
        if let Some(ref d) = self.description {
            check_len("Description", d, MAX_DESCRIPTION_LEN)?;
        }
        if self.fields.len() > MAX_FIELDS {
            return Err(ValidationError::FieldLimitExceeded { limit: MAX_FIELDS });
        }
        for field in &self.fields {
            field.validate()?;
        }
        if let Some(ref a) = self.author {
            check_len("Author", a, MAX_AUTHOR_LEN)?;
        }
        if let Some(ref f) = self.footer {
            check_len("Footer", f, MAX_FOOTER_LEN)?;
        }
        Ok(())
    }

    /// Canonical pretty-printed JSON (two-space indent), the same text an
    /// export delivers.
    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn check_len(part: &'static str, text: &str, max: usize) -> Result<(), ValidationError> {
    let actual = text.chars().count();
    if actual > max {
        return Err(ValidationError::TooLong { part, max, actual });
    }
    Ok(())
}
