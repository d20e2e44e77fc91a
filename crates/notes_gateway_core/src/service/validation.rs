//! Schema checks for create/delete form submissions.
//!
//! # Responsibility
//! - Turn raw form fields into typed mutation input, or a full set of
//!   per-field errors.
//!
//! # Invariants
//! - Validation is synchronous and side-effect free.
//! - Every field is checked; errors are collected, never short-circuited.
//! - The note owner comes from the caller identity, never from the form.
//! - Lengths count UTF-16 code units, as the browser-side form does.

use crate::backend::{BackendChoice, BACKEND_TOKEN_GO, BACKEND_TOKEN_RUST};
use crate::model::note::CallerIdentity;
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

const HYPHENATED_UUID_LEN: usize = 36;

pub const TITLE_MAX_UNITS: usize = 100;
pub const CONTENT_MAX_UNITS: usize = 1000;

pub const FIELD_ID: &str = "id";
pub const FIELD_USER_ID: &str = "userId";
pub const FIELD_TITLE: &str = "title";
pub const FIELD_CONTENT: &str = "content";
pub const FIELD_TYPE: &str = "type";

const MSG_REQUIRED: &str = "Required";
const MSG_INVALID_UUID: &str = "Invalid uuid";

/// Raw submitted form fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields {
    values: BTreeMap<String, String>,
}

impl FormFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

/// Flattened validation failure: form-level and per-field messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldErrors {
    /// No form-level rule exists yet; kept so the serialized shape stays stable.
    form_errors: Vec<String>,
    field_errors: BTreeMap<String, Vec<String>>,
}

impl FieldErrors {
    pub fn push_field(&mut self, field: &str, message: impl Into<String>) {
        self.field_errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.form_errors.is_empty() && self.field_errors.is_empty()
    }

    /// Messages recorded for `field`; empty when the field passed.
    pub fn messages(&self, field: &str) -> &[String] {
        self.field_errors
            .get(field)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Names of failing fields, sorted.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.field_errors.keys().map(String::as_str)
    }
}

/// Mutation kinds accepted from form submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Create,
    Delete,
}

/// Checked create-note input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCreate {
    /// `None` when the form carried the empty placeholder.
    pub id: Option<String>,
    /// Always the caller's identity.
    pub user_id: String,
    pub title: String,
    pub content: String,
}

/// Checked delete-note input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedDelete {
    pub id: String,
    pub backend: BackendChoice,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidatedMutation {
    Create(ValidatedCreate),
    Delete(ValidatedDelete),
}

/// Validates `form` against the schema of `kind`.
pub fn validate(
    form: &FormFields,
    kind: MutationKind,
    caller: &CallerIdentity,
) -> Result<ValidatedMutation, FieldErrors> {
    match kind {
        MutationKind::Create => validate_create(form, caller).map(ValidatedMutation::Create),
        MutationKind::Delete => validate_delete(form).map(ValidatedMutation::Delete),
    }
}

/// Create schema: `id` uuid or empty, `userId` (from caller) uuid,
/// `title` 1..=100 UTF-16 units, `content` 1..=1000 UTF-16 units.
pub fn validate_create(
    form: &FormFields,
    caller: &CallerIdentity,
) -> Result<ValidatedCreate, FieldErrors> {
    let mut errors = FieldErrors::default();

    let id = match form.get(FIELD_ID) {
        None => {
            errors.push_field(FIELD_ID, MSG_REQUIRED);
            None
        }
        Some("") => None,
        Some(value) if is_uuid(value) => Some(value.to_string()),
        Some(_) => {
            errors.push_field(FIELD_ID, MSG_INVALID_UUID);
            None
        }
    };

    if !is_uuid(caller.as_str()) {
        errors.push_field(FIELD_USER_ID, MSG_INVALID_UUID);
    }

    let title = check_length(&mut errors, form, FIELD_TITLE, TITLE_MAX_UNITS);
    let content = check_length(&mut errors, form, FIELD_CONTENT, CONTENT_MAX_UNITS);

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(ValidatedCreate {
        id,
        user_id: caller.as_str().to_string(),
        title: title.unwrap_or_default(),
        content: content.unwrap_or_default(),
    })
}

/// Delete schema: `id` uuid, `type` exactly `go` or `rust` with no fallback.
pub fn validate_delete(form: &FormFields) -> Result<ValidatedDelete, FieldErrors> {
    let mut errors = FieldErrors::default();

    let id = match form.get(FIELD_ID) {
        None => {
            errors.push_field(FIELD_ID, MSG_REQUIRED);
            None
        }
        Some(value) if is_uuid(value) => Some(value.to_string()),
        Some(_) => {
            errors.push_field(FIELD_ID, MSG_INVALID_UUID);
            None
        }
    };

    let backend = match form.get(FIELD_TYPE) {
        None => {
            errors.push_field(FIELD_TYPE, MSG_REQUIRED);
            None
        }
        Some(value) => {
            let parsed = BackendChoice::parse_strict(value);
            if parsed.is_none() {
                errors.push_field(
                    FIELD_TYPE,
                    format!(
                        "Invalid literal value, expected \"{BACKEND_TOKEN_GO}\" or \"{BACKEND_TOKEN_RUST}\""
                    ),
                );
            }
            parsed
        }
    };

    match (id, backend) {
        (Some(id), Some(backend)) if errors.is_empty() => Ok(ValidatedDelete { id, backend }),
        _ => Err(errors),
    }
}

/// Hyphenated 8-4-4-4-12 hex form only.
pub fn is_uuid(value: &str) -> bool {
    value.len() == HYPHENATED_UUID_LEN && Uuid::try_parse(value).is_ok()
}

fn check_length(
    errors: &mut FieldErrors,
    form: &FormFields,
    field: &str,
    max_units: usize,
) -> Option<String> {
    let Some(value) = form.get(field) else {
        errors.push_field(field, MSG_REQUIRED);
        return None;
    };

    let units = value.encode_utf16().count();
    if units < 1 {
        errors.push_field(field, "String must contain at least 1 character(s)");
        return None;
    }
    if units > max_units {
        errors.push_field(
            field,
            format!("String must contain at most {max_units} character(s)"),
        );
        return None;
    }
    Some(value.to_string())
}
