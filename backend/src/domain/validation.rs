//! Form validation accumulator and reusable checks.
//!
//! Handlers run every check for a form, even after an earlier one failed, so
//! a single submission surfaces all violations at once. Only the first
//! message recorded for a field is kept.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();

/// Pattern accepted for email addresses (W3C HTML living standard).
pub fn email_regex() -> &'static Regex {
    EMAIL_RE.get_or_init(|| {
        let pattern = concat!(
            r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@",
            r"[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?",
            r"(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
        );
        Regex::new(pattern).unwrap_or_else(|error| panic!("email regex failed to compile: {error}"))
    })
}

/// Field and general error accumulator owned by each form model.
///
/// # Examples
/// ```
/// use snippetbox::domain::validation::{Validator, not_blank};
///
/// let mut v = Validator::default();
/// v.check_field(not_blank(""), "title", "This field can't be blank");
/// v.check_field(not_blank(""), "content", "This field can't be blank");
/// assert!(!v.valid());
/// assert_eq!(v.field_errors().len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validator {
    field_errors: BTreeMap<String, String>,
    general_errors: Vec<String>,
}

impl Validator {
    /// True when no field or general error has been recorded.
    pub fn valid(&self) -> bool {
        self.field_errors.is_empty() && self.general_errors.is_empty()
    }

    /// Record `message` for `field` unless the field already has one.
    pub fn add_field_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.field_errors
            .entry(field.into())
            .or_insert_with(|| message.into());
    }

    pub fn add_general_error(&mut self, message: impl Into<String>) {
        self.general_errors.push(message.into());
    }

    /// Record a field error when `ok` is false.
    pub fn check_field(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.add_field_error(field, message);
        }
    }

    pub fn field_error(&self, field: &str) -> Option<&str> {
        self.field_errors.get(field).map(String::as_str)
    }

    pub fn field_errors(&self) -> &BTreeMap<String, String> {
        &self.field_errors
    }

    pub fn general_errors(&self) -> &[String] {
        &self.general_errors
    }
}

/// True when `value` contains a non-whitespace character.
pub fn not_blank(value: &str) -> bool {
    !value.trim().is_empty()
}

/// True when `value` has at most `n` characters.
pub fn max_chars(value: &str, n: usize) -> bool {
    value.chars().count() <= n
}

/// True when `value` has at least `n` characters.
pub fn min_chars(value: &str, n: usize) -> bool {
    value.chars().count() >= n
}

pub fn matches(value: &str, pattern: &Regex) -> bool {
    pattern.is_match(value)
}

pub fn permitted_value<T: PartialEq>(value: &T, permitted: &[T]) -> bool {
    permitted.contains(value)
}
