//! URL-encoded form decoding.
//!
//! Decoding is two-phase. The body is first deserialized into the form's
//! serde-tagged [`FormDecode::Raw`] shape, which keeps every field as text
//! and defaults missing ones. [`FormDecode::from_raw`] then converts the
//! typed fields; every field that fails to convert contributes one
//! [`FieldViolation`] and the request fails with `INVALID_ARGUMENT` only
//! after all fields were attempted.

use std::collections::HashSet;
use std::fmt::Display;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::de::value::{Error as ValueError, MapDeserializer};

use crate::domain::{Error, FieldViolation};

pub const INVALID_FORM: &str = "invalid form";

/// Name/value pairs of a decoded `application/x-www-form-urlencoded` body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields(Vec<(String, String)>);

impl FormFields {
    /// Parse a raw body.
    pub fn parse(body: &[u8]) -> Result<Self, Error> {
        serde_urlencoded::from_bytes::<Vec<(String, String)>>(body)
            .map(Self)
            .map_err(|error| Error::bad_request(INVALID_FORM, []).with_cause(error))
    }

    /// Deserialize into a serde-tagged struct; the first value of a repeated
    /// name wins.
    ///
    /// # Examples
    /// ```
    /// use serde::Deserialize;
    /// use snippetbox::inbound::http::form::FormFields;
    ///
    /// #[derive(Default, Deserialize)]
    /// #[serde(default)]
    /// struct Search {
    ///     #[serde(rename = "q")]
    ///     query: String,
    ///     page: String,
    /// }
    ///
    /// let fields = FormFields::parse(b"q=Hello+world&q=ignored").expect("valid body");
    /// let search: Search = fields.deserialize().expect("deserializes");
    /// assert_eq!(search.query, "Hello world");
    /// assert_eq!(search.page, "");
    /// ```
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, Error> {
        let mut seen = HashSet::new();
        let first_values = self
            .0
            .iter()
            .filter(|(name, _)| seen.insert(name.as_str()))
            .map(|(name, value)| (name.clone(), value.clone()));
        T::deserialize(MapDeserializer::<_, ValueError>::new(first_values))
            .map_err(|error| Error::bad_request(INVALID_FORM, []).with_cause(error))
    }
}

/// Convert the text of field `name`.
///
/// Empty values yield `None` without a violation; values that fail to
/// convert yield `None` and record one violation.
pub fn parse_field<T>(name: &str, raw: &str, violations: &mut Vec<FieldViolation>) -> Option<T>
where
    T: FromStr,
    T::Err: Display,
{
    if raw.is_empty() {
        return None;
    }
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(error) => {
            violations.push(FieldViolation::new(name, error.to_string()));
            None
        }
    }
}

/// Typed form model built from its serde-tagged text representation.
pub trait FormDecode: Sized {
    /// Field-tagged text shape of the submitted body.
    type Raw: DeserializeOwned;

    /// Build the model, pushing one violation per field that failed to convert.
    fn from_raw(raw: Self::Raw, violations: &mut Vec<FieldViolation>) -> Self;
}

/// Decode `body` into `T`, failing with `INVALID_ARGUMENT` when any field
/// failed to convert.
pub fn decode_post_form<T: FormDecode>(body: &[u8]) -> Result<T, Error> {
    let raw: T::Raw = FormFields::parse(body)?.deserialize()?;
    let mut violations = Vec::new();
    let form = T::from_raw(raw, &mut violations);
    if violations.is_empty() {
        Ok(form)
    } else {
        Err(Error::bad_request(INVALID_FORM, violations))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde::Deserialize;

    use super::*;
    use crate::domain::{ErrorCode, ErrorDetail};

    #[derive(Debug, PartialEq)]
    struct Sample {
        title: String,
        expires: u32,
        count: i64,
    }

    #[derive(Default, Deserialize)]
    #[serde(default)]
    struct RawSample {
        title: String,
        #[serde(rename = "expires_in")]
        expires: String,
        count: String,
    }

    impl FormDecode for Sample {
        type Raw = RawSample;

        fn from_raw(raw: RawSample, violations: &mut Vec<FieldViolation>) -> Self {
            Self {
                title: raw.title,
                expires: parse_field("expires_in", &raw.expires, violations).unwrap_or_default(),
                count: parse_field("count", &raw.count, violations).unwrap_or_default(),
            }
        }
    }

    #[rstest]
    fn decodes_well_formed_body() {
        let form: Sample =
            decode_post_form(b"title=a%26b&expires_in=7&count=-2&extra=x").expect("decodes");
        assert_eq!(
            form,
            Sample {
                title: "a&b".to_owned(),
                expires: 7,
                count: -2
            }
        );
    }

    #[rstest]
    fn missing_numbers_default_without_violation() {
        let form: Sample = decode_post_form(b"title=x&expires_in=").expect("decodes");
        assert_eq!(form.expires, 0);
        assert_eq!(form.count, 0);
    }

    #[rstest]
    fn every_bad_field_contributes_a_violation() {
        let err = decode_post_form::<Sample>(b"expires_in=abc&count=1.5")
            .expect_err("structural failure");
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
        assert_eq!(err.message(), INVALID_FORM);
        let [ErrorDetail::BadRequest { field_violations }] = err.details() else {
            panic!("expected one BAD_REQUEST detail, got {:?}", err.details());
        };
        let fields: Vec<&str> = field_violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, ["expires_in", "count"]);
        assert_eq!(field_violations[0].description, "invalid digit found in string");
    }

    #[rstest]
    fn first_value_wins_for_repeated_names() {
        let form: Sample = decode_post_form(b"title=one&title=two").expect("decodes");
        assert_eq!(form.title, "one");
    }
}
