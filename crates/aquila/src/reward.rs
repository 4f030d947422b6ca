//! Reward payloads returned by the loyalty services
//!
//! A provider answers with a flat JSON object such as:
//!
//! ```json
//! {
//!     "code": "Reward redeeming code",
//!     "expiry_date": "2022-05-18",
//!     "template_slug": "name of template to use",
//!     "pin": "Optional field"
//! }
//! ```
//!
//! `code`, `expiry_date` and `template_slug` are required. Every other key is
//! passed through to the render step untouched.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;
use time::Date;
use time::macros::format_description;

use crate::error::{Result, RewardError};

/// Values substituted into template placeholders, keyed by placeholder name
pub type RenderContext = BTreeMap<String, Scalar>;

/// A single scalar value from a reward payload
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    String(String),
    Number(serde_json::Number),
    Bool(bool),
    Null,
}

impl Scalar {
    fn from_value(field: &str, value: Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(Scalar::String(s)),
            Value::Number(n) => Ok(Scalar::Number(n)),
            Value::Bool(b) => Ok(Scalar::Bool(b)),
            Value::Null => Ok(Scalar::Null),
            Value::Array(_) | Value::Object(_) => Err(RewardError::NonScalarField {
                field: field.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::String(s) => f.write_str(s),
            Scalar::Number(n) => write!(f, "{}", n),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Null => Ok(()),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::String(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::String(s)
    }
}

/// A validated reward payload
#[derive(Debug, Clone, PartialEq)]
pub struct RewardPayload {
    template_slug: String,
    fields: RenderContext,
}

impl RewardPayload {
    pub const CODE: &'static str = "code";
    pub const EXPIRY_DATE: &'static str = "expiry_date";
    pub const TEMPLATE_SLUG: &'static str = "template_slug";

    /// Parse and validate a raw provider response body
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(body).map_err(|e| RewardError::InvalidJson {
            reason: e.to_string(),
        })?;
        Self::from_value(value)
    }

    /// Validate an already decoded JSON value
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(RewardError::NotAnObject);
        };

        let mut fields = RenderContext::new();
        for (key, value) in map {
            let scalar = Scalar::from_value(&key, value)?;
            fields.insert(key, scalar);
        }

        if !fields.contains_key(Self::CODE) {
            return Err(RewardError::MissingField { field: Self::CODE });
        }
        match fields.get(Self::EXPIRY_DATE) {
            None => {
                return Err(RewardError::MissingField {
                    field: Self::EXPIRY_DATE,
                });
            }
            Some(Scalar::String(_)) => {}
            Some(_) => {
                return Err(RewardError::NotAString {
                    field: Self::EXPIRY_DATE,
                });
            }
        }
        let template_slug = match fields.remove(Self::TEMPLATE_SLUG) {
            None => {
                return Err(RewardError::MissingField {
                    field: Self::TEMPLATE_SLUG,
                });
            }
            Some(Scalar::String(slug)) => slug,
            Some(_) => {
                return Err(RewardError::NotAString {
                    field: Self::TEMPLATE_SLUG,
                });
            }
        };

        Ok(Self {
            template_slug,
            fields,
        })
    }

    /// Slug of the template the provider asked us to render
    pub fn template_slug(&self) -> &str {
        &self.template_slug
    }

    /// Raw field lookup, `template_slug` excluded
    pub fn get(&self, key: &str) -> Option<&Scalar> {
        self.fields.get(key)
    }

    /// Build the render context, with `expiry_date` converted to display format
    pub fn render_context(&self) -> Result<RenderContext> {
        let mut context = self.fields.clone();
        if let Some(raw) = context.get(Self::EXPIRY_DATE).and_then(Scalar::as_str) {
            let display = display_expiry_date(raw)?;
            context.insert(Self::EXPIRY_DATE.to_string(), Scalar::String(display));
        }
        Ok(context)
    }
}

/// Convert a `YYYY-MM-DD` date into `DD/MM/YYYY`
pub fn display_expiry_date(raw: &str) -> Result<String> {
    let invalid = |reason: String| RewardError::InvalidExpiryDate {
        value: raw.to_string(),
        reason,
    };

    let date = Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .map_err(|e| invalid(e.to_string()))?;
    date.format(format_description!("[day]/[month]/[year]"))
        .map_err(|e| invalid(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_keeps_passthrough_fields() {
        let payload = RewardPayload::from_value(json!({
            "code": "TSTRWDCODE1234",
            "expiry_date": "2022-05-18",
            "template_slug": "test-template",
            "pin": "1234",
            "value": 5,
        }))
        .unwrap();

        assert_eq!(payload.template_slug(), "test-template");
        assert_eq!(payload.get("pin"), Some(&Scalar::from("1234")));
        assert_eq!(payload.get("value"), Some(&Scalar::Number(5.into())));
        assert!(payload.get("template_slug").is_none());
    }

    #[test]
    fn test_render_context_reformats_expiry_date() {
        let payload = RewardPayload::from_value(json!({
            "code": "ABC",
            "expiry_date": "2022-05-18",
            "template_slug": "t",
        }))
        .unwrap();

        let context = payload.render_context().unwrap();
        assert_eq!(context["expiry_date"], Scalar::from("18/05/2022"));
        assert_eq!(context["code"], Scalar::from("ABC"));
        // raw payload is untouched
        assert_eq!(payload.get("expiry_date"), Some(&Scalar::from("2022-05-18")));
    }

    #[test]
    fn test_invalid_expiry_date_is_an_error() {
        let payload = RewardPayload::from_value(json!({
            "code": "ABC",
            "expiry_date": "18/05/2022",
            "template_slug": "t",
        }))
        .unwrap();

        match payload.render_context() {
            Err(RewardError::InvalidExpiryDate { value, .. }) => assert_eq!(value, "18/05/2022"),
            other => panic!("Expected InvalidExpiryDate, got {:?}", other),
        }
        assert!(display_expiry_date("2022-02-30").is_err());
    }

    #[test]
    fn test_missing_required_fields() {
        let err = RewardPayload::from_value(json!({"expiry_date": "2022-05-18", "template_slug": "t"}))
            .unwrap_err();
        assert_eq!(err, RewardError::MissingField { field: "code" });

        let err = RewardPayload::from_value(json!({"code": "c", "template_slug": "t"})).unwrap_err();
        assert_eq!(err, RewardError::MissingField { field: "expiry_date" });

        let err = RewardPayload::from_value(json!({"code": "c", "expiry_date": "2022-05-18"}))
            .unwrap_err();
        assert_eq!(err, RewardError::MissingField { field: "template_slug" });
    }

    #[test]
    fn test_rejects_nested_values_and_non_objects() {
        let err = RewardPayload::from_value(json!({
            "code": "c",
            "expiry_date": "2022-05-18",
            "template_slug": "t",
            "extra": {"nested": true},
        }))
        .unwrap_err();
        assert_eq!(
            err,
            RewardError::NonScalarField {
                field: "extra".to_string()
            }
        );

        assert_eq!(
            RewardPayload::from_value(json!(["code"])).unwrap_err(),
            RewardError::NotAnObject
        );
        assert!(matches!(
            RewardPayload::from_slice(b"<html>oops</html>"),
            Err(RewardError::InvalidJson { .. })
        ));
    }

    #[test]
    fn test_scalar_display() {
        assert_eq!(Scalar::from("x").to_string(), "x");
        assert_eq!(Scalar::Number(42.into()).to_string(), "42");
        assert_eq!(Scalar::Bool(true).to_string(), "true");
        assert_eq!(Scalar::Null.to_string(), "");
    }
}
