//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//!
//! ## Request frame
//!
//! ```text
//! Upgrade|==|u1|==|pad|==|0|-+-|<ignored payload>
//! └─name─┘   └─────── fields ─────┘
//! ```
//!
//! Anything after the first `|-+-|` is dropped. The rest is split on `|==|`;
//! field 0 names the operation. Fields are text and are checked against the
//! operation's schema before any state is touched.
//!
//! ## Reply
//!
//! JSON object `{"Function":"<name>Reply","Data":[...]}`.

use std::fmt;
use serde::{Serialize, Deserialize};
use serde_json::Value;

use crate::game::state::UserId;

/// Separates the field list from trailing payload.
pub const OUTER_MARKER: &str = "|-+-|";

/// Separates fields.
pub const FIELD_SEPARATOR: &str = "|==|";

/// Appended to the operation name in replies.
pub const REPLY_SUFFIX: &str = "Reply";

/// Payload of a reply to an operation name nobody handles.
pub const UNKNOWN_FUNCTION: &str = "Unknown function name";

/// Payload of a successful write.
pub const SUCCESS: &str = "true";

// =============================================================================
// FIELD SCHEMAS
// =============================================================================

/// Declared type of a frame field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Any text.
    Str,
    /// Integer.
    Number,
    /// `true` or `false`, any case.
    Boolean,
}

impl FieldType {
    /// Name used in validation messages.
    pub const fn name(self) -> &'static str {
        match self {
            FieldType::Str => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
        }
    }

    /// Whether `value` is acceptable for this type.
    pub fn accepts(self, value: &str) -> bool {
        match self {
            FieldType::Str => true,
            FieldType::Number => parse_number(value).is_some(),
            FieldType::Boolean => parse_bool(value).is_some(),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn parse_number(value: &str) -> Option<i64> {
    value.trim().parse().ok()
}

fn parse_bool(value: &str) -> Option<bool> {
    if value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Frame validation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Too few fields.
    #[error("Expected at least {expected} parameters, but got {actual}.")]
    TooFewFields {
        /// Minimum field count, operation name included.
        expected: usize,
        /// Fields received.
        actual: usize,
    },

    /// A field does not parse as its declared type.
    #[error("Expected parameter {index} to be of type {expected}, but got \"{value}\".")]
    WrongType {
        /// Position of the field in the frame.
        index: usize,
        /// Declared type.
        expected: FieldType,
        /// Literal received.
        value: String,
    },
}

/// Check `fields` against a schema, stopping at the first bad field.
pub fn validate_fields(fields: &[&str], schema: &[FieldType]) -> Result<(), ValidationError> {
    if fields.len() < schema.len() {
        return Err(ValidationError::TooFewFields {
            expected: schema.len(),
            actual: fields.len(),
        });
    }

    for (index, (value, expected)) in fields.iter().zip(schema).enumerate() {
        if !expected.accepts(value) {
            return Err(ValidationError::WrongType {
                index,
                expected: *expected,
                value: (*value).to_string(),
            });
        }
    }

    Ok(())
}

// =============================================================================
// CLIENT -> SERVER
// =============================================================================

/// The operations a client can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Read (or lazily create) the full player state.
    GetUserData,
    /// Persist a language choice.
    ChangeLanguage,
    /// Buy the next level of an upgrade.
    Upgrade,
    /// Collect a click reward.
    BananaClicked,
}

impl Operation {
    /// Every known operation.
    pub const ALL: [Operation; 4] = [
        Operation::GetUserData,
        Operation::ChangeLanguage,
        Operation::Upgrade,
        Operation::BananaClicked,
    ];

    /// Wire name (case-sensitive).
    pub const fn name(self) -> &'static str {
        match self {
            Operation::GetUserData => "GetUserData",
            Operation::ChangeLanguage => "ChangeLanguage",
            Operation::Upgrade => "Upgrade",
            Operation::BananaClicked => "BananaClicked",
        }
    }

    /// Look up an operation by wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }

    /// Field schema, operation name included.
    ///
    /// The second string field after the user id is padding kept for
    /// wire compatibility; only its presence is checked.
    pub const fn schema(self) -> &'static [FieldType] {
        use FieldType::*;
        match self {
            Operation::GetUserData => &[Str, Str, Str, Boolean],
            Operation::ChangeLanguage => &[Str, Str, Str, Number],
            Operation::Upgrade => &[Str, Str, Str, Number],
            Operation::BananaClicked => &[Str, Str],
        }
    }
}

/// A validated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Read full player state.
    GetUserData {
        /// Player.
        user_id: UserId,
    },
    /// Persist a language choice.
    ChangeLanguage {
        /// Player.
        user_id: UserId,
        /// Requested language index.
        language: i64,
    },
    /// Buy an upgrade level.
    Upgrade {
        /// Player.
        user_id: UserId,
        /// Upgrade slot code.
        code: i64,
    },
    /// Collect a click reward.
    BananaClicked {
        /// Player.
        user_id: UserId,
    },
    /// Operation name nobody handles.
    Unknown {
        /// Name as received.
        name: String,
    },
}

/// A frame that failed validation for a known operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedFrame {
    /// Operation the frame named.
    pub operation: Operation,
    /// What was wrong.
    pub error: ValidationError,
}

/// Split a raw frame into its fields.
pub fn split_fields(frame: &str) -> Vec<&str> {
    let section = frame.split(OUTER_MARKER).next().unwrap_or_default();
    section.split(FIELD_SEPARATOR).collect()
}

impl Request {
    /// Parse and validate a raw text frame.
    pub fn parse(frame: &str) -> Result<Self, RejectedFrame> {
        let fields = split_fields(frame);
        let name = fields.first().copied().unwrap_or_default();

        let Some(operation) = Operation::from_name(name) else {
            return Ok(Request::Unknown { name: name.to_string() });
        };

        validate_fields(&fields, operation.schema())
            .map_err(|error| RejectedFrame { operation, error })?;

        let user_id = UserId::new(fields[1]);
        // Schema validation guarantees these fields exist and parse.
        let number = |index: usize| parse_number(fields[index]).unwrap_or_default();

        Ok(match operation {
            Operation::GetUserData => Request::GetUserData { user_id },
            Operation::ChangeLanguage => Request::ChangeLanguage { user_id, language: number(3) },
            Operation::Upgrade => Request::Upgrade { user_id, code: number(3) },
            Operation::BananaClicked => Request::BananaClicked { user_id },
        })
    }

    /// Wire name of the requested operation.
    pub fn name(&self) -> &str {
        match self {
            Request::GetUserData { .. } => Operation::GetUserData.name(),
            Request::ChangeLanguage { .. } => Operation::ChangeLanguage.name(),
            Request::Upgrade { .. } => Operation::Upgrade.name(),
            Request::BananaClicked { .. } => Operation::BananaClicked.name(),
            Request::Unknown { name } => name,
        }
    }
}

// =============================================================================
// SERVER -> CLIENT
// =============================================================================

/// Reply envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Reply {
    /// Operation name with [`REPLY_SUFFIX`].
    pub function: String,
    /// Operation-specific payload.
    pub data: Vec<Value>,
}

impl Reply {
    /// Reply carrying a payload.
    pub fn new(operation: &str, data: Vec<Value>) -> Self {
        Self {
            function: format!("{operation}{REPLY_SUFFIX}"),
            data,
        }
    }

    /// Successful write.
    pub fn success(operation: &str) -> Self {
        Self::new(operation, vec![Value::from(SUCCESS)])
    }

    /// One-element error payload.
    pub fn failure(operation: &str, message: impl Into<String>) -> Self {
        Self::new(operation, vec![Value::String(message.into())])
    }

    /// Reply to an unrecognized operation.
    pub fn unknown(operation: &str) -> Self {
        Self::failure(operation, UNKNOWN_FUNCTION)
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_each_operation() {
        assert_eq!(
            Request::parse("GetUserData|==|u1|==|x|==|TRUE").unwrap(),
            Request::GetUserData { user_id: UserId::from("u1") }
        );
        assert_eq!(
            Request::parse("ChangeLanguage|==|u1|==|x|==|2").unwrap(),
            Request::ChangeLanguage { user_id: UserId::from("u1"), language: 2 }
        );
        assert_eq!(
            Request::parse("Upgrade|==|u1|==|x|==|-1").unwrap(),
            Request::Upgrade { user_id: UserId::from("u1"), code: -1 }
        );
        assert_eq!(
            Request::parse("BananaClicked|==|u1").unwrap(),
            Request::BananaClicked { user_id: UserId::from("u1") }
        );
    }

    #[test]
    fn test_outer_marker_drops_payload() {
        let request = Request::parse("Upgrade|==|u1|==|x|==|1|-+-|junk|==|more").unwrap();
        assert_eq!(request, Request::Upgrade { user_id: UserId::from("u1"), code: 1 });
    }

    #[test]
    fn test_extra_fields_allowed() {
        let request = Request::parse("BananaClicked|==|u1|==|pad|==|extra").unwrap();
        assert_eq!(request, Request::BananaClicked { user_id: UserId::from("u1") });
    }

    #[test]
    fn test_unknown_operation() {
        assert_eq!(
            Request::parse("getuserdata|==|u1").unwrap(),
            Request::Unknown { name: "getuserdata".to_string() }
        );
        assert_eq!(Request::parse("").unwrap(), Request::Unknown { name: String::new() });
    }

    #[test]
    fn test_too_few_fields() {
        let rejected = Request::parse("Upgrade|==|u1|==|x").unwrap_err();
        assert_eq!(rejected.operation, Operation::Upgrade);
        assert_eq!(rejected.error, ValidationError::TooFewFields { expected: 4, actual: 3 });
        assert_eq!(rejected.error.to_string(), "Expected at least 4 parameters, but got 3.");
    }

    #[test]
    fn test_wrong_types() {
        let rejected = Request::parse("ChangeLanguage|==|u1|==|x|==|abc").unwrap_err();
        assert_eq!(
            rejected.error.to_string(),
            "Expected parameter 3 to be of type number, but got \"abc\"."
        );

        let rejected = Request::parse("GetUserData|==|u1|==|x|==|yes").unwrap_err();
        assert_eq!(
            rejected.error,
            ValidationError::WrongType { index: 3, expected: FieldType::Boolean, value: "yes".to_string() }
        );
    }

    #[test]
    fn test_validation_stops_at_first_failure() {
        let schema = [FieldType::Str, FieldType::Number, FieldType::Boolean];
        let err = validate_fields(&["op", "nope", "maybe"], &schema).unwrap_err();
        assert!(matches!(err, ValidationError::WrongType { index: 1, .. }));
    }

    #[test]
    fn test_reply_json() {
        assert_eq!(
            Reply::success("Upgrade").to_json().unwrap(),
            r#"{"Function":"UpgradeReply","Data":["true"]}"#
        );
        assert_eq!(
            Reply::unknown("Dance").to_json().unwrap(),
            r#"{"Function":"DanceReply","Data":["Unknown function name"]}"#
        );

        let reply = Reply::new("GetUserData", vec![Value::from("{}"), Value::from(5), Value::from(0)]);
        let parsed = Reply::from_json(&reply.to_json().unwrap()).unwrap();
        assert_eq!(parsed, reply);
    }
}
