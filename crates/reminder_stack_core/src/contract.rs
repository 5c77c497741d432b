//! Request and response shapes shared by the API handler and the workflow.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preference {
    Sms,
    Email,
    Both,
}

impl Preference {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "sms" => Some(Self::Sms),
            "email" => Some(Self::Email),
            "both" => Some(Self::Both),
            _ => None,
        }
    }
}

/// A validated reminder request, ready to become workflow input.
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderRequest {
    pub wait_seconds: u64,
    pub preference: Preference,
    pub message: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// The full request object with `waitSeconds` normalized to an integer.
    input: Map<String, Value>,
}

impl ReminderRequest {
    /// Serialized execution input for the workflow.
    pub fn workflow_input(&self) -> String {
        Value::Object(self.input.clone()).to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}

pub fn validate_request(payload: Value) -> Result<ReminderRequest, ValidationError> {
    let Value::Object(mut input) = payload else {
        return Err(ValidationError::new("Request payload must be a JSON object"));
    };

    let wait_seconds = match input.get("waitSeconds") {
        None => return Err(ValidationError::new("waitSeconds is required")),
        Some(value) => coerce_wait_seconds(value)?,
    };
    input.insert("waitSeconds".to_string(), Value::from(wait_seconds));

    let preference = match input.get("preference") {
        None => return Err(ValidationError::new("preference is required")),
        Some(Value::String(value)) => Preference::parse(value).ok_or_else(|| {
            ValidationError::new(format!(
                "preference must be one of sms, email, both; got '{value}'"
            ))
        })?,
        Some(_) => return Err(ValidationError::new("preference must be a string")),
    };

    let message = required_string(&input, "message")?
        .ok_or_else(|| ValidationError::new("message is required"))?;
    let phone = required_string(&input, "phone")?;
    let email = required_string(&input, "email")?;

    let needs_phone = matches!(preference, Preference::Sms | Preference::Both);
    let needs_email = matches!(preference, Preference::Email | Preference::Both);
    if needs_phone && phone.is_none() {
        return Err(ValidationError::new("phone is required for sms reminders"));
    }
    if needs_email && email.is_none() {
        return Err(ValidationError::new("email is required for email reminders"));
    }

    Ok(ReminderRequest {
        wait_seconds,
        preference,
        message,
        phone,
        email,
        input,
    })
}

/// Integers pass, strings holding an integer are parsed; anything else fails.
fn coerce_wait_seconds(value: &Value) -> Result<u64, ValidationError> {
    let parsed = match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    };
    let seconds =
        parsed.ok_or_else(|| ValidationError::new("waitSeconds must be an integer"))?;
    u64::try_from(seconds).map_err(|_| ValidationError::new("waitSeconds cannot be negative"))
}

fn required_string(
    input: &Map<String, Value>,
    field: &str,
) -> Result<Option<String>, ValidationError> {
    match input.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) if value.trim().is_empty() => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.clone())),
        Some(_) => Err(ValidationError::new(format!("{field} must be a string"))),
    }
}

/// Lambda proxy response returned through the HTTP surface.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiGatewayResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub headers: Value,
    pub body: String,
}

impl ApiGatewayResponse {
    pub fn success() -> Self {
        Self::with_body(200, json!({"Status": "Success"}))
    }

    pub fn validation_failure(reason: &str) -> Self {
        Self::with_body(
            400,
            json!({
                "Status": "Failure",
                "Reason": "Input failed validation",
                "Details": reason,
            }),
        )
    }

    pub fn error(status_code: u16, error: &str, message: &str) -> Self {
        Self::with_body(
            status_code,
            json!({
                "Status": "Failure",
                "Reason": error,
                "Details": message,
            }),
        )
    }

    fn with_body(status_code: u16, body: Value) -> Self {
        Self {
            status_code,
            headers: json!({"Access-Control-Allow-Origin": "*"}),
            body: body.to_string(),
        }
    }
}
