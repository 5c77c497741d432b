//! Notification functions invoked by the workflow with the execution input.

use serde::Deserialize;
use serde_json::Value;

use crate::adapters::notify::{EmailSender, SmsSender};
use crate::error::HandlerError;

pub const EMAIL_SUBJECT: &str = "A reminder from your reminder service!";
pub const SUCCESS: &str = "Success!";

#[derive(Debug, Clone, Deserialize)]
struct ReminderEvent {
    message: String,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

fn parse_event(event: Value) -> Result<ReminderEvent, HandlerError> {
    serde_json::from_value(event).map_err(|error| HandlerError::Validation(error.to_string()))
}

fn require(value: Option<String>, field: &str) -> Result<String, HandlerError> {
    value
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| HandlerError::Validation(format!("{field} is required")))
}

pub fn handle_sms_reminder(
    event: Value,
    sender: &dyn SmsSender,
) -> Result<&'static str, HandlerError> {
    let reminder = parse_event(event)?;
    let phone = require(reminder.phone, "phone")?;

    sender
        .send_sms(&phone, &reminder.message)
        .map_err(|error| HandlerError::downstream("sms publish", error))?;
    tracing::info!(component = "sms_reminder", event = "sms_sent");
    Ok(SUCCESS)
}

/// `source` is the verified sender identity from `EMAIL`.
pub fn handle_email_reminder(
    event: Value,
    source: Option<&str>,
    sender: &dyn EmailSender,
) -> Result<&'static str, HandlerError> {
    let source = source
        .filter(|value| !value.trim().is_empty())
        .ok_or(HandlerError::Configuration("EMAIL"))?;
    let reminder = parse_event(event)?;
    let to = require(reminder.email, "email")?;

    sender
        .send_email(source, &to, EMAIL_SUBJECT, &reminder.message)
        .map_err(|error| HandlerError::downstream("email send", error))?;
    tracing::info!(component = "email_reminder", event = "email_sent");
    Ok(SUCCESS)
}
