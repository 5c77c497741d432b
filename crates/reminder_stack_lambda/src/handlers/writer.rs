//! Writes the deployed endpoint into the website bucket as `data.json`.

use chrono::{DateTime, Utc};
use reminder_stack_core::endpoint::{is_valid_endpoint_url, EndpointRecord, ENDPOINT_OBJECT_KEY};

use crate::adapters::object_store::ObjectStore;
use crate::error::HandlerError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterConfig {
    pub api_endpoint: String,
    pub bucket: String,
}

impl WriterConfig {
    /// Reads `API_ENDPOINT` and `BUCKET_NAME` through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, HandlerError> {
        let read = |name: &'static str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or(HandlerError::Configuration(name))
        };
        Ok(Self {
            api_endpoint: read("API_ENDPOINT")?,
            bucket: read("BUCKET_NAME")?,
        })
    }

    pub fn from_env() -> Result<Self, HandlerError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub bucket: String,
    pub key: &'static str,
    pub written_at: DateTime<Utc>,
}

/// Runs once per deployment, invoked asynchronously by the trigger.
///
/// The deployment never sees this result: a failure leaves the site without
/// `data.json` while the stack reports success. Callers log and return the
/// error so it at least shows up in the function's async-invoke failures.
pub fn handle_write(
    config: &WriterConfig,
    store: &dyn ObjectStore,
) -> Result<WriteOutcome, HandlerError> {
    if !is_valid_endpoint_url(&config.api_endpoint) {
        tracing::warn!(
            component = "endpoint_writer",
            event = "unexpected_endpoint_shape",
            api_endpoint = %config.api_endpoint,
        );
    }

    let body = EndpointRecord::new(config.api_endpoint.as_str())
        .to_body()
        .map_err(|error| HandlerError::downstream("endpoint record", error.to_string()))?;

    if let Err(error) =
        store.write_object(&config.bucket, ENDPOINT_OBJECT_KEY, &body, "application/json")
    {
        tracing::error!(
            component = "endpoint_writer",
            event = "write_failed",
            bucket = %config.bucket,
            error = %error,
        );
        return Err(HandlerError::downstream("endpoint write", error));
    }

    let outcome = WriteOutcome {
        bucket: config.bucket.clone(),
        key: ENDPOINT_OBJECT_KEY,
        written_at: Utc::now(),
    };
    tracing::info!(
        component = "endpoint_writer",
        event = "endpoint_written",
        bucket = %outcome.bucket,
        key = outcome.key,
        written_at = %outcome.written_at.to_rfc3339(),
    );
    Ok(outcome)
}
