//! CloudFormation custom resource request/response envelope.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::adapters::response::ResponseSender;
use crate::error::HandlerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum RequestType {
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomResourceEvent {
    pub request_type: RequestType,
    #[serde(rename = "ResponseURL")]
    pub response_url: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    #[serde(default)]
    pub physical_resource_id: Option<String>,
    #[serde(default)]
    pub resource_properties: Value,
}

impl CustomResourceEvent {
    /// Typed view of `ResourceProperties`.
    pub fn properties<T: serde::de::DeserializeOwned>(&self) -> Result<T, HandlerError> {
        serde_json::from_value(self.resource_properties.clone())
            .map_err(|error| HandlerError::Validation(format!("bad resource properties: {error}")))
    }

    /// Physical id to report when nothing better is known.
    pub fn current_physical_id(&self) -> String {
        self.physical_resource_id
            .clone()
            .unwrap_or_else(|| self.logical_resource_id.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomResourceResponse {
    pub status: ResponseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub physical_resource_id: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub data: Map<String, Value>,
}

impl CustomResourceResponse {
    pub fn success(
        event: &CustomResourceEvent,
        physical_resource_id: impl Into<String>,
        data: Map<String, Value>,
    ) -> Self {
        Self {
            status: ResponseStatus::Success,
            reason: None,
            physical_resource_id: physical_resource_id.into(),
            stack_id: event.stack_id.clone(),
            request_id: event.request_id.clone(),
            logical_resource_id: event.logical_resource_id.clone(),
            data,
        }
    }

    pub fn failed(event: &CustomResourceEvent, reason: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Failed,
            reason: Some(reason.into()),
            physical_resource_id: event.current_physical_id(),
            stack_id: event.stack_id.clone(),
            request_id: event.request_id.clone(),
            logical_resource_id: event.logical_resource_id.clone(),
            data: Map::new(),
        }
    }
}

/// Sends the response; the toolkit waits on this, not on the function result.
pub fn respond(
    sender: &dyn ResponseSender,
    event: &CustomResourceEvent,
    response: &CustomResourceResponse,
) -> Result<(), HandlerError> {
    let body = serde_json::to_vec(response)
        .map_err(|error| HandlerError::downstream("response serialization", error.to_string()))?;
    sender
        .send(&event.response_url, &body)
        .map_err(|error| HandlerError::downstream("custom resource response", error))?;
    tracing::info!(
        component = "custom_resource",
        event = "response_sent",
        logical_resource_id = %event.logical_resource_id,
        status = ?response.status,
    );
    Ok(())
}
