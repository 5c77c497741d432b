//! Once-per-deployment trigger for the endpoint writer.

use serde::Deserialize;
use serde_json::{json, Map};

use crate::adapters::invoke::FunctionInvoker;
use crate::handlers::custom_resource::{CustomResourceEvent, CustomResourceResponse, RequestType};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TriggerProperties {
    function_name: String,
    create_physical_resource_id: String,
    update_physical_resource_id: String,
}

/// Create and update invoke the writer exactly once, asynchronously; the
/// writer's own outcome is never awaited. Delete is a no-op.
///
/// Create and update report different physical ids, so the toolkit sees an
/// update as a replacement and issues a delete for the old id afterwards.
pub fn handle_trigger_event(
    event: &CustomResourceEvent,
    invoker: &dyn FunctionInvoker,
) -> CustomResourceResponse {
    if event.request_type == RequestType::Delete {
        return CustomResourceResponse::success(event, event.current_physical_id(), Map::new());
    }

    let properties: TriggerProperties = match event.properties() {
        Ok(value) => value,
        Err(error) => return CustomResourceResponse::failed(event, error.to_string()),
    };
    let physical_id = match event.request_type {
        RequestType::Create => properties.create_physical_resource_id,
        _ => properties.update_physical_resource_id,
    };

    if let Err(error) = invoker.invoke_async(&properties.function_name, b"{}") {
        tracing::error!(
            component = "writer_trigger",
            event = "invoke_failed",
            function_name = %properties.function_name,
            error = %error,
        );
        return CustomResourceResponse::failed(event, error);
    }

    tracing::info!(
        component = "writer_trigger",
        event = "writer_invoked",
        function_name = %properties.function_name,
        request_type = ?event.request_type,
        physical_id = %physical_id,
    );
    let mut data = Map::new();
    data.insert("InvokedFunction".to_string(), json!(properties.function_name));
    CustomResourceResponse::success(event, physical_id, data)
}
