use reminder_stack_core::contract::{validate_request, ApiGatewayResponse};
use serde_json::{json, Value};

use crate::adapters::workflow::WorkflowStarter;

/// Validates the request and starts one workflow execution for it.
///
/// Invalid input never reaches the workflow.
pub fn handle_api_event(
    event: Value,
    state_machine_arn: Option<&str>,
    starter: &dyn WorkflowStarter,
) -> ApiGatewayResponse {
    // Payloads carry contact details and are never logged.
    tracing::info!(
        component = "api_handler",
        event = "request_received",
        proxy = event.get("body").is_some(),
    );

    let payload = match normalize_apigw_event(event) {
        Ok(value) => value,
        Err(message) => return reject(&message),
    };

    let request = match validate_request(payload) {
        Ok(value) => value,
        Err(error) => return reject(error.message()),
    };

    let state_machine_arn = match state_machine_arn {
        Some(value) if !value.trim().is_empty() => value,
        _ => {
            tracing::error!(component = "api_handler", event = "misconfigured");
            return ApiGatewayResponse::error(
                500,
                "misconfiguration",
                "SFN_ARN must be configured",
            );
        }
    };

    match starter.start_execution(state_machine_arn, &request.workflow_input()) {
        Ok(execution_arn) => {
            tracing::info!(
                component = "api_handler",
                event = "execution_started",
                execution_arn = %execution_arn,
                preference = ?request.preference,
                wait_seconds = request.wait_seconds,
            );
            ApiGatewayResponse::success()
        }
        Err(error) => {
            tracing::error!(
                component = "api_handler",
                event = "execution_failed",
                error = %error,
            );
            ApiGatewayResponse::error(502, "start_failed", &error)
        }
    }
}

/// Accepts a bare JSON object (non-proxy integration) or a proxy event whose
/// `body` is an object or a JSON string.
fn normalize_apigw_event(event: Value) -> Result<Value, String> {
    let Some(object) = event.as_object() else {
        return Err("Request payload must be a JSON object".to_string());
    };

    let Some(body) = object.get("body") else {
        return Ok(event);
    };

    match body {
        Value::Null => Ok(json!({})),
        Value::Object(_) => Ok(body.clone()),
        Value::String(text) => {
            serde_json::from_str(text).map_err(|error| format!("Malformed JSON body: {error}"))
        }
        _ => Err("Request body must be a JSON object".to_string()),
    }
}

fn reject(reason: &str) -> ApiGatewayResponse {
    tracing::warn!(component = "api_handler", event = "validation_failed", reason);
    ApiGatewayResponse::validation_failure(reason)
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().expect("poisoned mutex")).into_owned()
        }
    }

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().expect("poisoned mutex").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct CapturingStarter {
        inputs: Mutex<Vec<(String, String)>>,
        fail_with: Option<String>,
    }

    impl CapturingStarter {
        fn new() -> Self {
            Self {
                inputs: Mutex::new(Vec::new()),
                fail_with: None,
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                inputs: Mutex::new(Vec::new()),
                fail_with: Some(message.to_string()),
            }
        }

        fn inputs(&self) -> Vec<(String, String)> {
            self.inputs.lock().expect("poisoned mutex").clone()
        }
    }

    impl WorkflowStarter for CapturingStarter {
        fn start_execution(&self, state_machine_arn: &str, input: &str) -> Result<String, String> {
            self.inputs
                .lock()
                .expect("poisoned mutex")
                .push((state_machine_arn.to_string(), input.to_string()));
            match &self.fail_with {
                Some(message) => Err(message.clone()),
                None => Ok(format!("{state_machine_arn}:execution-1")),
            }
        }
    }

    const SFN_ARN: &str = "arn:aws:states:us-east-1:123456789012:stateMachine:reminders";

    #[test]
    fn rejects_invalid_payload_without_starting() {
        let starter = CapturingStarter::new();
        let response = handle_api_event(
            json!({"waitSeconds": "10", "preference": "sms", "message": "hi"}),
            Some(SFN_ARN),
            &starter,
        );

        assert_eq!(response.status_code, 400);
        assert_eq!(response.headers["Access-Control-Allow-Origin"], "*");
        assert!(starter.inputs().is_empty());
    }

    #[test]
    fn starts_workflow_with_normalized_input() {
        let starter = CapturingStarter::new();
        let response = handle_api_event(
            json!({
                "body": "{\"waitSeconds\":\"15\",\"preference\":\"email\",\"message\":\"hi\",\"email\":\"a@example.com\"}"
            }),
            Some(SFN_ARN),
            &starter,
        );

        assert_eq!(response.status_code, 200);
        let inputs = starter.inputs();
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].0, SFN_ARN);
        let input: Value = serde_json::from_str(&inputs[0].1).expect("input is JSON");
        assert_eq!(input["waitSeconds"], 15);
        assert_eq!(input["email"], "a@example.com");
    }

    #[test]
    fn missing_state_machine_is_a_server_error() {
        let starter = CapturingStarter::new();
        let response = handle_api_event(
            json!({"waitSeconds": 1, "preference": "sms", "message": "hi", "phone": "+1555"}),
            Some("  "),
            &starter,
        );

        assert_eq!(response.status_code, 500);
        assert!(starter.inputs().is_empty());
    }

    #[test]
    fn start_failure_is_a_bad_gateway() {
        let starter = CapturingStarter::failing("throttled");
        let response = handle_api_event(
            json!({"waitSeconds": 1, "preference": "sms", "message": "hi", "phone": "+1555"}),
            Some(SFN_ARN),
            &starter,
        );

        assert_eq!(response.status_code, 502);
        assert!(response.body.contains("throttled"));
    }

    #[test]
    fn contact_details_stay_out_of_the_logs() {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let starter = CapturingStarter::new();

        let response = tracing::subscriber::with_default(subscriber, || {
            handle_api_event(
                json!({
                    "waitSeconds": 1,
                    "preference": "both",
                    "message": "call the dentist",
                    "phone": "+15550100",
                    "email": "patient@example.com"
                }),
                Some(SFN_ARN),
                &starter,
            )
        });

        assert_eq!(response.status_code, 200);
        let logs = buffer.contents();
        assert!(logs.contains("request_received"));
        assert!(logs.contains("execution_started"));
        assert!(!logs.contains("+15550100"));
        assert!(!logs.contains("patient@example.com"));
        assert!(!logs.contains("call the dentist"));
    }

    #[test]
    fn rejects_non_object_bodies() {
        let starter = CapturingStarter::new();
        assert_eq!(
            handle_api_event(json!([1, 2]), Some(SFN_ARN), &starter).status_code,
            400
        );
        assert_eq!(
            handle_api_event(json!({"body": 42}), Some(SFN_ARN), &starter).status_code,
            400
        );
        assert_eq!(
            handle_api_event(json!({"body": "{oops"}), Some(SFN_ARN), &starter).status_code,
            400
        );
    }
}
