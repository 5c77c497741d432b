use serde::{Deserialize, Serialize};

use crate::reference::Expr;

/// Object key the published site reads the endpoint from.
pub const ENDPOINT_OBJECT_KEY: &str = "data.json";

/// The site and its clients expect `.../prod/reminders`.
pub const STAGE_NAME: &str = "prod";
pub const RESOURCE_PATH: &str = "reminders";

/// Content of `data.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct EndpointRecord {
    #[serde(rename = "API_ENDPOINT")]
    pub api_endpoint: String,
}

impl EndpointRecord {
    pub fn new(api_endpoint: impl Into<String>) -> Self {
        Self {
            api_endpoint: api_endpoint.into(),
        }
    }

    /// Pretty JSON body with two-space indentation.
    pub fn to_body(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
    }
}

/// Endpoint URL with the REST API id left for the toolkit to resolve.
pub fn endpoint_url_expr(api_logical_id: &str, region: &str, stage: &str, path: &str) -> Expr {
    Expr::join([
        Expr::str("https://"),
        Expr::reference(api_logical_id),
        Expr::str(format!(".execute-api.{region}.amazonaws.com/{stage}/{path}")),
    ])
}

pub fn render_endpoint_url(api_id: &str, region: &str, stage: &str, path: &str) -> String {
    format!("https://{api_id}.execute-api.{region}.amazonaws.com/{stage}/{path}")
}

/// Checks `https://{id}.execute-api.{region}.amazonaws.com/prod/reminders`.
pub fn is_valid_endpoint_url(url: &str) -> bool {
    let Some(rest) = url.strip_prefix("https://") else {
        return false;
    };
    let suffix = format!(".amazonaws.com/{STAGE_NAME}/{RESOURCE_PATH}");
    let Some(host_and_region) = rest.strip_suffix(suffix.as_str()) else {
        return false;
    };
    let Some((api_id, region)) = host_and_region.split_once(".execute-api.") else {
        return false;
    };

    !api_id.is_empty()
        && api_id.chars().all(|c| c.is_ascii_alphanumeric())
        && !region.is_empty()
        && region
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;

    #[test]
    fn record_has_exactly_the_endpoint_key() {
        let url = render_endpoint_url("a1b2c3d4e5", "us-east-1", "prod", "reminders");
        let record = EndpointRecord::new(&url);
        let body = record.to_body().expect("record serializes");
        let parsed: Value = serde_json::from_slice(&body).expect("body is JSON");

        let object = parsed.as_object().expect("body is an object");
        assert_eq!(object.len(), 1);
        let endpoint = object["API_ENDPOINT"].as_str().expect("endpoint is a string");
        assert!(is_valid_endpoint_url(endpoint));
    }

    #[test]
    fn body_is_indented_with_two_spaces() {
        let bytes = EndpointRecord::new("https://x")
            .to_body()
            .expect("record serializes");
        let body = String::from_utf8(bytes).expect("body is UTF-8");
        assert_eq!(body, "{\n  \"API_ENDPOINT\": \"https://x\"\n}");
    }

    #[test]
    fn rejects_foreign_urls() {
        assert!(is_valid_endpoint_url(
            "https://abc123.execute-api.eu-west-1.amazonaws.com/prod/reminders"
        ));
        assert!(!is_valid_endpoint_url(
            "http://abc123.execute-api.us-east-1.amazonaws.com/prod/reminders"
        ));
        assert!(!is_valid_endpoint_url(
            "https://abc123.execute-api.us-east-1.amazonaws.com/dev/reminders"
        ));
        assert!(!is_valid_endpoint_url(
            "https://.execute-api.us-east-1.amazonaws.com/prod/reminders"
        ));
    }

    #[test]
    fn deferred_url_references_the_api() {
        let expr = endpoint_url_expr("RestApi", "us-east-1", "prod", "reminders");
        assert_eq!(
            expr.to_template_value(),
            json!({"Fn::Join": ["", [
                "https://",
                {"Ref": "RestApi"},
                ".execute-api.us-east-1.amazonaws.com/prod/reminders"
            ]]})
        );
    }

    #[test]
    fn unknown_keys_are_rejected_on_read() {
        let result: Result<EndpointRecord, _> =
            serde_json::from_str(r#"{"API_ENDPOINT": "https://x", "extra": 1}"#);
        assert!(result.is_err());
    }
}
