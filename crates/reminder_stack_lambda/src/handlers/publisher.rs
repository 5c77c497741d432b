//! Publishes the static site from the asset bucket into the website bucket.

use std::collections::BTreeSet;

use reminder_stack_core::endpoint::ENDPOINT_OBJECT_KEY;
use serde::Deserialize;
use serde_json::{json, Map};

use crate::adapters::object_store::ObjectStore;
use crate::handlers::custom_resource::{CustomResourceEvent, CustomResourceResponse, RequestType};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PublisherProperties {
    source_bucket: String,
    #[serde(default)]
    source_prefix: String,
    destination_bucket: String,
}

pub fn handle_publish_event(
    event: &CustomResourceEvent,
    store: &dyn ObjectStore,
) -> CustomResourceResponse {
    let properties: PublisherProperties = match event.properties() {
        Ok(value) => value,
        Err(error) => return CustomResourceResponse::failed(event, error.to_string()),
    };
    let physical_id = format!("content-publisher-{}", properties.destination_bucket);

    let outcome = match event.request_type {
        RequestType::Create | RequestType::Update => publish(&properties, store),
        RequestType::Delete => empty_bucket(&properties.destination_bucket, store),
    };

    match outcome {
        Ok(object_count) => {
            tracing::info!(
                component = "content_publisher",
                event = "published",
                request_type = ?event.request_type,
                destination_bucket = %properties.destination_bucket,
                object_count,
            );
            let mut data = Map::new();
            data.insert("ObjectCount".to_string(), json!(object_count));
            CustomResourceResponse::success(event, physical_id, data)
        }
        Err(error) => {
            tracing::error!(
                component = "content_publisher",
                event = "publish_failed",
                request_type = ?event.request_type,
                error = %error,
            );
            CustomResourceResponse::failed(event, error)
        }
    }
}

/// Copies every object under the source prefix, keyed relative to it, then
/// removes destination objects the site no longer contains. The endpoint
/// record is owned by the writer and always survives.
fn publish(properties: &PublisherProperties, store: &dyn ObjectStore) -> Result<usize, String> {
    let keys = store.list_keys(&properties.source_bucket, &properties.source_prefix)?;
    let mut published = BTreeSet::new();
    for key in keys.iter().filter(|key| !key.ends_with('/')) {
        let relative = key
            .strip_prefix(properties.source_prefix.as_str())
            .unwrap_or(key)
            .trim_start_matches('/');
        if relative.is_empty() {
            continue;
        }
        let body = store.read_object(&properties.source_bucket, key)?;
        let content_type = mime_guess::from_path(relative).first_or_octet_stream();
        store.write_object(
            &properties.destination_bucket,
            relative,
            &body,
            content_type.essence_str(),
        )?;
        published.insert(relative.to_string());
    }
    if published.is_empty() {
        return Err(format!(
            "no site objects under s3://{}/{}",
            properties.source_bucket, properties.source_prefix
        ));
    }

    let stale: Vec<String> = store
        .list_keys(&properties.destination_bucket, "")?
        .into_iter()
        .filter(|key| key != ENDPOINT_OBJECT_KEY && !published.contains(key))
        .collect();
    for key in &stale {
        store.delete_object(&properties.destination_bucket, key)?;
    }
    if !stale.is_empty() {
        tracing::info!(
            component = "content_publisher",
            event = "pruned",
            destination_bucket = %properties.destination_bucket,
            pruned_count = stale.len(),
        );
    }
    Ok(published.len())
}

/// The website bucket cannot be deleted while it holds objects, including
/// the endpoint record the writer added after publishing.
fn empty_bucket(bucket: &str, store: &dyn ObjectStore) -> Result<usize, String> {
    let keys = store.list_keys(bucket, "")?;
    for key in &keys {
        store.delete_object(bucket, key)?;
    }
    Ok(keys.len())
}
