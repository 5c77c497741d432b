use lambda_runtime::{service_fn, Error, LambdaEvent};
use reminder_stack_lambda::adapters::aws::S3ObjectStore;
use reminder_stack_lambda::adapters::response::HttpResponseSender;
use reminder_stack_lambda::handlers::custom_resource::{respond, CustomResourceEvent};
use reminder_stack_lambda::handlers::publisher::handle_publish_event;
use reminder_stack_lambda::observability::{init_logging, LogFormat};
use serde_json::Value;

async fn handle_request(
    event: LambdaEvent<Value>,
    store: &S3ObjectStore,
    sender: &HttpResponseSender,
) -> Result<Value, Error> {
    let event: CustomResourceEvent = serde_json::from_value(event.payload)
        .map_err(|error| Error::from(format!("invalid custom resource event: {error}")))?;
    let response = handle_publish_event(&event, store);
    respond(sender, &event, &response)?;
    Ok(serde_json::to_value(&response)?)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_logging(LogFormat::Json);

    let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let store = S3ObjectStore {
        client: aws_sdk_s3::Client::new(&config),
    };
    let sender = HttpResponseSender::default();

    let store = &store;
    let sender = &sender;
    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        handle_request(event, store, sender).await
    }))
    .await
}
