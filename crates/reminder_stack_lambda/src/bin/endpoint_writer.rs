use lambda_runtime::{service_fn, Error, LambdaEvent};
use reminder_stack_lambda::adapters::aws::S3ObjectStore;
use reminder_stack_lambda::handlers::writer::{handle_write, WriterConfig};
use reminder_stack_lambda::observability::{init_logging, LogFormat};
use serde_json::{json, Value};

async fn handle_request(
    _event: LambdaEvent<Value>,
    store: &S3ObjectStore,
) -> Result<Value, Error> {
    let config = WriterConfig::from_env()?;
    let outcome = handle_write(&config, store)?;
    Ok(json!({
        "bucket": outcome.bucket,
        "key": outcome.key,
        "writtenAt": outcome.written_at.to_rfc3339(),
    }))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_logging(LogFormat::Json);

    let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let store = S3ObjectStore {
        client: aws_sdk_s3::Client::new(&config),
    };

    let store = &store;
    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        handle_request(event, store).await
    }))
    .await
}
