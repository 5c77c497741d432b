use lambda_runtime::{service_fn, Error, LambdaEvent};
use reminder_stack_lambda::adapters::aws::SnsSmsSender;
use reminder_stack_lambda::handlers::notify::handle_sms_reminder;
use reminder_stack_lambda::observability::{init_logging, LogFormat};
use serde_json::Value;

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_logging(LogFormat::Json);

    let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let sender = SnsSmsSender {
        client: aws_sdk_sns::Client::new(&config),
    };

    let sender = &sender;
    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        handle_sms_reminder(event.payload, sender).map_err(Error::from)
    }))
    .await
}
