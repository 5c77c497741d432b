use lambda_runtime::{service_fn, Error, LambdaEvent};
use reminder_stack_lambda::adapters::aws::SesEmailSender;
use reminder_stack_lambda::handlers::notify::handle_email_reminder;
use reminder_stack_lambda::observability::{init_logging, LogFormat};
use serde_json::Value;

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_logging(LogFormat::Json);

    let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let sender = SesEmailSender {
        client: aws_sdk_sesv2::Client::new(&config),
    };
    let source = std::env::var("EMAIL").ok();

    let sender = &sender;
    let source = source.as_deref();
    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        handle_email_reminder(event.payload, source, sender).map_err(Error::from)
    }))
    .await
}
