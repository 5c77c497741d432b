use lambda_runtime::{service_fn, Error, LambdaEvent};
use reminder_stack_core::contract::ApiGatewayResponse;
use reminder_stack_lambda::adapters::aws::StepFunctionsStarter;
use reminder_stack_lambda::handlers::api::handle_api_event;
use reminder_stack_lambda::observability::{init_logging, LogFormat};
use serde_json::Value;

async fn handle_request(
    event: LambdaEvent<Value>,
    state_machine_arn: Option<&str>,
    starter: &StepFunctionsStarter,
) -> Result<ApiGatewayResponse, Error> {
    Ok(handle_api_event(event.payload, state_machine_arn, starter))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_logging(LogFormat::Json);

    let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let starter = StepFunctionsStarter {
        client: aws_sdk_sfn::Client::new(&config),
    };
    let state_machine_arn = std::env::var("SFN_ARN").ok();

    let starter = &starter;
    let state_machine_arn = state_machine_arn.as_deref();
    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        handle_request(event, state_machine_arn, starter).await
    }))
    .await
}
