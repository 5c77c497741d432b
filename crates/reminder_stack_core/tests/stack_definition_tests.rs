use reminder_stack_core::config::StackConfig;
use reminder_stack_core::endpoint::{is_valid_endpoint_url, render_endpoint_url};
use reminder_stack_core::gateway::ALLOWED_METHODS;
use reminder_stack_core::stack::{ids, StackDefinition};
use reminder_stack_core::template::synthesize;
use reminder_stack_core::workflow::WorkflowTemplate;
use reminder_stack_core::DefinitionError;
use serde_json::{json, Value};

fn define_with(config: &StackConfig) -> StackDefinition {
    StackDefinition::define(
        config,
        &WorkflowTemplate::bundled().expect("bundled template should parse"),
        "0123abcd",
    )
    .expect("stack should define")
}

fn template() -> Value {
    synthesize(&define_with(&StackConfig::default()))
}

fn inline_actions(template: &Value, role_id: &str) -> Vec<String> {
    let mut actions: Vec<String> = template["Resources"][role_id]["Properties"]["Policies"]
        .as_array()
        .into_iter()
        .flatten()
        .flat_map(|policy| {
            policy["PolicyDocument"]["Statement"]
                .as_array()
                .cloned()
                .unwrap_or_default()
        })
        .flat_map(|statement| {
            statement["Action"]
                .as_array()
                .cloned()
                .unwrap_or_default()
        })
        .filter_map(|action| action.as_str().map(str::to_string))
        .collect();
    actions.sort();
    actions
}

#[test]
fn dependency_graph_is_acyclic() {
    let stack = define_with(&StackConfig::default());
    let graph = stack.graph();

    graph.ensure_acyclic().expect("graph should be acyclic");
    let order = graph.creation_order().expect("graph should be acyclic");
    assert_eq!(order.len(), stack.descriptors.len());

    let position = |id: &str| {
        order
            .iter()
            .position(|candidate| candidate == id)
            .expect("id should be ordered")
    };
    for descriptor in &stack.descriptors {
        for dependency in descriptor.all_dependencies() {
            assert!(
                position(&dependency) < position(&descriptor.logical_id),
                "{dependency} must be created before {}",
                descriptor.logical_id
            );
        }
    }
}

#[test]
fn writer_never_runs_before_content_is_published() {
    let stack = define_with(&StackConfig::default());
    let graph = stack.graph();

    assert!(graph.must_precede(ids::CONTENT_PUBLISHER, ids::ENDPOINT_WRITER));
    assert!(graph.must_precede(ids::CONTENT_PUBLISHER, ids::WRITER_TRIGGER));
    assert!(graph.must_precede(ids::REST_API, ids::CONTENT_PUBLISHER));
    assert!(graph.must_precede(ids::REST_API, ids::ENDPOINT_WRITER));
    assert!(graph.must_precede(ids::WEBSITE_BUCKET, ids::CONTENT_PUBLISHER));
    assert!(!graph.must_precede(ids::WRITER_TRIGGER, ids::CONTENT_PUBLISHER));

    let destruction = graph.destruction_order().expect("graph should be acyclic");
    let trigger = destruction
        .iter()
        .position(|id| id == ids::WRITER_TRIGGER)
        .expect("trigger is destroyed");
    let publisher = destruction
        .iter()
        .position(|id| id == ids::CONTENT_PUBLISHER)
        .expect("publisher is destroyed");
    assert!(trigger < publisher);
}

#[test]
fn explicit_ordering_edges_are_rendered() {
    let template = template();
    let resources = &template["Resources"];

    assert_eq!(
        resources[ids::WRITER_TRIGGER]["DependsOn"],
        json!([ids::CONTENT_PUBLISHER])
    );
    assert_eq!(
        resources[ids::ENDPOINT_WRITER]["DependsOn"],
        json!([ids::CONTENT_PUBLISHER])
    );
    assert_eq!(resources[ids::CONTENT_PUBLISHER]["DependsOn"], json!([ids::REST_API]));
    let deployment_edges = resources[ids::API_DEPLOYMENT]["DependsOn"]
        .as_array()
        .expect("deployment has explicit edges");
    assert!(deployment_edges.contains(&json!(ids::POST_METHOD)));
}

#[test]
fn state_machine_targets_the_intended_functions() {
    let template = template();
    let definition = &template["Resources"][ids::STATE_MACHINE]["Properties"]["Definition"];
    let sms = json!({"Fn::GetAtt": [ids::SMS_REMINDER, "Arn"]});
    let email = json!({"Fn::GetAtt": [ids::EMAIL_REMINDER, "Arn"]});

    assert_eq!(definition["States"]["TextReminder"]["Resource"], sms);
    assert_eq!(definition["States"]["EmailReminder"]["Resource"], email);
    let branches = &definition["States"]["BothReminders"]["Branches"];
    assert_eq!(branches[0]["States"]["EmailReminderPar"]["Resource"], email);
    assert_eq!(branches[1]["States"]["TextReminderPar"]["Resource"], sms);
    assert_eq!(
        template["Resources"][ids::STATE_MACHINE]["Properties"]["StateMachineType"],
        "STANDARD"
    );
}

#[test]
fn options_preflight_allows_only_options_and_post() {
    let template = template();
    let options = &template["Resources"][ids::OPTIONS_METHOD]["Properties"];
    assert_eq!(options["HttpMethod"], "OPTIONS");

    let advertised = options["Integration"]["IntegrationResponses"][0]["ResponseParameters"]
        ["method.response.header.Access-Control-Allow-Methods"]
        .as_str()
        .expect("allowed methods is a literal");
    assert_eq!(advertised, format!("'{ALLOWED_METHODS}'"));
    assert_eq!(advertised, "'OPTIONS,POST'");
}

#[test]
fn endpoint_output_resolves_to_the_documented_shape() {
    let template = template();
    let parts = template["Outputs"]["ApiEndpoint"]["Value"]["Fn::Join"][1]
        .as_array()
        .expect("endpoint is a join")
        .clone();
    assert_eq!(parts[1], json!({"Ref": ids::REST_API}));

    let resolved: String = parts
        .iter()
        .map(|part| part.as_str().unwrap_or("a1b2c3d4e5"))
        .collect();
    assert_eq!(
        resolved,
        render_endpoint_url("a1b2c3d4e5", "us-east-1", "prod", "reminders")
    );
    assert!(is_valid_endpoint_url(&resolved));
}

#[test]
fn identities_receive_only_the_actions_their_functions_need() {
    let template = template();

    assert_eq!(inline_actions(&template, ids::TEXT_ROLE), vec!["sns:Publish"]);
    assert_eq!(
        inline_actions(&template, ids::EMAIL_ROLE),
        vec!["ses:SendEmail", "ses:SendRawEmail", "ses:SendTemplatedEmail"]
    );
    assert_eq!(
        inline_actions(&template, ids::STATE_ROLE),
        vec!["lambda:InvokeFunction"]
    );
    assert_eq!(
        inline_actions(&template, ids::API_HANDLER_ROLE),
        vec!["states:Start*", "states:StopExecution"]
    );
    assert_eq!(inline_actions(&template, ids::WRITE_ROLE), vec!["s3:PutObject"]);
    assert_eq!(
        inline_actions(&template, ids::TRIGGER_ROLE),
        vec!["lambda:InvokeFunction"]
    );
}

#[test]
fn sender_identity_flows_into_policy_and_environment() {
    let config = StackConfig {
        sender_email: "reminders@example.com".to_string(),
        ..StackConfig::default()
    };
    let template = synthesize(&define_with(&config));

    assert_eq!(
        template["Resources"][ids::EMAIL_REMINDER]["Properties"]["Environment"]["Variables"]
            ["EMAIL"],
        "reminders@example.com"
    );
    let resource = &template["Resources"][ids::EMAIL_ROLE]["Properties"]["Policies"][0]
        ["PolicyDocument"]["Statement"][0]["Resource"][0]["Fn::Join"][1];
    assert_eq!(resource[2], ":identity/reminders@example.com");
}

#[test]
fn broken_template_aborts_synthesis() {
    let template = WorkflowTemplate::from_json_str(r#"{"States": {}}"#)
        .expect("template should parse");
    let result = StackDefinition::define(&StackConfig::default(), &template, "0123abcd");

    assert!(matches!(
        result,
        Err(DefinitionError::MissingTemplateField { ref path })
            if path == "States.TextReminder.Resource"
    ));
}
