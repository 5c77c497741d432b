//! Composition root: every descriptor of the reminder stack, in dependency
//! order, with the explicit edges the reference graph alone cannot express.

use serde_json::json;

use crate::config::StackConfig;
use crate::endpoint::{endpoint_url_expr, RESOURCE_PATH, STAGE_NAME};
use crate::error::Result;
use crate::gateway::GatewaySpec;
use crate::graph::DependencyGraph;
use crate::policy::{
    PolicyStatement, RoleSpec, APIGATEWAY_PRINCIPAL, LAMBDA_PRINCIPAL, STATES_PRINCIPAL,
};
use crate::reference::{Expr, Pseudo};
use crate::resource::ResourceDescriptor;
use crate::workflow::{NotificationTargets, WorkflowTemplate};

pub mod ids {
    pub const WEBSITE_BUCKET: &str = "WebsiteBucket";
    pub const WEBSITE_BUCKET_POLICY: &str = "WebsiteBucketPolicy";
    pub const PUBLISHER_ROLE: &str = "PublisherRole";
    pub const PUBLISHER_FUNCTION: &str = "PublisherFunction";
    pub const CONTENT_PUBLISHER: &str = "ContentPublisher";
    pub const TEXT_ROLE: &str = "TextRole";
    pub const SMS_REMINDER: &str = "SmsReminder";
    pub const EMAIL_ROLE: &str = "EmailRole";
    pub const EMAIL_REMINDER: &str = "EmailReminder";
    pub const STATE_ROLE: &str = "StateRole";
    pub const STATE_MACHINE: &str = "StateMachine";
    pub const API_HANDLER_ROLE: &str = "ApiHandlerRole";
    pub const API_HANDLER: &str = "ApiHandler";
    pub const API_GATEWAY_ROLE: &str = "ApiGatewayRole";
    pub const REST_API: &str = "RestApi";
    pub const REMINDERS_RESOURCE: &str = "RemindersResource";
    pub const POST_METHOD: &str = "PostMethod";
    pub const OPTIONS_METHOD: &str = "OptionsMethod";
    pub const API_DEPLOYMENT: &str = "ApiDeployment";
    pub const PROD_STAGE: &str = "ProdStage";
    pub const API_INVOKE_PERMISSION: &str = "ApiInvokePermission";
    pub const WRITE_ROLE: &str = "WriteRole";
    pub const ENDPOINT_WRITER: &str = "EndpointWriter";
    pub const TRIGGER_ROLE: &str = "TriggerRole";
    pub const TRIGGER_FUNCTION: &str = "TriggerFunction";
    pub const WRITER_TRIGGER: &str = "EndpointWriterTrigger";
}

pub const PUBLISHER_RESOURCE_TYPE: &str = "Custom::ContentPublisher";
pub const TRIGGER_RESOURCE_TYPE: &str = "Custom::EndpointWriterTrigger";

/// Physical ids reported by the writer trigger. Create and update use
/// different tokens, so an update may be treated as a replacement.
pub const TRIGGER_CREATE_PHYSICAL_ID: &str = "writeFileInvoker";
pub const TRIGGER_UPDATE_PHYSICAL_ID: &str = "writeFileInvokerUpdate";

const LAMBDA_RUNTIME: &str = "provided.al2023";

#[derive(Debug, Clone, PartialEq)]
pub struct StackOutput {
    pub logical_id: String,
    pub description: String,
    pub value: Expr,
}

/// The finished, validated descriptor set.
#[derive(Debug, Clone)]
pub struct StackDefinition {
    pub description: String,
    pub descriptors: Vec<ResourceDescriptor>,
    pub outputs: Vec<StackOutput>,
    graph: DependencyGraph,
}

impl StackDefinition {
    /// Assembles all descriptors and validates the resulting graph.
    ///
    /// `site_fingerprint` is the content hash of the static site bundle; a new
    /// value re-runs the publisher and the endpoint writer.
    pub fn define(
        config: &StackConfig,
        workflow: &WorkflowTemplate,
        site_fingerprint: &str,
    ) -> Result<Self> {
        config.validate()?;
        let mut descriptors = Vec::new();

        // 1. storage resource
        descriptors.push(website_bucket(config));
        descriptors.push(website_bucket_policy());

        // 3. notification functions
        let text_role = RoleSpec::new(ids::TEXT_ROLE, LAMBDA_PRINCIPAL)
            .named("textRole")
            .with_basic_execution()
            .allow(PolicyStatement::new(["sns:Publish"], [Expr::str("*")]));
        descriptors.push(text_role.to_descriptor()?);
        descriptors.push(function(
            config,
            ids::SMS_REMINDER,
            &config.functions.sms_reminder,
            ids::TEXT_ROLE,
            [],
        ));

        let email_identity = Expr::join([
            Expr::str(format!("arn:aws:ses:{}:", config.region)),
            Expr::Pseudo(Pseudo::AccountId),
            Expr::str(format!(":identity/{}", config.sender_email)),
        ]);
        let email_role = RoleSpec::new(ids::EMAIL_ROLE, LAMBDA_PRINCIPAL)
            .with_basic_execution()
            .allow(PolicyStatement::new(
                ["ses:SendEmail", "ses:SendRawEmail", "ses:SendTemplatedEmail"],
                [email_identity],
            ));
        descriptors.push(email_role.to_descriptor()?);
        descriptors.push(function(
            config,
            ids::EMAIL_REMINDER,
            &config.functions.email_reminder,
            ids::EMAIL_ROLE,
            [("EMAIL", Expr::str(&config.sender_email))],
        ));

        // 4. workflow definition
        let state_role = RoleSpec::new(ids::STATE_ROLE, STATES_PRINCIPAL)
            .named("stateRole")
            .with_basic_execution()
            .allow(PolicyStatement::new(
                ["lambda:InvokeFunction"],
                [
                    Expr::arn_of(ids::EMAIL_REMINDER),
                    Expr::arn_of(ids::SMS_REMINDER),
                ],
            ));
        descriptors.push(state_role.to_descriptor()?);
        let definition = workflow.patch(&NotificationTargets {
            sms: Expr::arn_of(ids::SMS_REMINDER),
            email: Expr::arn_of(ids::EMAIL_REMINDER),
        })?;
        descriptors.push(
            ResourceDescriptor::new(ids::STATE_MACHINE, "AWS::StepFunctions::StateMachine")
                .with_property("StateMachineName", config.state_machine_name.as_str())
                .with_property("StateMachineType", "STANDARD")
                .with_property("RoleArn", state_role.arn())
                .with_property("Definition", definition),
        );

        // 5. workflow-invoking function
        let api_handler_role = RoleSpec::new(ids::API_HANDLER_ROLE, LAMBDA_PRINCIPAL)
            .named("apiHandlerRole")
            .with_basic_execution()
            .allow(PolicyStatement::new(
                ["states:Start*", "states:StopExecution"],
                [Expr::reference(ids::STATE_MACHINE)],
            ));
        descriptors.push(api_handler_role.to_descriptor()?);
        descriptors.push(function(
            config,
            ids::API_HANDLER,
            &config.functions.api_handler,
            ids::API_HANDLER_ROLE,
            [("SFN_ARN", Expr::reference(ids::STATE_MACHINE))],
        ));

        // 6. HTTP surface
        let gateway_role = RoleSpec::new(ids::API_GATEWAY_ROLE, APIGATEWAY_PRINCIPAL)
            .named("apiRole")
            .allow(PolicyStatement::new(
                ["lambda:InvokeFunction"],
                [Expr::arn_of(ids::API_HANDLER)],
            ));
        descriptors.push(gateway_role.to_descriptor()?);
        let gateway = GatewaySpec {
            api_id: ids::REST_API,
            resource_id: ids::REMINDERS_RESOURCE,
            post_method_id: ids::POST_METHOD,
            options_method_id: ids::OPTIONS_METHOD,
            deployment_id: ids::API_DEPLOYMENT,
            stage_id: ids::PROD_STAGE,
            permission_id: ids::API_INVOKE_PERMISSION,
            api_name: &config.api_name,
            region: &config.region,
            stage_name: STAGE_NAME,
            resource_path: RESOURCE_PATH,
            handler_function_id: ids::API_HANDLER,
            integration_role_id: ids::API_GATEWAY_ROLE,
            allowed_origin: website_url(),
        };
        descriptors.extend(gateway.descriptors());

        // 2. content publisher; the published site embeds the endpoint, so
        // it waits for the API.
        let source_prefix = config.site_source_prefix();
        let publisher_role = RoleSpec::new(ids::PUBLISHER_ROLE, LAMBDA_PRINCIPAL)
            .with_basic_execution()
            .allow(PolicyStatement::new(
                ["s3:GetObject"],
                [Expr::str(format!(
                    "arn:aws:s3:::{}/{source_prefix}*",
                    config.asset_bucket
                ))],
            ))
            .allow(PolicyStatement::new(
                ["s3:ListBucket"],
                [
                    Expr::str(format!("arn:aws:s3:::{}", config.asset_bucket)),
                    Expr::get_att(ids::WEBSITE_BUCKET, "Arn"),
                ],
            ))
            .allow(PolicyStatement::new(
                ["s3:PutObject", "s3:DeleteObject"],
                [bucket_objects_arn()],
            ));
        descriptors.push(publisher_role.to_descriptor()?);
        descriptors.push(function(
            config,
            ids::PUBLISHER_FUNCTION,
            &config.functions.content_publisher,
            ids::PUBLISHER_ROLE,
            [],
        ));
        descriptors.push(
            ResourceDescriptor::new(ids::CONTENT_PUBLISHER, PUBLISHER_RESOURCE_TYPE)
                .with_property("ServiceToken", Expr::arn_of(ids::PUBLISHER_FUNCTION))
                .with_property("SourceBucket", config.asset_bucket.as_str())
                .with_property("SourcePrefix", source_prefix.as_str())
                .with_property("DestinationBucket", Expr::reference(ids::WEBSITE_BUCKET))
                .with_property("SiteFingerprint", site_fingerprint)
                .depends_on(ids::REST_API),
        );

        // 7. post-deployment writer and its once-per-deployment trigger
        let endpoint = endpoint_url_expr(
            ids::REST_API,
            &config.region,
            STAGE_NAME,
            RESOURCE_PATH,
        );
        // Basic execution is attached so failures the writer logs are
        // actually delivered to CloudWatch.
        let write_role = RoleSpec::new(ids::WRITE_ROLE, LAMBDA_PRINCIPAL)
            .named("writeS3Role")
            .with_basic_execution()
            .allow(PolicyStatement::new(["s3:PutObject"], [bucket_objects_arn()]));
        descriptors.push(write_role.to_descriptor()?);
        descriptors.push(
            function(
                config,
                ids::ENDPOINT_WRITER,
                &config.functions.endpoint_writer,
                ids::WRITE_ROLE,
                [
                    ("API_ENDPOINT", endpoint.clone()),
                    ("BUCKET_NAME", Expr::reference(ids::WEBSITE_BUCKET)),
                ],
            )
            .depends_on(ids::CONTENT_PUBLISHER),
        );

        let trigger_role = RoleSpec::new(ids::TRIGGER_ROLE, LAMBDA_PRINCIPAL)
            .with_basic_execution()
            .allow(PolicyStatement::new(
                ["lambda:InvokeFunction"],
                [Expr::arn_of(ids::ENDPOINT_WRITER)],
            ));
        descriptors.push(trigger_role.to_descriptor()?);
        descriptors.push(function(
            config,
            ids::TRIGGER_FUNCTION,
            &config.functions.writer_trigger,
            ids::TRIGGER_ROLE,
            [],
        ));
        descriptors.push(
            ResourceDescriptor::new(ids::WRITER_TRIGGER, TRIGGER_RESOURCE_TYPE)
                .with_property("ServiceToken", Expr::arn_of(ids::TRIGGER_FUNCTION))
                .with_property("FunctionName", Expr::reference(ids::ENDPOINT_WRITER))
                .with_property("CreatePhysicalResourceId", TRIGGER_CREATE_PHYSICAL_ID)
                .with_property("UpdatePhysicalResourceId", TRIGGER_UPDATE_PHYSICAL_ID)
                .with_property("ApiEndpoint", endpoint.clone())
                .with_property("SiteFingerprint", site_fingerprint)
                .depends_on(ids::CONTENT_PUBLISHER),
        );

        let outputs = vec![
            StackOutput {
                logical_id: "BucketUrl".to_string(),
                description: "Static website URL".to_string(),
                value: website_url(),
            },
            StackOutput {
                logical_id: "ApiEndpoint".to_string(),
                description: "Reminder endpoint URL".to_string(),
                value: endpoint,
            },
        ];

        let graph = DependencyGraph::build(&descriptors)?;
        graph.ensure_acyclic()?;
        tracing::info!(
            stack = %config.stack_name,
            resources = descriptors.len(),
            edges = graph.edge_count(),
            "stack defined"
        );

        Ok(Self {
            description: format!("{}: reminder website, workflow and API", config.stack_name),
            descriptors,
            outputs,
            graph,
        })
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn descriptor(&self, logical_id: &str) -> Option<&ResourceDescriptor> {
        self.descriptors
            .iter()
            .find(|descriptor| descriptor.logical_id == logical_id)
    }
}

fn website_url() -> Expr {
    Expr::get_att(ids::WEBSITE_BUCKET, "WebsiteURL")
}

fn bucket_objects_arn() -> Expr {
    Expr::join([Expr::get_att(ids::WEBSITE_BUCKET, "Arn"), Expr::str("/*")])
}

fn website_bucket(config: &StackConfig) -> ResourceDescriptor {
    ResourceDescriptor::new(ids::WEBSITE_BUCKET, "AWS::S3::Bucket")
        .with_property("BucketName", config.website_bucket_name.as_str())
        .with_property(
            "WebsiteConfiguration",
            Expr::object([
                ("IndexDocument", Expr::str("index.html")),
                ("ErrorDocument", Expr::str("error.html")),
            ]),
        )
        .with_property(
            "PublicAccessBlockConfiguration",
            Expr::Json(json!({
                "BlockPublicAcls": false,
                "BlockPublicPolicy": false,
                "IgnorePublicAcls": false,
                "RestrictPublicBuckets": false,
            })),
        )
}

fn website_bucket_policy() -> ResourceDescriptor {
    ResourceDescriptor::new(ids::WEBSITE_BUCKET_POLICY, "AWS::S3::BucketPolicy")
        .with_property("Bucket", Expr::reference(ids::WEBSITE_BUCKET))
        .with_property(
            "PolicyDocument",
            Expr::object([
                ("Version", Expr::str("2012-10-17")),
                (
                    "Statement",
                    Expr::list([Expr::object([
                        ("Effect", Expr::str("Allow")),
                        ("Principal", Expr::str("*")),
                        ("Action", Expr::str("s3:GetObject")),
                        ("Resource", bucket_objects_arn()),
                    ])]),
                ),
            ]),
        )
}

fn function<const N: usize>(
    config: &StackConfig,
    logical_id: &str,
    function_name: &str,
    role_id: &str,
    environment: [(&str, Expr); N],
) -> ResourceDescriptor {
    let mut descriptor = ResourceDescriptor::new(logical_id, "AWS::Lambda::Function")
        .with_property("FunctionName", function_name)
        .with_property("Runtime", LAMBDA_RUNTIME)
        .with_property("Handler", "bootstrap")
        .with_property("Timeout", Expr::Int(30))
        .with_property(
            "Code",
            Expr::object([
                ("S3Bucket", Expr::str(&config.asset_bucket)),
                ("S3Key", Expr::str(config.artifact_key(function_name))),
            ]),
        )
        .with_property("Role", Expr::arn_of(role_id));
    if N > 0 {
        descriptor = descriptor.with_property(
            "Environment",
            Expr::object([("Variables", Expr::object(environment))]),
        );
    }
    descriptor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn define() -> StackDefinition {
        StackDefinition::define(
            &StackConfig::default(),
            &WorkflowTemplate::bundled().expect("bundled template"),
            "site-hash",
        )
        .expect("stack should define")
    }

    #[test]
    fn every_function_has_its_own_role() {
        let stack = define();
        let functions: Vec<&ResourceDescriptor> = stack
            .descriptors
            .iter()
            .filter(|descriptor| descriptor.resource_type == "AWS::Lambda::Function")
            .collect();
        assert_eq!(functions.len(), 6);

        let mut roles: Vec<String> = functions
            .iter()
            .map(|descriptor| descriptor.properties["Role"].references().into_iter().collect())
            .collect::<Vec<Vec<String>>>()
            .concat();
        roles.sort();
        roles.dedup();
        assert_eq!(roles.len(), 6);
    }

    #[test]
    fn environment_matches_callable_contracts() {
        let stack = define();
        let writer = stack
            .descriptor(ids::ENDPOINT_WRITER)
            .expect("writer is declared")
            .to_template_value();
        let variables = &writer["Properties"]["Environment"]["Variables"];
        assert_eq!(variables["BUCKET_NAME"], json!({"Ref": "WebsiteBucket"}));
        assert!(variables["API_ENDPOINT"]["Fn::Join"].is_array());

        let handler = stack
            .descriptor(ids::API_HANDLER)
            .expect("handler is declared")
            .to_template_value();
        assert_eq!(
            handler["Properties"]["Environment"]["Variables"],
            json!({"SFN_ARN": {"Ref": "StateMachine"}})
        );

        let email = stack
            .descriptor(ids::EMAIL_REMINDER)
            .expect("email function is declared")
            .to_template_value();
        assert_eq!(email["Properties"]["Environment"]["Variables"]["EMAIL"], "");

        let sms = stack
            .descriptor(ids::SMS_REMINDER)
            .expect("sms function is declared")
            .to_template_value();
        assert!(sms["Properties"].get("Environment").is_none());
    }

    #[test]
    fn trigger_carries_create_and_update_physical_ids() {
        let stack = define();
        let trigger = stack.descriptor(ids::WRITER_TRIGGER).expect("trigger is declared");
        assert_eq!(
            trigger.properties["CreatePhysicalResourceId"].as_literal(),
            Some(TRIGGER_CREATE_PHYSICAL_ID)
        );
        assert_eq!(
            trigger.properties["UpdatePhysicalResourceId"].as_literal(),
            Some(TRIGGER_UPDATE_PHYSICAL_ID)
        );
        assert_eq!(
            trigger.properties["SiteFingerprint"].as_literal(),
            Some("site-hash")
        );
    }

    #[test]
    fn invalid_config_aborts_definition() {
        let config = StackConfig {
            api_name: " ".to_string(),
            ..StackConfig::default()
        };
        let result = StackDefinition::define(
            &config,
            &WorkflowTemplate::bundled().expect("bundled template"),
            "site-hash",
        );
        assert!(result.is_err());
    }
}
