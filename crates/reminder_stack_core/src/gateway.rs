//! REST API descriptors: one resource path with `POST` and `OPTIONS`.

use serde_json::json;

use crate::reference::{Expr, Pseudo};
use crate::resource::ResourceDescriptor;

pub const ALLOWED_HEADERS: &str =
    "Content-Type,X-Amz-Date,Authorization,X-Api-Key,X-Amz-Security-Token";
pub const ALLOWED_METHODS: &str = "OPTIONS,POST";

const ALLOW_ORIGIN: &str = "method.response.header.Access-Control-Allow-Origin";
const ALLOW_HEADERS: &str = "method.response.header.Access-Control-Allow-Headers";
const ALLOW_METHODS: &str = "method.response.header.Access-Control-Allow-Methods";

/// Logical ids and names the HTTP surface is assembled from.
#[derive(Debug, Clone)]
pub struct GatewaySpec<'a> {
    pub api_id: &'a str,
    pub resource_id: &'a str,
    pub post_method_id: &'a str,
    pub options_method_id: &'a str,
    pub deployment_id: &'a str,
    pub stage_id: &'a str,
    pub permission_id: &'a str,
    pub api_name: &'a str,
    pub region: &'a str,
    pub stage_name: &'a str,
    pub resource_path: &'a str,
    /// Logical id of the workflow-invoking function.
    pub handler_function_id: &'a str,
    /// Role API Gateway assumes to invoke the handler.
    pub integration_role_id: &'a str,
    /// Origin allowed to call the endpoint, usually the website URL.
    pub allowed_origin: Expr,
}

impl GatewaySpec<'_> {
    pub fn rest_api(&self) -> ResourceDescriptor {
        ResourceDescriptor::new(self.api_id, "AWS::ApiGateway::RestApi")
            .with_property("Name", self.api_name)
            .with_property(
                "EndpointConfiguration",
                Expr::object([("Types", Expr::strings(["REGIONAL"]))]),
            )
    }

    pub fn resource(&self) -> ResourceDescriptor {
        ResourceDescriptor::new(self.resource_id, "AWS::ApiGateway::Resource")
            .with_property("RestApiId", Expr::reference(self.api_id))
            .with_property("ParentId", Expr::get_att(self.api_id, "RootResourceId"))
            .with_property("PathPart", self.resource_path)
    }

    /// `POST` proxies synchronously to the handler with a permissive origin.
    pub fn post_method(&self) -> ResourceDescriptor {
        let uri = Expr::join([
            Expr::str(format!(
                "arn:aws:apigateway:{}:lambda:path/2015-03-31/functions/",
                self.region
            )),
            Expr::arn_of(self.handler_function_id),
            Expr::str("/invocations"),
        ]);

        let integration = Expr::object([
            ("Type", Expr::str("AWS")),
            ("IntegrationHttpMethod", Expr::str("POST")),
            ("Uri", uri),
            ("Credentials", Expr::arn_of(self.integration_role_id)),
            (
                "IntegrationResponses",
                Expr::Json(json!([{
                    "StatusCode": "200",
                    "ResponseParameters": { ALLOW_ORIGIN: "'*'" },
                    "ResponseTemplates": { "application/json": "" },
                }])),
            ),
            (
                "RequestTemplates",
                Expr::Json(json!({ "application/json": "" })),
            ),
        ]);

        self.method(self.post_method_id, "POST")
            .with_property("Integration", integration)
            .with_property(
                "MethodResponses",
                Expr::Json(json!([{
                    "StatusCode": "200",
                    "ResponseModels": { "application/json": "Empty" },
                    "ResponseParameters": { ALLOW_ORIGIN: true },
                }])),
            )
    }

    /// `OPTIONS` is a mocked preflight restricted to the allowed origin.
    pub fn options_method(&self) -> ResourceDescriptor {
        let origin = Expr::join([
            Expr::str("'"),
            self.allowed_origin.clone(),
            Expr::str("'"),
        ]);

        let integration = Expr::object([
            ("Type", Expr::str("MOCK")),
            ("IntegrationHttpMethod", Expr::str("OPTIONS")),
            (
                "IntegrationResponses",
                Expr::list([Expr::object([
                    ("StatusCode", Expr::str("200")),
                    (
                        "ResponseParameters",
                        Expr::object([
                            (ALLOW_HEADERS, Expr::str(format!("'{ALLOWED_HEADERS}'"))),
                            (ALLOW_METHODS, Expr::str(format!("'{ALLOWED_METHODS}'"))),
                            (ALLOW_ORIGIN, origin),
                        ]),
                    ),
                    (
                        "ResponseTemplates",
                        Expr::Json(json!({ "application/json": "" })),
                    ),
                ])]),
            ),
            (
                "RequestTemplates",
                Expr::Json(json!({ "application/json": "{\"statusCode\": 200}" })),
            ),
        ]);

        self.method(self.options_method_id, "OPTIONS")
            .with_property("Integration", integration)
            .with_property(
                "RequestModels",
                Expr::Json(json!({ "application/json": "Empty" })),
            )
            .with_property(
                "MethodResponses",
                Expr::Json(json!([{
                    "StatusCode": "200",
                    "ResponseModels": { "application/json": "Empty" },
                    "ResponseParameters": {
                        ALLOW_HEADERS: true,
                        ALLOW_METHODS: true,
                        ALLOW_ORIGIN: true,
                    },
                }])),
            )
    }

    /// A deployment snapshot taken only once the `POST` method exists.
    pub fn deployment(&self) -> ResourceDescriptor {
        ResourceDescriptor::new(self.deployment_id, "AWS::ApiGateway::Deployment")
            .with_property("RestApiId", Expr::reference(self.api_id))
            .depends_on(self.post_method_id)
            .depends_on(self.options_method_id)
    }

    pub fn stage(&self) -> ResourceDescriptor {
        ResourceDescriptor::new(self.stage_id, "AWS::ApiGateway::Stage")
            .with_property("RestApiId", Expr::reference(self.api_id))
            .with_property("StageName", self.stage_name)
            .with_property("DeploymentId", Expr::reference(self.deployment_id))
    }

    /// Lets the gateway invoke the handler for `POST` on the resource path.
    pub fn invoke_permission(&self) -> ResourceDescriptor {
        let source_arn = Expr::join([
            Expr::str(format!("arn:aws:execute-api:{}:", self.region)),
            Expr::Pseudo(Pseudo::AccountId),
            Expr::str(":"),
            Expr::reference(self.api_id),
            Expr::str(format!("/*/POST/{}", self.resource_path)),
        ]);

        ResourceDescriptor::new(self.permission_id, "AWS::Lambda::Permission")
            .with_property("Action", "lambda:InvokeFunction")
            .with_property("FunctionName", Expr::arn_of(self.handler_function_id))
            .with_property("Principal", crate::policy::APIGATEWAY_PRINCIPAL)
            .with_property("SourceArn", source_arn)
    }

    pub fn descriptors(&self) -> Vec<ResourceDescriptor> {
        vec![
            self.rest_api(),
            self.resource(),
            self.post_method(),
            self.options_method(),
            self.deployment(),
            self.stage(),
            self.invoke_permission(),
        ]
    }

    fn method(&self, logical_id: &str, http_method: &str) -> ResourceDescriptor {
        ResourceDescriptor::new(logical_id, "AWS::ApiGateway::Method")
            .with_property("RestApiId", Expr::reference(self.api_id))
            .with_property("ResourceId", Expr::reference(self.resource_id))
            .with_property("HttpMethod", http_method)
            .with_property("AuthorizationType", "NONE")
            .with_property("ApiKeyRequired", false)
    }
}
