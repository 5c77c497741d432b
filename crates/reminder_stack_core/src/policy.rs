use serde_json::json;

use crate::error::{DefinitionError, Result};
use crate::reference::{Expr, Pseudo};
use crate::resource::ResourceDescriptor;

pub const LAMBDA_PRINCIPAL: &str = "lambda.amazonaws.com";
pub const STATES_PRINCIPAL: &str = "states.amazonaws.com";
pub const APIGATEWAY_PRINCIPAL: &str = "apigateway.amazonaws.com";

/// Managed policy granting CloudWatch Logs write access to a function.
pub fn lambda_basic_execution() -> Expr {
    Expr::join([
        Expr::str("arn:"),
        Expr::Pseudo(Pseudo::Partition),
        Expr::str(":iam::aws:policy/service-role/AWSLambdaBasicExecutionRole"),
    ])
}

/// An `Allow` statement over a set of actions and resources.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyStatement {
    pub actions: Vec<String>,
    pub resources: Vec<Expr>,
}

impl PolicyStatement {
    pub fn new<S: Into<String>>(
        actions: impl IntoIterator<Item = S>,
        resources: impl IntoIterator<Item = Expr>,
    ) -> Self {
        Self {
            actions: actions.into_iter().map(Into::into).collect(),
            resources: resources.into_iter().collect(),
        }
    }

    /// Whether `action` is granted, honouring trailing `*` wildcards.
    pub fn allows(&self, action: &str) -> bool {
        self.actions.iter().any(|granted| match granted.strip_suffix('*') {
            Some(prefix) => action.starts_with(prefix),
            None => granted == action,
        })
    }

    fn to_expr(&self) -> Expr {
        Expr::object([
            ("Effect", Expr::str("Allow")),
            ("Action", Expr::strings(self.actions.iter().cloned())),
            ("Resource", Expr::List(self.resources.clone())),
        ])
    }
}

/// An identity assumed by one service principal.
#[derive(Debug, Clone, PartialEq)]
pub struct RoleSpec {
    pub logical_id: String,
    pub role_name: Option<String>,
    pub principal: String,
    pub managed_policies: Vec<Expr>,
    pub statements: Vec<PolicyStatement>,
}

impl RoleSpec {
    pub fn new(logical_id: impl Into<String>, principal: impl Into<String>) -> Self {
        Self {
            logical_id: logical_id.into(),
            role_name: None,
            principal: principal.into(),
            managed_policies: Vec::new(),
            statements: Vec::new(),
        }
    }

    pub fn named(mut self, role_name: impl Into<String>) -> Self {
        self.role_name = Some(role_name.into());
        self
    }

    pub fn with_basic_execution(mut self) -> Self {
        self.managed_policies.push(lambda_basic_execution());
        self
    }

    pub fn allow(mut self, statement: PolicyStatement) -> Self {
        self.statements.push(statement);
        self
    }

    pub fn allows(&self, action: &str) -> bool {
        self.statements.iter().any(|statement| statement.allows(action))
    }

    pub fn arn(&self) -> Expr {
        Expr::arn_of(&self.logical_id)
    }

    pub fn to_descriptor(&self) -> Result<ResourceDescriptor> {
        for statement in &self.statements {
            if statement.actions.is_empty() || statement.resources.is_empty() {
                return Err(DefinitionError::EmptyPolicy(self.logical_id.clone()));
            }
        }

        let trust = Expr::Json(json!({
            "Version": "2012-10-17",
            "Statement": [{
                "Effect": "Allow",
                "Principal": { "Service": self.principal },
                "Action": "sts:AssumeRole",
            }],
        }));

        let mut descriptor = ResourceDescriptor::new(&self.logical_id, "AWS::IAM::Role")
            .with_property("AssumeRolePolicyDocument", trust);
        if let Some(name) = &self.role_name {
            descriptor = descriptor.with_property("RoleName", name.as_str());
        }
        if !self.managed_policies.is_empty() {
            descriptor = descriptor
                .with_property("ManagedPolicyArns", Expr::List(self.managed_policies.clone()));
        }
        if !self.statements.is_empty() {
            let document = Expr::object([
                ("Version", Expr::str("2012-10-17")),
                (
                    "Statement",
                    Expr::list(self.statements.iter().map(PolicyStatement::to_expr)),
                ),
            ]);
            descriptor = descriptor.with_property(
                "Policies",
                Expr::list([Expr::object([
                    ("PolicyName", Expr::str(format!("{}Policy", self.logical_id))),
                    ("PolicyDocument", document),
                ])]),
            );
        }
        Ok(descriptor)
    }
}
