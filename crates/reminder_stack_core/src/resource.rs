use std::collections::{BTreeMap, BTreeSet};

use serde_json::{json, Map, Value};

use crate::error::{DefinitionError, Result};
use crate::reference::Expr;

/// A declarative record describing one managed resource.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDescriptor {
    pub logical_id: String,
    pub resource_type: String,
    pub properties: BTreeMap<String, Expr>,
    /// Explicit ordering edges on top of the ones implied by references.
    pub depends_on: BTreeSet<String>,
}

impl ResourceDescriptor {
    pub fn new(logical_id: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            logical_id: logical_id.into(),
            resource_type: resource_type.into(),
            properties: BTreeMap::new(),
            depends_on: BTreeSet::new(),
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Expr>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn depends_on(mut self, logical_id: impl Into<String>) -> Self {
        self.depends_on.insert(logical_id.into());
        self
    }

    /// Every id referenced from a property, its own id included.
    pub fn implicit_dependencies(&self) -> BTreeSet<String> {
        self.properties.values().flat_map(Expr::references).collect()
    }

    pub fn all_dependencies(&self) -> BTreeSet<String> {
        let mut all = self.implicit_dependencies();
        all.extend(self.depends_on.iter().cloned());
        all
    }

    pub fn validate_logical_id(&self) -> Result<()> {
        validate_logical_id(&self.logical_id)
    }

    pub fn to_template_value(&self) -> Value {
        let mut body = Map::new();
        body.insert("Type".to_string(), json!(self.resource_type));
        if !self.properties.is_empty() {
            let properties: Map<String, Value> = self
                .properties
                .iter()
                .map(|(name, value)| (name.clone(), value.to_template_value()))
                .collect();
            body.insert("Properties".to_string(), Value::Object(properties));
        }
        if !self.depends_on.is_empty() {
            body.insert("DependsOn".to_string(), json!(self.depends_on));
        }
        Value::Object(body)
    }
}

pub fn validate_logical_id(logical_id: &str) -> Result<()> {
    if logical_id.is_empty() || !logical_id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(DefinitionError::InvalidLogicalId(logical_id.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_and_implicit_edges_are_merged() {
        let descriptor = ResourceDescriptor::new("EndpointWriter", "AWS::Lambda::Function")
            .with_property("Role", Expr::arn_of("WriteRole"))
            .depends_on("ContentPublisher");

        let all: Vec<String> = descriptor.all_dependencies().into_iter().collect();
        assert_eq!(all, vec!["ContentPublisher", "WriteRole"]);
        assert_eq!(descriptor.implicit_dependencies().len(), 1);
    }

    #[test]
    fn rejects_non_alphanumeric_logical_ids() {
        assert!(validate_logical_id("ApiDeployment").is_ok());
        assert!(matches!(
            validate_logical_id("api-deploy"),
            Err(DefinitionError::InvalidLogicalId(id)) if id == "api-deploy"
        ));
        assert!(validate_logical_id("").is_err());
    }

    #[test]
    fn renders_depends_on_only_when_declared() {
        let plain = ResourceDescriptor::new("RestApi", "AWS::ApiGateway::RestApi")
            .with_property("Name", "reminders-api");
        assert!(plain.to_template_value().get("DependsOn").is_none());

        let ordered = plain.clone().depends_on("Bucket");
        assert_eq!(ordered.to_template_value()["DependsOn"], json!(["Bucket"]));
    }
}
