use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::stack::StackDefinition;

pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// Renders the definition as a CloudFormation template.
///
/// `Metadata.Fingerprint` is the sha256 of the rendered `Resources` section,
/// so two syntheses of the same definition are byte-identical.
pub fn synthesize(stack: &StackDefinition) -> Value {
    let resources: Map<String, Value> = stack
        .descriptors
        .iter()
        .map(|descriptor| (descriptor.logical_id.clone(), descriptor.to_template_value()))
        .collect();
    let resources = Value::Object(resources);

    let outputs: Map<String, Value> = stack
        .outputs
        .iter()
        .map(|output| {
            (
                output.logical_id.clone(),
                json!({
                    "Description": output.description,
                    "Value": output.value.to_template_value(),
                }),
            )
        })
        .collect();

    json!({
        "AWSTemplateFormatVersion": TEMPLATE_FORMAT_VERSION,
        "Description": stack.description,
        "Metadata": { "Fingerprint": fingerprint(&resources) },
        "Resources": resources,
        "Outputs": outputs,
    })
}

pub fn render_pretty(template: &Value) -> Result<String> {
    Ok(serde_json::to_string_pretty(template)?)
}

fn fingerprint(resources: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(resources.to_string());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StackConfig;
    use crate::workflow::WorkflowTemplate;

    fn stack(fingerprint: &str) -> StackDefinition {
        StackDefinition::define(
            &StackConfig::default(),
            &WorkflowTemplate::bundled().expect("bundled template"),
            fingerprint,
        )
        .expect("stack should define")
    }

    #[test]
    fn renders_every_descriptor_and_output() {
        let definition = stack("a");
        let template = synthesize(&definition);

        assert_eq!(template["AWSTemplateFormatVersion"], "2010-09-09");
        let resources = template["Resources"].as_object().expect("resources object");
        assert_eq!(resources.len(), definition.descriptors.len());
        assert!(template["Outputs"]["ApiEndpoint"]["Value"]["Fn::Join"].is_array());
        assert_eq!(
            template["Outputs"]["BucketUrl"]["Value"],
            json!({"Fn::GetAtt": ["WebsiteBucket", "WebsiteURL"]})
        );
    }

    #[test]
    fn fingerprint_is_stable_and_content_sensitive() {
        let first = synthesize(&stack("a"));
        let again = synthesize(&stack("a"));
        let changed = synthesize(&stack("b"));

        assert_eq!(
            render_pretty(&first).expect("renders"),
            render_pretty(&again).expect("renders")
        );
        assert_ne!(
            first["Metadata"]["Fingerprint"],
            changed["Metadata"]["Fingerprint"]
        );
    }
}
