use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DefinitionError, Result};

pub const DEFAULT_REGION: &str = "us-east-1";

/// Names of the deployed callable units.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FunctionNames {
    pub sms_reminder: String,
    pub email_reminder: String,
    pub api_handler: String,
    pub endpoint_writer: String,
    pub writer_trigger: String,
    pub content_publisher: String,
}

impl Default for FunctionNames {
    fn default() -> Self {
        Self {
            sms_reminder: "smsReminder".to_string(),
            email_reminder: "emailReminder".to_string(),
            api_handler: "apiHandler".to_string(),
            endpoint_writer: "write-to-s3".to_string(),
            writer_trigger: "writeFileInvoker".to_string(),
            content_publisher: "contentPublisher".to_string(),
        }
    }
}

impl FunctionNames {
    fn all(&self) -> [&str; 6] {
        [
            &self.sms_reminder,
            &self.email_reminder,
            &self.api_handler,
            &self.endpoint_writer,
            &self.writer_trigger,
            &self.content_publisher,
        ]
    }
}

/// Stack-wide settings. Every field defaults to the reference deployment, so
/// an empty TOML file is a valid configuration.
///
/// The stage and resource path are not settings: the published endpoint is
/// always `.../prod/reminders` (see [`crate::endpoint`]).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct StackConfig {
    pub stack_name: String,
    pub region: String,
    pub website_bucket_name: String,
    /// Bucket holding Lambda zips and the static site bundle.
    pub asset_bucket: String,
    pub asset_prefix: String,
    /// Local directory whose contents are hashed to detect site changes.
    pub static_site_dir: PathBuf,
    /// Verified SES identity used as the email sender. Unset by default; an
    /// operator must verify one out-of-band.
    pub sender_email: String,
    pub state_machine_name: String,
    pub api_name: String,
    pub functions: FunctionNames,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            stack_name: "ReminderStack".to_string(),
            region: DEFAULT_REGION.to_string(),
            website_bucket_name: "reminder-static-web".to_string(),
            asset_bucket: "reminder-stack-assets".to_string(),
            asset_prefix: "reminder-stack".to_string(),
            static_site_dir: PathBuf::from("static_website"),
            sender_email: String::new(),
            state_machine_name: "reminder-state-machine".to_string(),
            api_name: "reminders-api".to_string(),
            functions: FunctionNames::default(),
        }
    }
}

impl StackConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|error| DefinitionError::Config(error.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| DefinitionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        let required = [
            ("stack_name", &self.stack_name),
            ("region", &self.region),
            ("website_bucket_name", &self.website_bucket_name),
            ("asset_bucket", &self.asset_bucket),
            ("state_machine_name", &self.state_machine_name),
            ("api_name", &self.api_name),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(DefinitionError::Config(format!("{field} cannot be empty")));
            }
        }

        if self.functions.all().iter().any(|name| name.trim().is_empty()) {
            return Err(DefinitionError::Config(
                "function names cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Object key of a packaged Lambda artifact.
    pub fn artifact_key(&self, function_name: &str) -> String {
        let prefix = self.asset_prefix.trim_matches('/');
        if prefix.is_empty() {
            format!("{function_name}.zip")
        } else {
            format!("{prefix}/{function_name}.zip")
        }
    }

    /// Prefix under which the static site bundle is uploaded.
    pub fn site_source_prefix(&self) -> String {
        let prefix = self.asset_prefix.trim_matches('/');
        if prefix.is_empty() {
            "static_website/".to_string()
        } else {
            format!("{prefix}/static_website/")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_reference_defaults() {
        let config = StackConfig::from_toml_str("").expect("defaults should validate");
        assert_eq!(config, StackConfig::default());
        assert_eq!(config.region, "us-east-1");
        assert!(config.sender_email.is_empty());
    }

    #[test]
    fn partial_document_overrides_selected_fields() {
        let config = StackConfig::from_toml_str(
            r#"
            region = "eu-west-1"
            sender_email = "ops@example.com"

            [functions]
            api_handler = "reminderApi"
            "#,
        )
        .expect("config should parse");

        assert_eq!(config.region, "eu-west-1");
        assert_eq!(config.functions.api_handler, "reminderApi");
        assert_eq!(config.functions.sms_reminder, "smsReminder");
    }

    #[test]
    fn stage_and_resource_path_are_not_configurable() {
        for document in [r#"stage_name = "dev""#, r#"resource_path = "tasks""#] {
            let error = StackConfig::from_toml_str(document).expect_err("unknown field");
            assert!(matches!(error, DefinitionError::Config(_)));
        }
    }

    #[test]
    fn artifact_keys_live_under_prefix() {
        let mut config = StackConfig::default();
        assert_eq!(config.artifact_key("apiHandler"), "reminder-stack/apiHandler.zip");

        config.asset_prefix = "/".to_string();
        assert_eq!(config.artifact_key("apiHandler"), "apiHandler.zip");
        assert_eq!(config.site_source_prefix(), "static_website/");
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("stack.toml");
        std::fs::write(&path, "stack_name = \"Reminders\"\n").expect("write config");

        let config = StackConfig::load(&path).expect("config should load");
        assert_eq!(config.stack_name, "Reminders");

        let missing = StackConfig::load(&dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(DefinitionError::Io { .. })));
    }
}
