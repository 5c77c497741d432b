//! Property values whose concrete contents may only be known at deploy time.
//!
//! A function ARN, a REST API id or a bucket website URL does not exist until
//! the provisioning toolkit has created the owning resource. Such values are
//! modelled as [`Expr::Ref`] / [`Expr::GetAtt`] and rendered as intrinsic
//! functions; the toolkit resolves them during its own topological pass.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Serialize, Serializer};
use serde_json::{json, Value};

/// Pseudo parameters supplied by the toolkit for every stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pseudo {
    AccountId,
    Region,
    Partition,
}

impl Pseudo {
    fn as_str(self) -> &'static str {
        match self {
            Self::AccountId => "AWS::AccountId",
            Self::Region => "AWS::Region",
            Self::Partition => "AWS::Partition",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Str(String),
    Bool(bool),
    Int(i64),
    List(Vec<Expr>),
    Object(BTreeMap<String, Expr>),
    /// Carried verbatim, never inspected for references.
    Json(Value),
    Ref(String),
    GetAtt(String, String),
    Join(Vec<Expr>),
    Pseudo(Pseudo),
}

impl Expr {
    pub fn str(value: impl Into<String>) -> Self {
        Self::Str(value.into())
    }

    pub fn reference(logical_id: impl Into<String>) -> Self {
        Self::Ref(logical_id.into())
    }

    pub fn get_att(logical_id: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::GetAtt(logical_id.into(), attribute.into())
    }

    /// Function ARN of a declared function resource.
    pub fn arn_of(logical_id: impl Into<String>) -> Self {
        Self::get_att(logical_id, "Arn")
    }

    pub fn join(parts: impl IntoIterator<Item = Expr>) -> Self {
        Self::Join(parts.into_iter().collect())
    }

    pub fn list(items: impl IntoIterator<Item = Expr>) -> Self {
        Self::List(items.into_iter().collect())
    }

    pub fn object<K: Into<String>>(entries: impl IntoIterator<Item = (K, Expr)>) -> Self {
        Self::Object(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value))
                .collect(),
        )
    }

    pub fn strings<S: Into<String>>(items: impl IntoIterator<Item = S>) -> Self {
        Self::List(items.into_iter().map(|item| Self::Str(item.into())).collect())
    }

    /// Logical ids this value depends on. Pseudo parameters are not resources.
    pub fn references(&self) -> BTreeSet<String> {
        let mut found = BTreeSet::new();
        self.collect_references(&mut found);
        found
    }

    fn collect_references(&self, found: &mut BTreeSet<String>) {
        match self {
            Self::Ref(id) | Self::GetAtt(id, _) => {
                found.insert(id.clone());
            }
            Self::List(items) | Self::Join(items) => {
                for item in items {
                    item.collect_references(found);
                }
            }
            Self::Object(entries) => {
                for value in entries.values() {
                    value.collect_references(found);
                }
            }
            Self::Str(_) | Self::Bool(_) | Self::Int(_) | Self::Json(_) | Self::Pseudo(_) => {}
        }
    }

    /// Returns the literal string when no deferred part is involved.
    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn to_template_value(&self) -> Value {
        match self {
            Self::Str(value) => Value::String(value.clone()),
            Self::Bool(value) => Value::Bool(*value),
            Self::Int(value) => Value::from(*value),
            Self::List(items) => Value::Array(items.iter().map(Self::to_template_value).collect()),
            Self::Object(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_template_value()))
                    .collect(),
            ),
            Self::Json(value) => value.clone(),
            Self::Ref(id) => json!({ "Ref": id }),
            Self::GetAtt(id, attribute) => json!({ "Fn::GetAtt": [id, attribute] }),
            Self::Join(parts) => {
                let parts: Vec<Value> = parts.iter().map(Self::to_template_value).collect();
                json!({ "Fn::Join": ["", parts] })
            }
            Self::Pseudo(pseudo) => json!({ "Ref": pseudo.as_str() }),
        }
    }
}

impl From<&str> for Expr {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Expr {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<bool> for Expr {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl Serialize for Expr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_template_value().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_nested_references_but_not_pseudo_parameters() {
        let expr = Expr::object([
            ("Arn", Expr::arn_of("SmsReminder")),
            (
                "Url",
                Expr::join([
                    Expr::str("https://"),
                    Expr::reference("RestApi"),
                    Expr::Pseudo(Pseudo::Region),
                ]),
            ),
            ("Passthrough", Expr::Json(json!({"Ref": "NotAnEdge"}))),
        ]);

        let references: Vec<String> = expr.references().into_iter().collect();
        assert_eq!(references, vec!["RestApi".to_string(), "SmsReminder".to_string()]);
    }

    #[test]
    fn renders_intrinsic_functions() {
        let expr = Expr::join([
            Expr::str("arn:"),
            Expr::Pseudo(Pseudo::Partition),
            Expr::get_att("WebsiteBucket", "Arn"),
        ]);

        assert_eq!(
            expr.to_template_value(),
            json!({"Fn::Join": ["", [
                "arn:",
                {"Ref": "AWS::Partition"},
                {"Fn::GetAtt": ["WebsiteBucket", "Arn"]}
            ]]})
        );
    }

    #[test]
    fn literal_is_only_available_for_plain_strings() {
        assert_eq!(Expr::str("prod").as_literal(), Some("prod"));
        assert_eq!(Expr::reference("RestApi").as_literal(), None);
    }
}
