//! Workflow template loading and function-ARN patching.
//!
//! The template is a static Amazon States Language document. Exactly four
//! `Resource` leaves are rewritten with notification function ARNs; every
//! other field passes through untouched.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde_json::Value;

use crate::error::{DefinitionError, Result};
use crate::reference::Expr;

pub const DEFAULT_TEMPLATE: &str = include_str!("../assets/step-function-template.json");

/// Delivery channel served by a notification function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Sms,
    Email,
}

impl Channel {
    /// Channel implied by a state name such as `TextReminderPar`.
    pub fn from_state_name(name: &str) -> Option<Self> {
        if name.starts_with("Text") || name.starts_with("Sms") {
            Some(Self::Sms)
        } else if name.starts_with("Email") {
            Some(Self::Email)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSegment {
    Key(&'static str),
    Index(usize),
}

/// One rewritten leaf: where it lives and which function it must target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldAssignment {
    pub path: &'static [PathSegment],
    pub channel: Channel,
}

impl FieldAssignment {
    /// Name of the state that owns the patched field.
    pub fn state_name(&self) -> Option<&'static str> {
        self.path.iter().rev().skip(1).find_map(|segment| match segment {
            PathSegment::Key(key) => Some(*key),
            PathSegment::Index(_) => None,
        })
    }
}

impl fmt::Display for FieldAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, segment) in self.path.iter().enumerate() {
            match segment {
                PathSegment::Key(key) if position == 0 => write!(f, "{key}")?,
                PathSegment::Key(key) => write!(f, ".{key}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

use PathSegment::{Index, Key};

/// The four fields patched at definition time.
///
/// The parallel branches target the function their state name advertises:
/// `EmailReminderPar` sends email, `TextReminderPar` sends SMS.
pub const PATCHED_FIELDS: [FieldAssignment; 4] = [
    FieldAssignment {
        path: &[Key("States"), Key("TextReminder"), Key("Resource")],
        channel: Channel::Sms,
    },
    FieldAssignment {
        path: &[Key("States"), Key("EmailReminder"), Key("Resource")],
        channel: Channel::Email,
    },
    FieldAssignment {
        path: &[
            Key("States"),
            Key("BothReminders"),
            Key("Branches"),
            Index(0),
            Key("States"),
            Key("EmailReminderPar"),
            Key("Resource"),
        ],
        channel: Channel::Email,
    },
    FieldAssignment {
        path: &[
            Key("States"),
            Key("BothReminders"),
            Key("Branches"),
            Index(1),
            Key("States"),
            Key("TextReminderPar"),
            Key("Resource"),
        ],
        channel: Channel::Sms,
    },
];

/// Concrete (still deferred) identifiers of the notification functions.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationTargets {
    pub sms: Expr,
    pub email: Expr,
}

impl NotificationTargets {
    fn for_channel(&self, channel: Channel) -> &Expr {
        match channel {
            Channel::Sms => &self.sms,
            Channel::Email => &self.email,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowTemplate {
    document: Value,
}

impl WorkflowTemplate {
    pub fn bundled() -> Result<Self> {
        Self::from_json_str(DEFAULT_TEMPLATE)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(Self {
            document: serde_json::from_str(text)?,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| DefinitionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    pub fn patch(&self, targets: &NotificationTargets) -> Result<Expr> {
        self.patch_fields(&PATCHED_FIELDS, targets)
    }

    /// Rewrites each assigned leaf. A missing segment aborts the whole patch.
    pub fn patch_fields(
        &self,
        assignments: &[FieldAssignment],
        targets: &NotificationTargets,
    ) -> Result<Expr> {
        let mut tree = to_expr(&self.document);
        for assignment in assignments {
            let leaf = locate_mut(&mut tree, assignment.path).ok_or_else(|| {
                DefinitionError::MissingTemplateField {
                    path: assignment.to_string(),
                }
            })?;
            *leaf = targets.for_channel(assignment.channel).clone();
        }
        Ok(tree)
    }
}

/// Reports assignments whose state name advertises a different channel than
/// the function it is wired to.
pub fn audit_branch_targets(assignments: &[FieldAssignment]) -> Vec<String> {
    assignments
        .iter()
        .filter_map(|assignment| {
            let state = assignment.state_name()?;
            let implied = Channel::from_state_name(state)?;
            (implied != assignment.channel).then(|| {
                format!(
                    "{assignment}: state `{state}` implies {implied:?} but targets {:?}",
                    assignment.channel
                )
            })
        })
        .collect()
}

/// Objects and arrays become navigable nodes, scalars stay verbatim.
fn to_expr(value: &Value) -> Expr {
    match value {
        Value::Object(entries) => Expr::Object(
            entries
                .iter()
                .map(|(key, value)| (key.clone(), to_expr(value)))
                .collect::<BTreeMap<_, _>>(),
        ),
        Value::Array(items) => Expr::List(items.iter().map(to_expr).collect()),
        scalar => Expr::Json(scalar.clone()),
    }
}

fn locate_mut<'a>(tree: &'a mut Expr, path: &[PathSegment]) -> Option<&'a mut Expr> {
    let mut node = tree;
    for segment in path {
        node = match (segment, node) {
            (Key(key), Expr::Object(entries)) => entries.get_mut(*key)?,
            (Index(index), Expr::List(items)) => items.get_mut(*index)?,
            _ => return None,
        };
    }
    Some(node)
}
