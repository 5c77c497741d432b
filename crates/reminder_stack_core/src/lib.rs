//! Definition-time primitives for the reminder stack.
//!
//! This crate owns the descriptor graph, deferred references, the workflow
//! template patcher and the request/response contracts shared with the Lambda
//! handlers. It intentionally excludes AWS SDK and Lambda runtime concerns.

pub mod assets;
pub mod config;
pub mod contract;
pub mod endpoint;
pub mod error;
pub mod gateway;
pub mod graph;
pub mod policy;
pub mod reference;
pub mod resource;
pub mod stack;
pub mod template;
pub mod workflow;

pub use error::{DefinitionError, Result};
