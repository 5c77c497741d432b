//! AWS-oriented adapters and handlers for the reminder stack's callable units.
//!
//! Handlers are synchronous and talk to AWS only through the adapter traits,
//! so they can be exercised with in-memory fakes. The `bin/` entry points wire
//! the SDK-backed adapters to the Lambda runtime.

pub mod adapters;
pub mod error;
pub mod handlers;
pub mod observability;

pub use error::HandlerError;
