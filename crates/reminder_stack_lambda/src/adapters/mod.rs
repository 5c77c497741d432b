pub mod aws;
pub mod invoke;
pub mod notify;
pub mod object_store;
pub mod response;
pub mod workflow;
