pub mod api;
pub mod custom_resource;
pub mod notify;
pub mod publisher;
pub mod trigger;
pub mod writer;
