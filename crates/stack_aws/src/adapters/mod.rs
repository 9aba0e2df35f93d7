pub mod functions;
pub mod identity;
pub mod object_store;
pub mod queue;
pub mod rest_api;
pub mod roles;
