pub mod auth;
pub mod client;
pub mod fetchers;
pub mod model;
