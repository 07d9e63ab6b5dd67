// Shared domain types
pub mod common;

// Persistence behind repository traits
pub mod db;

pub mod server;
