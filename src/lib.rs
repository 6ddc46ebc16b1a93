pub mod cache;
pub mod config;
pub mod error;
pub mod loader;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod scenario;
pub mod schema;
pub mod service;
pub mod stats;
