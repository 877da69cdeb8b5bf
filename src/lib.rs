pub mod cli;
pub mod error;
pub mod fetch;
pub mod github;
pub mod history;
pub mod models;
pub mod planner;
pub mod server;
pub mod timeline;
pub mod types;
