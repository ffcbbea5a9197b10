pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod pipeline;
pub mod planner;
