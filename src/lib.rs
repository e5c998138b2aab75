pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod input;
pub mod scope;
pub mod token;

pub use client::ApiClient;
pub use config::{Config, ScopeFilterSettings};
pub use input::{filter_batch, BatchResult};
pub use scope::{decide, matches, Decision, DecisionReason, PatternSet, ScopeContext};
