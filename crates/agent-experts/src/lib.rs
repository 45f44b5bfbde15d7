//! Expert agents for city information, cryptocurrencies and law, served
//! over HTTP.
//!
//! Each domain has a set of tools, usable directly through the
//! [`services`] or by an [`Agent`](agent_experts_core::Agent) that answers
//! natural-language questions with them. The [`server`] exposes both.

#![deny(missing_docs)]

#[allow(unused_imports)]
#[macro_use]
extern crate tracing;

pub mod agent_manager;
pub mod config;
pub mod experts;
pub mod outcome;
pub mod server;
pub mod services;
pub mod tools;

pub use agent_manager::{AgentManager, AgentResponse};
pub use config::{ConfigError, Settings};
pub use tools::ToolContext;

/// Re-exports of [`agent_experts_core`] crate.
pub mod core {
    pub use agent_experts_core::*;
}
