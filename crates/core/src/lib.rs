//! Core logic of an expert agent: the tool abstraction, the tool executor,
//! a retrying model client and the tool-calling loop that ties them
//! together.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

pub mod agent;
pub mod conversation;
mod model_client;
pub mod tool;

pub use agent::{Agent, AgentBuilder, AgentOutput, ToolInvocation};
pub use model_client::RetryPolicy;
