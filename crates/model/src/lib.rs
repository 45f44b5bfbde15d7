//! A provider-neutral protocol between the expert agents and hosted LLMs.
//!
//! The agent loop only speaks the types defined here. A provider crate
//! (Gemini, or the scripted test model) translates them to and from its
//! own wire format, so an expert never needs to know which model it is
//! talking to.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.

#![deny(missing_docs)]

mod error;
mod provider;
mod request;
mod response;

pub use error::*;
pub use provider::*;
pub use request::*;
pub use response::*;
