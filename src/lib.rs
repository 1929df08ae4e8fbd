//! carechat: patient chat relay
//!
//! Forwards a patient's question, with a small remembered context and
//! optionally recent history, to one of several interchangeable LLM providers
//! and relays the answer back.

pub mod chat;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod patient;
pub mod provider;
pub mod server;
pub mod store;
