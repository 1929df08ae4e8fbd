//! Integration tests for the carechat relay

mod chat_dispatch;
mod context_store;
mod http_api;
