//! Skillbot Core: shared types, configuration, and utilities.
//!
//! This crate contains:
//! - **types**: chat messages, tool calls/definitions, LLM responses
//! - **config**: `~/.skillbot/config.json` schema, loader, env overrides
//! - **utils**: data paths, string truncation, `~` expansion

pub mod config;
pub mod types;
pub mod utils;

pub use config::Config;
pub use types::{LlmResponse, Message, ToolCall, ToolDefinition};
