// PromptDeck: Prompt-tool catalog with text generation
// License: Apache-2.0

pub mod config;
pub mod error;
pub mod generation;
pub mod logger;
pub mod metrics;
pub mod model;
pub mod prompt;
pub mod provider;
pub mod service;
pub mod store;
pub mod template;
pub mod web;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
