//! Runtime adapters for the meet relay: environment config, on-disk stores,
//! the Google Meet chat source and the speech and assistant backends.

pub mod config;
pub mod gemini_adapter;
pub mod meet_source;
pub mod openai_adapter;
pub mod speech;
pub mod store;
