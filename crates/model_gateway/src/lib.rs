#![deny(unused)]
//! LLM provider adapter for Optiflow.
//!
//! Wraps Rig's provider clients behind the `LlmClient` trait so the agent
//! roles stay provider-agnostic. Gemini is the primary engine; OpenAI and
//! Anthropic are drop-in alternatives.

pub mod rig_client;

pub use rig_client::{create_default_client, RigConfig, RigLlmClient, RigProvider};
