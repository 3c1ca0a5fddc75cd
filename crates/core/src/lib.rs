#![deny(unused)]
//! Core types, traits, and error definitions for Optiflow.
//!
//! This crate provides the foundational building blocks shared by both
//! workers: the wire messages exchanged over the broker, the configuration
//! loaded from the environment, the traits behind which the LLM and the
//! sandbox sit, and scripted mocks for testing.

pub mod codec;
pub mod config;
pub mod error;
pub mod messages;
pub mod mocks;
pub mod telemetry;
pub mod traits;

pub use error::{Error, Result};
pub use messages::*;
pub use traits::*;
