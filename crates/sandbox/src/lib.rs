#![deny(unused)]
//! Container sandbox for Optiflow.
//!
//! This crate provides the isolated execution environment code jobs run in
//! and the worker that feeds it from the broker. Containers are short-lived:
//! one per job, network disabled, memory and PID capped, force-removed on
//! every exit path. PNG artifacts written to `/output` are captured in-band
//! as a tar stream from the Docker API, with the bind-mounted host directory
//! as a fallback.

pub mod engine;
pub mod worker;

pub use engine::{CodeSandbox, ExecutionOutcome, SandboxConfig};
pub use worker::SandboxWorker;
