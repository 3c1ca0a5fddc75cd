#![deny(unused)]
//! Broker plumbing for Optiflow.
//!
//! This crate owns every AMQP interaction: the connect-with-backoff gateway
//! both workers use, persistent publishing, and the RPC client the
//! visualizer uses to call the sandbox tier through a private reply queue.

pub mod gateway;
pub mod rpc;

pub use gateway::Broker;
pub use rpc::SandboxRpcClient;
