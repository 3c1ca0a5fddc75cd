#![deny(unused)]
//! Agent tier for Optiflow.
//!
//! Three roles turn an operations-research request into its artifacts:
//! the Modeler formulates a mathematical model, the Coder writes solver
//! code, and the Visualizer runs code in the sandbox tier and composes a
//! markdown report around the plots it produces. The worker consumes task
//! messages from the broker and dispatches them through the registry.

pub mod chain;
pub mod coder;
pub mod files;
pub mod modeler;
pub mod prompts;
pub mod registry;
pub mod visualizer;
pub mod worker;

pub use coder::CoderAgent;
pub use modeler::ModelerAgent;
pub use registry::{AgentKind, AgentRegistry};
pub use visualizer::VisualizerAgent;
pub use worker::AgentWorker;
