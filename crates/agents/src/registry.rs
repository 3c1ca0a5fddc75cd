//! Role lookup.

use std::sync::Arc;

use optiflow_core::traits::{AgentRole, LlmClient, SandboxExecutor};

use crate::coder::CoderAgent;
use crate::modeler::ModelerAgent;
use crate::visualizer::VisualizerAgent;

/// The closed set of agent roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentKind {
    Modeler,
    Coder,
    Visualizer,
}

impl AgentKind {
    /// Parse a wire role tag. `None` for anything outside the closed set.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "MODELER_AGENT" => Some(Self::Modeler),
            "CODER_AGENT" => Some(Self::Coder),
            "VISUALIZER_AGENT" => Some(Self::Visualizer),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Modeler => "MODELER_AGENT",
            Self::Coder => "CODER_AGENT",
            Self::Visualizer => "VISUALIZER_AGENT",
        }
    }
}

/// Maps a role tag to a freshly constructed agent. Unknown tags return
/// `None` and the dispatcher rejects the message.
pub struct AgentRegistry {
    llm: Arc<dyn LlmClient>,
    sandbox: Arc<dyn SandboxExecutor>,
}

impl AgentRegistry {
    pub fn new(llm: Arc<dyn LlmClient>, sandbox: Arc<dyn SandboxExecutor>) -> Self {
        Self { llm, sandbox }
    }

    pub fn lookup(&self, tag: &str) -> Option<Box<dyn AgentRole>> {
        match AgentKind::parse(tag)? {
            AgentKind::Modeler => Some(Box::new(ModelerAgent::new(self.llm.clone()))),
            AgentKind::Coder => Some(Box::new(CoderAgent::new(self.llm.clone()))),
            AgentKind::Visualizer => Some(Box::new(VisualizerAgent::new(
                self.llm.clone(),
                self.sandbox.clone(),
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use optiflow_core::mocks::{MockLlm, MockSandboxExecutor};

    #[test]
    fn parse_covers_the_closed_set() {
        assert_eq!(AgentKind::parse("MODELER_AGENT"), Some(AgentKind::Modeler));
        assert_eq!(AgentKind::parse("CODER_AGENT"), Some(AgentKind::Coder));
        assert_eq!(
            AgentKind::parse("VISUALIZER_AGENT"),
            Some(AgentKind::Visualizer)
        );
        assert_eq!(AgentKind::parse("REVIEWER_AGENT"), None);
        assert_eq!(AgentKind::parse(""), None);
    }

    #[test]
    fn round_trip_tags() {
        for kind in [AgentKind::Modeler, AgentKind::Coder, AgentKind::Visualizer] {
            assert_eq!(AgentKind::parse(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn lookup_rejects_unknown_roles() {
        let registry = AgentRegistry::new(
            Arc::new(MockLlm::constant("x")),
            Arc::new(MockSandboxExecutor::default()),
        );
        assert!(registry.lookup("MODELER_AGENT").is_some());
        assert!(registry.lookup("REVIEWER_AGENT").is_none());
    }
}
