//! Prompt construction seam. One builder per layer, supplied by the host.

use ads_core::{AgentSnapshot, ReasoningLayer};
use std::sync::Arc;

pub trait PromptBuilder: Send + Sync {
    fn build_prompt(&self, snapshot: &AgentSnapshot) -> String;
}

impl<F> PromptBuilder for F
where
    F: Fn(&AgentSnapshot) -> String + Send + Sync,
{
    fn build_prompt(&self, snapshot: &AgentSnapshot) -> String {
        self(snapshot)
    }
}

#[derive(Clone)]
pub struct PromptBuilders {
    pub autonomic: Arc<dyn PromptBuilder>,
    pub talker: Arc<dyn PromptBuilder>,
    pub executor: Arc<dyn PromptBuilder>,
}

impl PromptBuilders {
    pub fn for_layer(&self, layer: ReasoningLayer) -> &dyn PromptBuilder {
        match layer {
            ReasoningLayer::Autonomic => self.autonomic.as_ref(),
            ReasoningLayer::Talker => self.talker.as_ref(),
            ReasoningLayer::Executor => self.executor.as_ref(),
        }
    }
}

impl std::fmt::Debug for PromptBuilders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptBuilders").finish_non_exhaustive()
    }
}
