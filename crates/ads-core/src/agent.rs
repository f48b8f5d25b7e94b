//! Read-only view of the agent state the scheduler reasons about.
//!
//! Every field except `agent_id` may be absent; consumers treat absence as the
//! neutral value rather than an error.

use serde::{Deserialize, Serialize};

/// Snapshot of one agent taken at the start of a tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub agent_id: String,
    #[serde(default)]
    pub needs: Option<NeedsSnapshot>,
    #[serde(default)]
    pub conversation: Option<ConversationSnapshot>,
    /// Speech perceived since the previous tick.
    #[serde(default)]
    pub heard_speech: Vec<HeardSpeech>,
    /// Other agents currently within perception range.
    #[serde(default)]
    pub nearby_agents: Vec<String>,
    /// `None` when the agent has no goal tracking at all.
    #[serde(default)]
    pub active_goals: Option<Vec<String>>,
    #[serde(default)]
    pub current_behavior: Option<String>,
    /// Whether the most recent behavior reported completion.
    #[serde(default)]
    pub last_behavior_completed: bool,
}

impl AgentSnapshot {
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            ..Default::default()
        }
    }

    /// True while the agent is in a one-on-one or multi-party conversation.
    pub fn in_conversation(&self) -> bool {
        self.conversation
            .as_ref()
            .is_some_and(ConversationSnapshot::is_engaged)
    }
}

/// Physical needs in `0.0..=1.0`, where 1.0 is fully satisfied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NeedsSnapshot {
    #[serde(default)]
    pub hunger: Option<f64>,
    #[serde(default)]
    pub energy: Option<f64>,
    #[serde(default)]
    pub temperature: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationSnapshot {
    #[serde(default)]
    pub is_active: bool,
    /// One-on-one partner.
    #[serde(default)]
    pub partner_id: Option<String>,
    /// Other participants of a group conversation.
    #[serde(default)]
    pub participant_ids: Vec<String>,
}

impl ConversationSnapshot {
    pub fn is_engaged(&self) -> bool {
        self.is_active && (self.partner_id.is_some() || !self.participant_ids.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeardSpeech {
    pub speaker_id: String,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_conversation_requires_partner() {
        let mut snapshot = AgentSnapshot::new("a1");
        assert!(!snapshot.in_conversation());

        snapshot.conversation = Some(ConversationSnapshot {
            is_active: true,
            ..Default::default()
        });
        assert!(!snapshot.in_conversation(), "active without partner");

        snapshot.conversation = Some(ConversationSnapshot {
            is_active: true,
            partner_id: Some("a2".into()),
            participant_ids: vec![],
        });
        assert!(snapshot.in_conversation());
    }

    #[test]
    fn test_group_conversation_is_engaged() {
        let conv = ConversationSnapshot {
            is_active: true,
            partner_id: None,
            participant_ids: vec!["a2".into(), "a3".into()],
        };
        assert!(conv.is_engaged());
        let ended = ConversationSnapshot {
            is_active: false,
            ..conv
        };
        assert!(!ended.is_engaged());
    }

    #[test]
    fn test_deserialize_sparse_snapshot() {
        let snapshot: AgentSnapshot = serde_json::from_str(r#"{"agent_id":"a9"}"#).unwrap();
        assert_eq!(snapshot, AgentSnapshot::new("a9"));
    }
}
