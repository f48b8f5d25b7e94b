//! Rule-based choice of the reasoning layer for one agent tick.
//!
//! Rules are evaluated in order and the first match wins:
//!
//! | # | Condition                                   | Layer     | Urgency |
//! |---|---------------------------------------------|-----------|---------|
//! | 1 | hunger, energy or temperature below 0.2     | autonomic | 10      |
//! | 2 | in a conversation, or heard speech          | talker    | 8       |
//! | 3 | other agents nearby                         | talker    | 6       |
//! | 4 | goal tracking present but no active goals   | talker    | 5       |
//! | 5 | last behavior just completed                | executor  | 7       |
//! | 6 | idle, wandering, or no current behavior     | executor  | 5       |
//! | 7 | hunger and energy both above 0.7            | executor  | 4       |
//! | 8 | otherwise                                   | autonomic | 3       |

use ads_core::{AgentSnapshot, AppError, NeedsSnapshot, ReasoningLayer};
use serde::Serialize;

const CRITICAL_NEED: f64 = 0.2;
const COMFORTABLE_NEED: f64 = 0.7;
/// Value assumed for a need the snapshot does not report.
const SATISFIED: f64 = 1.0;

const IDLE_BEHAVIORS: &[&str] = &["idle", "wander", "wandering"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerSelection {
    pub layer: ReasoningLayer,
    /// Human-readable rule that fired.
    pub reason: String,
    /// 1..=10, higher is more urgent.
    pub urgency: u8,
}

impl LayerSelection {
    fn new(layer: ReasoningLayer, urgency: u8, reason: impl Into<String>) -> Self {
        Self {
            layer,
            reason: reason.into(),
            urgency,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Needs {
    hunger: f64,
    energy: f64,
    temperature: f64,
}

impl Needs {
    fn from_snapshot(agent_id: &str, needs: Option<&NeedsSnapshot>) -> Result<Self, AppError> {
        let read = |field: &'static str, value: Option<f64>| -> Result<f64, AppError> {
            match value {
                None => Ok(SATISFIED),
                Some(v) if v.is_finite() => Ok(v),
                Some(v) => Err(AppError::InvalidSnapshot {
                    agent_id: agent_id.to_string(),
                    field,
                    value: v,
                }),
            }
        };
        Ok(Self {
            hunger: read("hunger", needs.and_then(|n| n.hunger))?,
            energy: read("energy", needs.and_then(|n| n.energy))?,
            temperature: read("temperature", needs.and_then(|n| n.temperature))?,
        })
    }

    fn most_critical(&self) -> Option<(&'static str, f64)> {
        [
            ("hunger", self.hunger),
            ("energy", self.energy),
            ("temperature", self.temperature),
        ]
        .into_iter()
        .filter(|(_, v)| *v < CRITICAL_NEED)
        .min_by(|a, b| a.1.total_cmp(&b.1))
    }
}

/// Pick the layer for this tick. Pure: the same snapshot always yields the
/// same selection.
///
/// Fails only when a reported need is NaN or infinite.
pub fn select_layer(snapshot: &AgentSnapshot) -> Result<LayerSelection, AppError> {
    use ReasoningLayer::{Autonomic, Executor, Talker};

    let needs = Needs::from_snapshot(&snapshot.agent_id, snapshot.needs.as_ref())?;

    if let Some((need, value)) = needs.most_critical() {
        return Ok(LayerSelection::new(
            Autonomic,
            10,
            format!("critical need: {need} at {value:.2}"),
        ));
    }

    if snapshot.in_conversation() {
        return Ok(LayerSelection::new(Talker, 8, "in active conversation"));
    }
    if let Some(speech) = snapshot.heard_speech.first() {
        return Ok(LayerSelection::new(
            Talker,
            8,
            format!("heard speech from {}", speech.speaker_id),
        ));
    }

    if !snapshot.nearby_agents.is_empty() {
        return Ok(LayerSelection::new(
            Talker,
            6,
            format!("{} agent(s) nearby", snapshot.nearby_agents.len()),
        ));
    }

    if snapshot.active_goals.as_ref().is_some_and(Vec::is_empty) {
        return Ok(LayerSelection::new(Talker, 5, "no active goals"));
    }

    if snapshot.last_behavior_completed {
        return Ok(LayerSelection::new(Executor, 7, "previous behavior completed"));
    }

    if is_idle(snapshot.current_behavior.as_deref()) {
        return Ok(LayerSelection::new(Executor, 5, "idle, needs a new behavior"));
    }

    if needs.hunger > COMFORTABLE_NEED && needs.energy > COMFORTABLE_NEED {
        return Ok(LayerSelection::new(
            Executor,
            4,
            "needs comfortable, free to plan",
        ));
    }

    Ok(LayerSelection::new(Autonomic, 3, "routine needs check"))
}

fn is_idle(behavior: Option<&str>) -> bool {
    match behavior.map(str::trim) {
        None | Some("") => true,
        Some(b) => IDLE_BEHAVIORS.iter().any(|idle| b.eq_ignore_ascii_case(idle)),
    }
}
