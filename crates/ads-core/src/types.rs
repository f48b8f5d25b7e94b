use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::AppError;

/// Reasoning mode an agent decision is routed through.
///
/// Closed set: layers are not registered at runtime.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningLayer {
    /// Survival-level reactions (hunger, exhaustion, cold).
    Autonomic,
    /// Social layer: conversation and goal setting.
    Talker,
    /// Task planning and behavior sequencing.
    Executor,
}

impl ReasoningLayer {
    pub const ALL: [ReasoningLayer; 3] = [Self::Autonomic, Self::Talker, Self::Executor];

    /// Returns the configuration-facing name for this layer
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Autonomic => "autonomic",
            Self::Talker => "talker",
            Self::Executor => "executor",
        }
    }

    /// Stable index into per-layer arrays.
    pub fn index(&self) -> usize {
        match self {
            Self::Autonomic => 0,
            Self::Talker => 1,
            Self::Executor => 2,
        }
    }
}

impl std::fmt::Display for ReasoningLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ReasoningLayer {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "autonomic" => Ok(Self::Autonomic),
            "talker" => Ok(Self::Talker),
            "executor" => Ok(Self::Executor),
            other => Err(AppError::UnknownLayer(other.to_string())),
        }
    }
}

/// Intelligence/capability class of a backend model. Spans providers.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Simple,
    #[default]
    Default,
    High,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Self::Simple, Self::Default, Self::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Default => "default",
            Self::High => "high",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Output format for CLI responses
#[derive(Clone, Debug, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
