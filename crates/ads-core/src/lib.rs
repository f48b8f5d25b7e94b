//! Shared types for the agent decision scheduler: reasoning layers, model
//! tiers, agent snapshots, and the error taxonomy.

pub mod agent;
pub mod error;
pub mod types;

pub use agent::{AgentSnapshot, ConversationSnapshot, HeardSpeech, NeedsSnapshot};
pub use error::AppError;
pub use types::{OutputFormat, ReasoningLayer, Tier};
