//! Game-session bookkeeping and fair-share admission policies.

pub mod cooldown;
pub mod manager;
pub mod state;

pub use cooldown::{CooldownPolicy, CooldownStatus, FairShareCooldown, NoCooldown, policy_for};
pub use manager::{InMemorySessionManager, SessionManager};
pub use state::{Session, SessionStats};
