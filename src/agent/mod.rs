//! Agent-owned configuration, persistent state, and history schema types.
//!
//! Everything the agent keeps between invocations lives under a single state
//! directory so each event cycle starts from the same snapshot it left behind.
/// Current schema version for `config.json`.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;
/// Current schema version for `state.json`.
pub const STATE_SCHEMA_VERSION: u32 = 1;
/// Current schema version for `history.jsonl`.
pub const HISTORY_SCHEMA_VERSION: u32 = 1;

mod config;
mod history;
mod paths;
mod state;

pub use config::{default_config, load_config_or_default, write_config, AgentConfig};
pub use history::{append_history, load_last_history, now_epoch_ms, HistoryEntry};
pub use paths::StatePaths;
pub use state::{load_state, write_state, AgentState, ConnectionRecord, Flag, Service};
