// Leveling: the per-user experience ledger and the rules that mutate it.

pub mod duration_parser;
pub mod experience_curve;
pub mod leveling_models;
pub mod leveling_service;
pub mod leveling_store;

pub use duration_parser::parse_duration;
pub use experience_curve::{ExperienceCurve, LinearCurve};
pub use leveling_models::{
    GuildMember, GuildStanding, LedgerField, LedgerUpdate, LevelUpEvent, LevelUpReason,
    LevelingConfig, LevelingError, ResetSummary, UserRecord,
};
pub use leveling_service::{LevelProgress, LevelUpHandler, LevelingService, ResetProgress};
pub use leveling_store::LedgerStore;
