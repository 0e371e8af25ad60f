//! Shared types, error model, and configuration for LeadScout.
//!
//! This crate is the foundation depended on by all other LeadScout crates.
//! It provides:
//! - [`LeadScoutError`] — the unified error type
//! - Domain types ([`AchievementCandidate`], [`ExtractedItem`], [`CandidateInput`])
//! - The industry / video-type taxonomies embedded in the extraction contract
//! - Configuration ([`AppConfig`], config loading, credential checks)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CompletionConfig, DefaultsConfig, SearchConfig, SweepDefaults, config_dir,
    config_file_path, init_config, load_config, load_config_from, resolve_db_path,
    validate_sweep_secret,
};
pub use error::{LeadScoutError, Result};
pub use types::{
    AchievementCandidate, AchievementId, CandidateInput, ExtractedItem, INDUSTRIES,
    UNKNOWN_PREFECTURE, VIDEO_TYPES,
};
