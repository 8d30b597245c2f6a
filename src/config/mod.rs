//! Configuration module for signalscope
//!
//! This module handles:
//! - Analysis configuration (signalscope.toml)
//! - Fusion weight validation
//! - Finder engine and history defaults

mod analysis_config;

pub use analysis_config::{
    load_config, load_project_config, AnalysisConfig, CloneConfig, EngineConfig, FusionConfig,
    HistoryConfig, PageRankConfig, RiskWeights, SpectralConfig, TemporalConfig, CONFIG_FILE_NAME,
};
