//! # ScholarSynth - Multi-Stage Research Report Server
//!
//! Turns a natural-language research query into a long-form, cited report.
//! A query is decomposed into sub-questions, each sub-question is researched
//! concurrently, and the completed findings are synthesized into a markdown
//! report with deduplicated citations.
//!
//! ## Overview
//!
//! ScholarSynth can be used in two ways:
//!
//! 1. **As a standalone server** - Run the `scholarsynth-server` binary
//! 2. **As a library** - Drive [`ResearchCoordinator`] with your own [`ResearchStages`]
//!
//! ### Basic Example
//!
//! ```rust,ignore
//! use scholarsynth::{AppState, SynthConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SynthConfig::load_or_default(None)?;
//!     let state = AppState::from_config(config)?;
//!
//!     let id = state.coordinator.create("How does CRISPR gene editing work?")?;
//!     println!("{:?}", state.coordinator.status(&id)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`research`] - Task store, coordinator, progress projection and notifications
//! - [`llm`] - LLM provider clients used by the default stage implementation
//! - [`api`] - Axum HTTP surface, including an SSE progress stream
//! - [`utils::toml_config`] - `scholarsynth.toml` configuration

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

/// HTTP API handlers and routes.
pub mod api;
/// Command line parsing and terminal output.
pub mod cli;
/// LLM provider clients and abstractions.
pub mod llm;
/// Multi-stage research orchestration.
pub mod research;
/// Core types (requests, responses, errors).
pub mod types;
/// Configuration utilities (TOML).
pub mod utils;

// Re-export commonly used types
pub use llm::{LLMClient, Provider};
pub use research::{LlmStages, ResearchCoordinator, ResearchStages, TaskStore};
pub use types::{AppError, Result};
pub use utils::toml_config::SynthConfig;

use llm::GenerationParams;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Effective configuration
    pub config: Arc<SynthConfig>,
    /// Owns every research task and drives its workflow
    pub coordinator: ResearchCoordinator,
}

impl AppState {
    /// Build state around an explicit stage implementation
    pub fn new(config: SynthConfig, stages: Arc<dyn ResearchStages>) -> Self {
        let store = Arc::new(TaskStore::new(config.research.notification_buffer));
        let coordinator = ResearchCoordinator::new(store, stages, &config.research);
        Self {
            config: Arc::new(config),
            coordinator,
        }
    }

    /// Build state with LLM-backed stages for the configured provider
    pub fn from_config(config: SynthConfig) -> Result<Self> {
        let provider = Provider::from_config(&config.llm)?;
        tracing::info!(
            provider = provider.name(),
            model = provider.model(),
            "Using LLM provider"
        );
        let client = provider.create_client(GenerationParams::from(&config.llm))?;
        let stages = Arc::new(LlmStages::new(client, &config.research));
        Ok(Self::new(config, stages))
    }
}
