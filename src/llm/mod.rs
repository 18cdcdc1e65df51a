//! LLM Provider Clients and Abstractions
//!
//! This module provides a unified interface for the Large Language Model
//! providers behind the research stages. Provider specifics stay behind the
//! [`LLMClient`] trait so the stages work with any supported backend.
//!
//! # Architecture
//!
//! - [`LLMClient`] - The core trait that all providers implement
//! - [`Provider`] - Runtime provider selection, resolved from `[llm]` config
//! - [`openai::OpenAIClient`] - OpenAI-compatible `/chat/completions`
//! - [`ollama::OllamaClient`] - Local Ollama server
//!
//! Transient HTTP failures (network errors, 429, 5xx) are retried inside
//! the client with exponential backoff.
//!
//! # Example
//!
//! ```ignore
//! use scholarsynth::llm::{GenerationParams, Provider};
//!
//! let provider = Provider::from_config(&config.llm)?;
//! let client = provider.create_client(GenerationParams::from(&config.llm))?;
//!
//! let response = client.generate("What is 2+2?").await?;
//! ```

/// Core LLM client trait and provider selection.
pub mod client;
mod http;
/// Ollama `/api/generate` client.
pub mod ollama;
/// OpenAI-compatible chat completions client.
pub mod openai;

pub use client::{GenerationParams, LLMClient, Provider};
