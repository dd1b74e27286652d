//! Generation proxy for the remote image / chat provider.
//!
//! - [`provider`] -- the [`GenerationProvider`] trait the API server depends on.
//! - [`client`] -- HTTP implementation over an OpenAI-compatible endpoint.
//! - [`extract`] -- ordered strategies that pull images and text out of the
//!   provider's varied response shapes.
//! - [`config`] -- environment-driven configuration.

pub mod client;
pub mod config;
pub mod error;
pub mod extract;
pub mod provider;

pub use client::GenAiClient;
pub use config::{GenAiConfig, ImageMode};
pub use error::GenAiError;
pub use provider::{ChatRole, ChatTurn, GeneratedImage, GenerationProvider};
