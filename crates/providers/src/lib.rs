//! Inference provider implementations for localseek.
//!
//! All providers implement the `localseek_core::Provider` trait and hand
//! back a lazy `ResponseStream`. [`build_from_config`] picks the wire
//! protocol named in the configuration.

mod framing;
pub mod ollama;
pub mod openai_compat;
pub mod router;

pub use ollama::OllamaProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use router::build_from_config;
