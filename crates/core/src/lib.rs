//! # localseek core
//!
//! Domain types, traits, and error definitions for the localseek
//! search-and-synthesize pipeline. Every other crate depends inward on this
//! one.
//!
//! The two external seams are traits defined here:
//! - [`SourceFetcher`] — turns a query or a video URL into [`SourceText`]s
//! - [`Provider`] — turns a prompt into a [`ResponseStream`]
//!
//! Implementations live in `localseek-sources` and `localseek-providers`,
//! so the session can be tested against scripted stand-ins.

pub mod error;
pub mod provider;
pub mod source;
pub mod stream;
pub mod turn;

// Re-export key types at crate root for ergonomics
pub use error::{Error, FetchError, ProviderError, Result};
pub use provider::{GenerateRequest, Provider, StreamChunk, Usage};
pub use source::{FetchTarget, SourceFetcher, SourceText};
pub use stream::{FrameStream, ResponseStream};
pub use turn::Turn;
