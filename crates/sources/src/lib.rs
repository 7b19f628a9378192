//! Source fetching for localseek.
//!
//! Turns a [`FetchTarget`](localseek_core::FetchTarget) into extracted
//! text: DuckDuckGo results scraped page by page, or a YouTube transcript.
//! HTML parsing lives in pure functions so it can be tested offline;
//! [`WebSourceFetcher`] does the network I/O.

pub mod extract;
pub mod fetcher;
pub mod search;
pub mod youtube;

pub use fetcher::{FetchSettings, WebSourceFetcher};
pub use youtube::{VideoQuery, extract_video_id, split_query};
