//! Source adapters. Each turns one upstream format into a partial database.
//!
//! Parsers are pure and always compiled; fetching lives behind the `http`
//! feature.

mod error;
mod html;

pub mod nzta;
pub mod tfnsw;
pub mod wikidata;
pub mod wikimedia;

#[cfg(feature = "http")]
mod client;
#[cfg(any(feature = "http", test))]
mod pages;

pub use error::SourceError;

#[cfg(feature = "http")]
pub use client::HttpClient;
