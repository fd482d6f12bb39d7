//! genrehaku, a batch genre and year tag normalizer for MP3 libraries.
//!
//! Each file runs the same pipeline: read its tags, normalize the existing
//! genre against a keyword table, and only when the table has no answer ask
//! Spotify, then a web-search fallback. Changed tags are written back and
//! every file ends in exactly one outcome that the run statistics count.
//!
//! The whole thing is a library driven through [`runner::run_batch`]; the
//! bundled CLI is one front-end consuming its event channel.

pub mod config;
pub mod fetchers;
pub mod mapping;
pub mod processor;
pub mod runner;
pub mod tags;
pub mod year;

pub use fetchers::{GenreSource, LookupChain, LookupResult};
pub use mapping::GenreMap;
pub use processor::{FileOutcome, ProcessOptions, SkipReason};
pub use runner::{BatchEvent, BatchOptions, BatchStats, run_batch};
pub use tags::{LoftyStore, TagStore, TagUpdate, TrackTags};
