//! External genre/year sources.
//!
//! Both the Spotify client and the web-search fallback implement
//! [`GenreSource`], and [`LookupChain`] composes them behind the same trait,
//! so the file processor never knows which source answered (and tests can
//! substitute canned sources for the lot).

pub mod spotify;
pub mod websearch;

use async_trait::async_trait;

/// What a lookup produced for one track. `genres` are raw strings as the
/// source reported them, in source order, not deduplicated; `year` is
/// already validated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupResult {
    pub genres: Vec<String>,
    pub year: Option<String>,
}

impl LookupResult {
    /// A result that still misses something a lookup could provide.
    pub fn is_incomplete(&self) -> bool {
        self.genres.is_empty() || self.year.is_none()
    }
}

/// A source of genre/year candidates for a (title, artist) pair.
///
/// Lookups are infallible by contract: transport, auth, and decode failures
/// are logged inside the implementation and surface as an empty result,
/// never as an error the caller must handle.
#[async_trait]
pub trait GenreSource: Send + Sync {
    async fn lookup(&self, title: &str, artist: &str) -> LookupResult;
}

/// Primary source plus optional fallback, merged per the pipeline policy:
/// the fallback is only consulted when the primary result is incomplete, its
/// genres are appended to whatever the primary found, and its year is used
/// only when the primary found none.
pub struct LookupChain {
    primary: Box<dyn GenreSource>,
    fallback: Option<Box<dyn GenreSource>>,
}

impl LookupChain {
    pub fn new(primary: Box<dyn GenreSource>, fallback: Option<Box<dyn GenreSource>>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl GenreSource for LookupChain {
    async fn lookup(&self, title: &str, artist: &str) -> LookupResult {
        let mut result = self.primary.lookup(title, artist).await;

        if result.is_incomplete() {
            if let Some(fallback) = &self.fallback {
                let mined = fallback.lookup(title, artist).await;
                // TODO: weight fallback genres below primary matches instead
                // of concatenating them as equals.
                result.genres.extend(mined.genres);
                if result.year.is_none() {
                    result.year = mined.year;
                }
            }
        }

        result
    }
}
