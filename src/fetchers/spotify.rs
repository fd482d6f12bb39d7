use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::header;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::config::SpotifyCredentials;
use crate::fetchers::{GenreSource, LookupResult};
use crate::year;

const USER_AGENT: &str = "genrehaku/0.1.0";
const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const API_BASE: &str = "https://api.spotify.com/v1";

/// Refresh the cached token this long before Spotify says it expires, so a
/// request started near the deadline never goes out with a dead token.
const TOKEN_SLACK_SECS: u64 = 60;

pub struct SpotifyClient {
    client: reqwest::Client,
    credentials: SpotifyCredentials,
    token: Mutex<Option<CachedToken>>,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

impl SpotifyClient {
    pub fn new(credentials: SpotifyCredentials) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static(USER_AGENT),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            credentials,
            token: Mutex::new(None),
        })
    }

    /// Client-credentials token, fetched on first use and cached until
    /// shortly before expiry.
    async fn access_token(&self) -> Result<String> {
        let mut guard = self.token.lock().await;

        if let Some(cached) = guard.as_ref() {
            if cached.expires_at > Instant::now() {
                return Ok(cached.value.clone());
            }
        }

        let response = self
            .client
            .post(TOKEN_URL)
            .basic_auth(
                &self.credentials.client_id,
                Some(&self.credentials.client_secret),
            )
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .context("Failed to send Spotify token request")?;

        if !response.status().is_success() {
            bail!("Spotify token request failed: {}", response.status());
        }

        let token: TokenResponse = response.json().await?;
        let ttl = token.expires_in.saturating_sub(TOKEN_SLACK_SECS);
        let value = token.access_token;

        *guard = Some(CachedToken {
            value: value.clone(),
            expires_at: Instant::now() + Duration::from_secs(ttl),
        });

        Ok(value)
    }

    async fn search_track(&self, token: &str, title: &str, artist: &str) -> Result<Option<TrackHit>> {
        let query = search_query(title, artist);
        let response = self
            .client
            .get(format!("{API_BASE}/search"))
            .bearer_auth(token)
            .query(&[
                ("q", query.as_str()),
                ("type", "track"),
                ("limit", "1"), // Just take the best match
            ])
            .send()
            .await
            .context("Failed to send Spotify search request")?;

        if !response.status().is_success() {
            return Ok(None);
        }

        let search_result: SearchResponse = response.json().await?;

        Ok(search_result.tracks.items.into_iter().next())
    }

    async fn fetch_genres(&self, token: &str, endpoint: &str, id: &str) -> Result<Vec<String>> {
        let response = self
            .client
            .get(format!("{API_BASE}/{endpoint}/{id}"))
            .bearer_auth(token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Ok(vec![]);
        }

        let parsed: GenresResponse = response.json().await?;

        Ok(parsed.genres)
    }

    async fn lookup_track(&self, title: &str, artist: &str) -> Result<LookupResult> {
        let token = self.access_token().await?;

        let Some(track) = self.search_track(&token, title, artist).await? else {
            return Ok(LookupResult::default());
        };

        let mut genres = Vec::new();

        // Spotify keys genres off the artist; albums carry them rarely, but
        // both are checked so nothing a hit does carry gets dropped.
        if let Some(artist_ref) = track.artists.first() {
            match self.fetch_genres(&token, "artists", &artist_ref.id).await {
                Ok(list) => genres.extend(list),
                Err(e) => tracing::warn!("Spotify artist genres failed for {}: {e}", artist_ref.id),
            }
        }

        let mut year = None;
        if let Some(album) = track.album {
            match self.fetch_genres(&token, "albums", &album.id).await {
                Ok(list) => genres.extend(list),
                Err(e) => tracing::warn!("Spotify album genres failed for {}: {e}", album.id),
            }
            if let Some(date) = &album.release_date {
                year = year::from_release_date(date).map(str::to_string);
            }
        }

        Ok(LookupResult { genres, year })
    }
}

fn search_query(title: &str, artist: &str) -> String {
    format!("track:{title} artist:{artist}")
}

#[async_trait]
impl GenreSource for SpotifyClient {
    async fn lookup(&self, title: &str, artist: &str) -> LookupResult {
        match self.lookup_track(title, artist).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!("Spotify lookup failed for {artist} - {title}: {e}");
                LookupResult::default()
            }
        }
    }
}

// --- Serde Structs ---

#[derive(Deserialize, Debug)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Deserialize, Debug)]
struct SearchResponse {
    tracks: TrackPage,
}

#[derive(Deserialize, Debug)]
struct TrackPage {
    #[serde(default)]
    items: Vec<TrackHit>,
}

#[derive(Deserialize, Debug)]
struct TrackHit {
    #[serde(default)]
    artists: Vec<ArtistRef>,
    album: Option<AlbumRef>,
}

#[derive(Deserialize, Debug)]
struct ArtistRef {
    id: String,
}

#[derive(Deserialize, Debug)]
struct AlbumRef {
    id: String,
    release_date: Option<String>,
}

#[derive(Deserialize, Debug)]
struct GenresResponse {
    #[serde(default)]
    genres: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_query_shape() {
        assert_eq!(
            search_query("One More Time", "Daft Punk"),
            "track:One More Time artist:Daft Punk"
        );
    }

    #[test]
    fn parses_search_response() {
        let json = r#"{
            "tracks": {
                "items": [{
                    "artists": [{"id": "abc123"}],
                    "album": {"id": "alb456", "release_date": "2001-03-12"}
                }]
            }
        }"#;
        let parsed: SearchResponse = serde_json::from_str(json).unwrap();
        let hit = &parsed.tracks.items[0];
        assert_eq!(hit.artists[0].id, "abc123");
        let album = hit.album.as_ref().unwrap();
        assert_eq!(album.id, "alb456");
        assert_eq!(album.release_date.as_deref(), Some("2001-03-12"));
    }

    #[test]
    fn parses_search_response_with_no_hits() {
        let json = r#"{"tracks": {"items": []}}"#;
        let parsed: SearchResponse = serde_json::from_str(json).unwrap();
        assert!(parsed.tracks.items.is_empty());
    }

    #[test]
    fn parses_genres_response_without_genres_field() {
        let json = r#"{"name": "Discovery"}"#;
        let parsed: GenresResponse = serde_json::from_str(json).unwrap();
        assert!(parsed.genres.is_empty());
    }

    #[test]
    fn parses_token_response() {
        let json = r#"{"access_token": "tok", "token_type": "Bearer", "expires_in": 3600}"#;
        let parsed: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.access_token, "tok");
        assert_eq!(parsed.expires_in, 3600);
    }
}
