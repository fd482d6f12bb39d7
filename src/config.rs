use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use tokio::fs;

pub const CLIENT_ID_VAR: &str = "SPOTIFY_CLIENT_ID";
pub const CLIENT_SECRET_VAR: &str = "SPOTIFY_CLIENT_SECRET";

/// Credentials for the Spotify client-credentials flow. Never baked into the
/// binary: they come from the environment or the config file.
#[derive(Debug, Clone)]
pub struct SpotifyCredentials {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct ConfigFile {
    pub spotify: Option<SpotifySection>,
    pub mapping: Option<MappingSection>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct SpotifySection {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct MappingSection {
    pub file: Option<PathBuf>,
}

/// Read `~/.config/genrehaku/config.toml`. A missing file is not an error,
/// the environment alone can carry everything.
pub async fn load_config() -> Result<ConfigFile> {
    let home = std::env::var("HOME").context("Failed to get HOME env var")?;
    let path = format!("{home}/.config/genrehaku/config.toml");

    let content = match fs::read_to_string(&path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ConfigFile::default()),
        Err(e) => return Err(e).context(format!("Failed to read config file: {path}")),
    };

    let config: ConfigFile = toml::from_str(&content).context("Failed to parse config file")?;

    Ok(config)
}

/// Credentials from the process environment, falling back to the config
/// file. `None` when either half is missing from both places.
pub fn spotify_credentials(file: &ConfigFile) -> Option<SpotifyCredentials> {
    resolve_credentials(
        std::env::var(CLIENT_ID_VAR).ok(),
        std::env::var(CLIENT_SECRET_VAR).ok(),
        file,
    )
}

fn resolve_credentials(
    env_id: Option<String>,
    env_secret: Option<String>,
    file: &ConfigFile,
) -> Option<SpotifyCredentials> {
    let section = file.spotify.as_ref();
    let client_id = env_id.or_else(|| section.and_then(|s| s.client_id.clone()))?;
    let client_secret = env_secret.or_else(|| section.and_then(|s| s.client_secret.clone()))?;

    Some(SpotifyCredentials {
        client_id,
        client_secret,
    })
}
