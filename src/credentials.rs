use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Credentials file structure
///
/// Format:
/// ```toml
/// [postgres.profile_name]
/// password = "your_postgres_password_here"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Credentials {
    #[serde(default)]
    pub postgres: HashMap<String, CredentialProfile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CredentialProfile {
    pub password: String,
}

/// Get the default credentials file path: ~/.config/wav_vault/credentials.toml
pub fn get_credentials_path() -> Result<PathBuf, String> {
    let home = std::env::var("HOME").map_err(|_| "HOME environment variable not set".to_string())?;
    Ok(PathBuf::from(home)
        .join(".config")
        .join("wav_vault")
        .join("credentials.toml"))
}

/// Load credentials from a file
/// Returns None if the file doesn't exist
pub fn load_credentials_from(
    creds_path: &Path,
) -> Result<Option<Credentials>, Box<dyn std::error::Error + Send + Sync>> {
    if !creds_path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(creds_path)?;
    let credentials: Credentials = toml::from_str(&content)?;

    Ok(Some(credentials))
}

/// Load credentials from the default location
pub fn load_credentials() -> Result<Option<Credentials>, Box<dyn std::error::Error + Send + Sync>> {
    load_credentials_from(&get_credentials_path()?)
}

/// Get the PostgreSQL password for a profile
pub fn get_postgres_password(
    credentials: &Option<Credentials>,
    profile: &str,
) -> Result<String, String> {
    match credentials {
        Some(creds) => creds
            .postgres
            .get(profile)
            .map(|p| p.password.clone())
            .ok_or_else(|| {
                format!(
                    "Credential profile '[postgres.{}]' not found in credentials file",
                    profile
                )
            }),
        None => Err(format!(
            "Credentials file not found. Expected at: {}",
            get_credentials_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|e| e)
        )),
    }
}
