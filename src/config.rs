use anyhow::Result;
use serde::Deserialize;
use std::env;
use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_IMAGEKIT_UPLOAD_URL: &str = "https://upload.imagekit.io/api/v1/files/upload";
pub const DEFAULT_CLOUDINARY_API_BASE: &str = "https://api.cloudinary.com/v1_1";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub database: Option<DatabaseConfig>,
    pub upload: UploadConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
            cors_allowed_origins: vec!["*".to_string()],
        }
    }
}

#[derive(Clone, Deserialize, Default)]
pub struct AuthConfig {
    /// Shared secret for external uploads. Empty means unconfigured.
    pub external_upload_api_key: String,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.external_upload_api_key.is_empty() { "<unset>" } else { "<redacted>" };
        f.debug_struct("AuthConfig")
            .field("external_upload_api_key", &state)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub credentials_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            credentials_file: PathBuf::from("storage_credentials.json"),
        }
    }
}

#[derive(Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

// The URL usually embeds a password
impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &"<redacted>")
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Bound on each provider attempt
    pub timeout_secs: u64,
    pub max_upload_bytes: usize,
    pub imagekit_upload_url: String,
    pub cloudinary_api_base: String,
    pub imagekit_signature_ttl_secs: i64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            max_upload_bytes: 25 * 1024 * 1024,
            imagekit_upload_url: DEFAULT_IMAGEKIT_UPLOAD_URL.to_string(),
            cloudinary_api_base: DEFAULT_CLOUDINARY_API_BASE.to_string(),
            imagekit_signature_ttl_secs: 1800,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    pub directory: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = UploadConfig::default();

        let database = match env::var("DATABASE_URL") {
            Ok(url) if !url.trim().is_empty() => Some(DatabaseConfig {
                url,
                max_connections: env::var("DB_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()?,
                min_connections: env::var("DB_MIN_CONNECTIONS")
                    .unwrap_or_else(|_| "1".to_string())
                    .parse()?,
            }),
            _ => None,
        };

        Ok(Self {
            server: ServerConfig {
                port: env::var("PORT")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()?,
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                cors_allowed_origins: env::var("ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| "*".to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
            auth: AuthConfig {
                external_upload_api_key: env::var("EXTERNAL_UPLOAD_API_KEY").unwrap_or_default(),
            },
            storage: StorageConfig {
                credentials_file: env::var("CREDENTIALS_FILE")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| StorageConfig::default().credentials_file),
            },
            database,
            upload: UploadConfig {
                timeout_secs: env::var("UPLOAD_TIMEOUT_SECS")
                    .unwrap_or_else(|_| defaults.timeout_secs.to_string())
                    .parse()?,
                max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                    .unwrap_or_else(|_| defaults.max_upload_bytes.to_string())
                    .parse()?,
                imagekit_upload_url: env::var("IMAGEKIT_UPLOAD_URL")
                    .unwrap_or(defaults.imagekit_upload_url),
                cloudinary_api_base: env::var("CLOUDINARY_API_BASE")
                    .unwrap_or(defaults.cloudinary_api_base),
                imagekit_signature_ttl_secs: env::var("IMAGEKIT_SIGNATURE_TTL_SECS")
                    .unwrap_or_else(|_| defaults.imagekit_signature_ttl_secs.to_string())
                    .parse()?,
            },
            logging: LoggingConfig {
                directory: env::var("LOG_DIR").ok().map(PathBuf::from),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_config_debug_redacts_secret() {
        let auth = AuthConfig {
            external_upload_api_key: "super-secret-key".to_string(),
        };
        let printed = format!("{:?}", auth);
        assert!(!printed.contains("super-secret-key"));
        assert!(printed.contains("<redacted>"));

        let printed = format!("{:?}", AuthConfig::default());
        assert!(printed.contains("<unset>"));
    }

    #[test]
    fn test_upload_defaults() {
        let upload = UploadConfig::default();
        assert_eq!(upload.timeout_secs, 60);
        assert_eq!(upload.imagekit_upload_url, DEFAULT_IMAGEKIT_UPLOAD_URL);
        assert_eq!(upload.cloudinary_api_base, "https://api.cloudinary.com/v1_1");
    }
}
