// Parking Vecinal - Runtime configuration
// Everything comes from the environment with development defaults.

use std::env;
use std::path::PathBuf;

/// Server configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds to.
    pub bind_addr: String,

    /// Path of the SQLite database file.
    pub db_path: PathBuf,

    /// Directory holding uploaded receipt files.
    pub upload_dir: PathBuf,

    /// Secret used to sign the flash cookie.
    pub secret_key: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            db_path: env::var("PARKING_DB")
                .unwrap_or_else(|_| "parking.db".to_string())
                .into(),
            upload_dir: env::var("UPLOAD_DIR")
                .unwrap_or_else(|_| "static/uploads".to_string())
                .into(),
            secret_key: env::var("SECRET_KEY").unwrap_or_else(|_| "dev-secret-key".to_string()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
