use std::path::PathBuf;

/// Server configuration loaded from environment variables.
///
/// All fields except the map document have defaults suitable for local use.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `5000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Map file the session starts from (`.html`, `.htm`, `.kml` or `.kmz`).
    pub map_document: PathBuf,
    /// Backing JSON file of the annotation store.
    pub annotations_file: PathBuf,
    /// Directory that saved map documents are written to.
    pub output_dir: PathBuf,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `5000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5000`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `MAP_DOCUMENT`         | required                   |
    /// | `ANNOTATIONS_FILE`     | `annotations.json`         |
    /// | `OUTPUT_DIR`           | `.`                        |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "5000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5000".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let map_document: PathBuf = std::env::var("MAP_DOCUMENT")
            .expect("MAP_DOCUMENT must be set")
            .into();

        let annotations_file: PathBuf = std::env::var("ANNOTATIONS_FILE")
            .unwrap_or_else(|_| "annotations.json".into())
            .into();

        let output_dir: PathBuf = std::env::var("OUTPUT_DIR")
            .unwrap_or_else(|_| ".".into())
            .into();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            map_document,
            annotations_file,
            output_dir,
        }
    }
}
