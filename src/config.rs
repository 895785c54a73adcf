//! Environment-backed configuration.
//!
//! Values come from the environment (a `.env` file is honoured via dotenv)
//! with defaults matching the public HOBBES server and a local Hydra.

use std::env;
use std::path::PathBuf;

/// Process-wide settings for one import run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the HOBBES network server.
    pub hobbes_url: String,
    /// Base URL of the Hydra server (overridable on the command line).
    pub hydra_url: String,
    /// Hydra login, used only when no session ID is supplied.
    pub username: String,
    pub password: String,
    /// strftime-style format applied to timeseries timestamps.
    pub datetime_format: String,
    /// Where the generated template XML is written before upload.
    pub template_output: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            hobbes_url: env::var("HOBBES_URL")
                .unwrap_or_else(|_| "http://cwn.casil.ucdavis.edu".to_string()),
            hydra_url: env::var("HYDRA_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            username: env::var("HYDRA_USERNAME").unwrap_or_else(|_| "root".to_string()),
            password: env::var("HYDRA_PASSWORD").unwrap_or_default(),
            datetime_format: env::var("HYDRA_DATETIME_FORMAT")
                .unwrap_or_else(|_| "%Y-%m-%d %H:%M:%S".to_string()),
            template_output: env::var("HOBBES_TEMPLATE_OUTPUT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("template.xml")),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
