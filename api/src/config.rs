//! Runtime configuration, resolved once at startup from environment variables.
//!
//! Invalid values are logged and replaced by their defaults. Handlers never read the
//! environment; they receive what was resolved here through the application state.

use domain::DEFAULT_PAGE_SIZE;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{info, warn};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DATA_DIR: &str = "./data";

/// Where collection blobs are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    /// One JSON file per collection under the data directory.
    File,
    /// Process memory only; lost on exit.
    Memory,
}

impl FromStr for StorageKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(StorageKind::File),
            "memory" => Ok(StorageKind::Memory),
            other => Err(format!("unknown storage kind '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub port: u16,
    pub storage: StorageKind,
    pub data_dir: PathBuf,
    pub seed_sample_data: bool,
    pub page_size: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            storage: StorageKind::File,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            seed_sample_data: true,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Resolves the configuration through `lookup`, which maps a variable name to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = AppConfig::default();
        let page_size = parse_or_default(&lookup, "CLINIC_PAGE_SIZE", defaults.page_size);
        let page_size = if page_size == 0 {
            warn!(
                "CLINIC_PAGE_SIZE must be at least 1. Using default {}.",
                defaults.page_size
            );
            defaults.page_size
        } else {
            page_size
        };

        Self {
            port: parse_or_default(&lookup, "PORT", defaults.port),
            storage: parse_or_default(&lookup, "CLINIC_STORAGE", defaults.storage),
            data_dir: lookup("CLINIC_DATA_DIR")
                .filter(|dir| !dir.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            seed_sample_data: parse_or_default(
                &lookup,
                "CLINIC_SEED_SAMPLE_DATA",
                defaults.seed_sample_data,
            ),
            page_size,
        }
    }
}

fn parse_or_default<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
{
    match lookup(name) {
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(value) => {
                info!("Using {:?} from environment variable {}.", value, name);
                value
            }
            Err(_) => {
                warn!(
                    "Invalid {} value '{}' in environment variable. Using default {:?}.",
                    name, raw, default
                );
                default
            }
        },
        None => default,
    }
}
