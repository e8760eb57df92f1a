use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

pub const DEFAULT_BOARD_URL: &str = "https://www.pinterest.ca/krazikhan/fashion/";
pub const DEFAULT_USER_AGENT: &str = concat!("pin_style_trends/", env!("CARGO_PKG_VERSION"));

/// Runtime settings for a scrape / classify / chart run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Board whose pins are scraped
    pub board_url: String,

    /// Stop after this many pins have been opened
    pub max_pins: usize,

    /// How many times the board page may be fetched looking for new pins
    pub max_polls: usize,

    pub request_timeout_secs: u64,
    pub user_agent: String,

    /// Parallel image downloads
    pub download_concurrency: usize,

    pub image_dir: PathBuf,
    pub image_prefix: String,

    pub classifier: ClassifierConfig,

    pub records_path: PathBuf,
    pub chart_path: PathBuf,

    /// When set, the HTML of the most recently opened pin is written here
    pub page_source_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClassifierConfig {
    pub program: String,
    pub args: Vec<String>,
    pub script: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            board_url: DEFAULT_BOARD_URL.to_owned(),
            max_pins: 5,
            max_polls: 10,
            request_timeout_secs: 10,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            download_concurrency: 4,
            image_dir: PathBuf::from("images"),
            image_prefix: "pin".to_owned(),
            classifier: ClassifierConfig::default(),
            records_path: PathBuf::from("pins.json"),
            chart_path: PathBuf::from("style-trends.html"),
            page_source_path: None,
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            program: "python3".to_owned(),
            args: Vec::new(),
            script: PathBuf::from("clip-script.py"),
        }
    }
}

impl Config {
    /// Reads a TOML file; missing keys fall back to defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Config = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let board = Url::parse(&self.board_url)?;
        if !matches!(board.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "board_url must be http(s), got {}",
                self.board_url
            )));
        }
        if self.max_pins == 0 {
            return Err(Error::Config("max_pins must be at least 1".into()));
        }
        if self.max_polls == 0 {
            return Err(Error::Config("max_polls must be at least 1".into()));
        }
        if self.download_concurrency == 0 {
            return Err(Error::Config("download_concurrency must be at least 1".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config("request_timeout_secs must be at least 1".into()));
        }
        if self.classifier.program.trim().is_empty() {
            return Err(Error::Config("classifier.program is empty".into()));
        }
        Ok(())
    }
}
