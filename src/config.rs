use comrak::ComrakOptions;
use gotham_derive::StateData;
use log::LevelFilter;

use std::path::Path;

const SYSTEM_CONFIG: &str = "/etc/cafes/cafes.toml";
const LOCAL_CONFIG: &str = "cafes.toml";

/// Application wide settings defined in configuration file.
#[derive(Deserialize, StateData, Clone, Debug)]
pub struct Settings {
    /// SQLite database path
    pub database_url: String,
    /// IP address to bind to
    pub host_address: String,
    /// Most verbose level logged for this crate
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Cookie settings
    pub cookie: Cookie,
}

fn default_log_level() -> String {
    String::from("info")
}

impl Settings {
    pub fn from_slice(data: &[u8]) -> Result<Self, toml::de::Error> {
        toml::from_slice(data)
    }

    /// Reads the system wide configuration if installed, the local one otherwise.
    pub fn load() -> Result<Self, failure::Error> {
        let path = if Path::new(SYSTEM_CONFIG).is_file() {
            Path::new(SYSTEM_CONFIG)
        } else {
            Path::new(LOCAL_CONFIG)
        };
        let data = std::fs::read(path)
            .map_err(|e| failure::format_err!("reading {}: {}", path.display(), e))?;
        Ok(Self::from_slice(&data)?)
    }

    pub fn level(&self) -> Result<LevelFilter, failure::Error> {
        self.log_level
            .parse()
            .map_err(|_| failure::format_err!("invalid log level '{}'", self.log_level))
    }
}

/// Cookie related settings
#[derive(Deserialize, Clone, Debug)]
pub struct Cookie {
    /// Require HTTPS for cookies
    pub secure: bool,
    /// Restrict cookies to given domain if set
    pub domain: Option<String>,
}

/// Options for rendering comment bodies. Raw HTML in comments is dropped.
pub fn comrak_options() -> ComrakOptions {
    ComrakOptions::default()
}
