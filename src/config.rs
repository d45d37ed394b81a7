//! Settings for an index manager and its store, read from a RON file:
//!
//! ```text
//! (
//!     data_dir: "/var/lib/babydb",
//!     shards: 32,
//!     node_id: (98, 97, 98, 121, 100, 98),
//! )
//! ```
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Directory of the sled database holding persisted indexes.
    pub data_dir: PathBuf,
    /// Number of independently locked shards per registry.
    pub shards: usize,
    /// Node id stamped into generated uuids.
    pub node_id: [u8; 6],
}

pub const DEFAULT_SHARDS: usize = 16;

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: PathBuf::from("babydb-data"),
            shards: DEFAULT_SHARDS,
            node_id: *b"babydb",
        }
    }
}

impl Config {
    pub fn from_ron_str(s: &str) -> Result<Self> {
        let mut config: Config = ron::de::from_str(s)?;
        config.shards = config.shards.max(1);
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Config::from_ron_str(&contents)
    }
}
