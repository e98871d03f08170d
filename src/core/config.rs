// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Drive configuration
//!
//! Settings are read from a TOML file and can be overridden through the
//! environment (a `.env` file is honoured by the binaries):
//!
//! ```toml
//! [drive]
//! image = "games/crazy_taxi.gdi"
//! chd_hunk_cache = 8
//!
//! [log]
//! level = "debug"
//! ```
//!
//! | Variable      | Overrides          |
//! |---------------|--------------------|
//! | `GDROM_IMAGE` | `drive.image`      |
//! | `GDROM_LOG`   | `log.level`        |

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::error::{GdromError, Result};
use crate::core::mount::chd::DEFAULT_HUNK_CACHE;

pub const ENV_IMAGE: &str = "GDROM_IMAGE";
pub const ENV_LOG: &str = "GDROM_LOG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    /// Image mounted at startup
    pub image: Option<PathBuf>,
    /// Decompressed CHD hunks kept in memory
    pub chd_hunk_cache: usize,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            image: None,
            chd_hunk_cache: DEFAULT_HUNK_CACHE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `env_logger` filter, e.g. `"info"` or `"gdrom=trace"`
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GdromConfig {
    pub drive: DriveConfig,
    pub log: LogConfig,
}

impl GdromConfig {
    /// Parse configuration from TOML text
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| GdromError::Config(e.to_string()))
    }

    /// Load the configuration file at `path`
    ///
    /// A missing file yields the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => {
                log::debug!("CONFIG: Loaded '{}'", path.display());
                Self::from_toml(&text)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("CONFIG: '{}' not found, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Serialize to TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| GdromError::Config(e.to_string()))
    }

    /// Apply `GDROM_IMAGE` / `GDROM_LOG` from the process environment
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Defaults plus environment overrides
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    fn apply_overrides<F: Fn(&str) -> Option<String>>(&mut self, lookup: F) {
        if let Some(image) = lookup(ENV_IMAGE).filter(|v| !v.is_empty()) {
            self.drive.image = Some(PathBuf::from(image));
        }
        if let Some(level) = lookup(ENV_LOG).filter(|v| !v.is_empty()) {
            self.log.level = level;
        }
    }
}
