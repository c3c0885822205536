//! Configuration management.
//!
//! Settings are layered with figment: built-in defaults, then an optional
//! TOML file (`--config`, `./fileforge.toml`, or the user config directory),
//! then `FILEFORGE_*` environment variables, then CLI overrides passed in as
//! a JSON value. CLI flags therefore always win.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::external::ImageFormat;
use crate::job::JobOptions;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ForgeConfig {
    /// Job pipeline tuning
    pub job: JobConfig,

    /// Document conversion settings
    pub convert: ConvertConfig,

    /// Archive compression settings
    pub compress: CompressConfig,

    /// Duplicate finder settings
    pub duplicates: DuplicatesConfig,

    /// Secure shredder settings
    pub shredder: ShredderConfig,

    /// Drive analyzer settings
    pub analyzer: AnalyzerConfig,
}

/// Worker pool and progress tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// Maximum worker threads (0 = derive from CPU cores)
    pub max_workers: usize,

    /// Percentage of CPU cores to use when deriving the worker count (1-100)
    pub thread_percentage: u8,

    /// Worker cap for I/O-heavy tools (shredder, duplicate scan) so a wide
    /// pool does not thrash the disk
    pub io_max_workers: usize,

    /// Per-item deadline in milliseconds (0 = no deadline)
    pub item_timeout_ms: u64,

    /// Channel buffer size multiplier (buffer = workers * multiplier)
    pub channel_buffer_multiplier: usize,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            max_workers: 0,
            thread_percentage: 75,
            io_max_workers: 2,
            item_timeout_ms: 0,
            channel_buffer_multiplier: 2,
        }
    }
}

/// Document conversion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    /// Render resolution for PDF page images
    pub dpi: u32,

    /// Raster format for PDF page images
    pub image_format: ImageFormat,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            dpi: 200,
            image_format: ImageFormat::Png,
        }
    }
}

/// Archive compression settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressConfig {
    /// Deflate level (0-9)
    pub level: i64,
}

impl Default for CompressConfig {
    fn default() -> Self {
        Self { level: 6 }
    }
}

/// Duplicate finder settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DuplicatesConfig {
    /// Ignore files smaller than this many bytes
    pub min_size_bytes: u64,

    /// Only consider these extensions (empty = all files)
    pub extensions: Vec<String>,

    /// Descend into subdirectories
    pub recursive: bool,
}

impl Default for DuplicatesConfig {
    fn default() -> Self {
        Self {
            min_size_bytes: 1,
            extensions: Vec::new(),
            recursive: true,
        }
    }
}

/// Secure shredder settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShredderConfig {
    /// Number of overwrite passes before deletion
    pub passes: u32,
}

impl Default for ShredderConfig {
    fn default() -> Self {
        Self { passes: 3 }
    }
}

/// Drive analyzer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// How many entries the largest-files listing shows
    pub largest_count: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self { largest_count: 20 }
    }
}

impl ForgeConfig {
    /// Load configuration with optional custom file path and CLI overrides.
    pub fn load(path: Option<&str>, overrides: Option<serde_json::Value>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(ForgeConfig::default()));

        if let Some(custom_path) = path {
            figment = figment.merge(Toml::file(custom_path));
        } else {
            if let Some(config_dir) = dirs::config_dir() {
                figment = figment.merge(Toml::file(config_dir.join("fileforge/config.toml")));
            }
            figment = figment.merge(Toml::file("fileforge.toml"));
        }

        figment = figment.merge(Env::prefixed("FILEFORGE_"));

        if let Some(values) = overrides {
            figment = figment.merge(Serialized::defaults(values));
        }

        figment.extract().context("invalid configuration")
    }

    /// Job options for one run. I/O-heavy tools get the lower worker cap.
    pub fn job_options(&self, io_bound: bool) -> JobOptions {
        let max_workers = if io_bound {
            if self.job.max_workers > 0 {
                self.job.max_workers.min(self.job.io_max_workers)
            } else {
                self.job.io_max_workers
            }
        } else {
            self.job.max_workers
        };

        JobOptions {
            max_workers,
            thread_percentage: self.job.thread_percentage,
            item_timeout: match self.job.item_timeout_ms {
                0 => None,
                ms => Some(Duration::from_millis(ms)),
            },
            channel_buffer_multiplier: self.job.channel_buffer_multiplier.max(1),
        }
    }
}
