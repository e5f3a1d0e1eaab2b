// Licensed under the Apache-2.0 license

//! Locations of the kernel resources used by the secure check.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{SecureCheckError, SecureCheckResult};

/// Platform encryption status exported by the defendkey driver.
pub const DEFAULT_STATUS_PATH: &str = "/sys/class/defendkey/secure_check";

/// Image signature verification channel of the defendkey driver.
pub const DEFAULT_CHANNEL_PATH: &str = "/dev/defendkey";

/// Property naming the product, used for log context.
pub const DEFAULT_PRODUCT_PROPERTY: &str = "ro.build.product";

/// Secure check configuration.
///
/// Every field is optional in the TOML form and falls back to the driver
/// defaults above.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SecureCheckConfig {
    /// File holding the platform encryption status token.
    pub status_path: PathBuf,
    /// Device accepting images for signature verification.
    pub channel_path: PathBuf,
    /// Device property naming the product.
    pub product_property: String,
}

impl Default for SecureCheckConfig {
    fn default() -> Self {
        Self {
            status_path: PathBuf::from(DEFAULT_STATUS_PATH),
            channel_path: PathBuf::from(DEFAULT_CHANNEL_PATH),
            product_property: DEFAULT_PRODUCT_PROPERTY.to_string(),
        }
    }
}

impl SecureCheckConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        toml::from_str(contents).with_context(|| "Failed to parse TOML configuration")
    }

    /// Whether the kernel exposes both resources the secure check needs.
    pub fn kernel_supported(&self) -> bool {
        self.status_path.exists() && self.channel_path.exists()
    }

    /// Fails with the first kernel resource that does not exist.
    pub fn require_kernel_support(&self) -> SecureCheckResult<()> {
        for path in [&self.status_path, &self.channel_path] {
            if let Err(source) = std::fs::metadata(path) {
                return Err(SecureCheckError::ResourceUnavailable {
                    path: path.clone(),
                    source,
                });
            }
        }
        Ok(())
    }
}
