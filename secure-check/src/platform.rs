// Licensed under the Apache-2.0 license

//! Platform encryption state as reported by the defendkey driver.

use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::process::Command;

use log::{error, info};

use crate::error::{SecureCheckError, SecureCheckResult};
use crate::image::EncryptionState;

/// Status token for an unencrypted platform.
pub const STATUS_UNENCRYPTED: &str = "raw";
/// Status token for an encrypted platform.
pub const STATUS_ENCRYPTED: &str = "encrypt";
/// Status token for a platform whose state the driver failed to determine.
pub const STATUS_FAILED: &str = "fail";

/// Longest status the driver emits.
const STATUS_MAX_LEN: usize = 127;

/// Product name used in logs when the property is unset.
const UNKNOWN_PRODUCT: &str = "unknown";

/// Read access to device properties.
///
/// Properties are used for log context only and never influence a decision.
pub trait DeviceProperties {
    fn get(&self, key: &str) -> Option<String>;
}

/// Device properties read through `getprop`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProperties;

impl DeviceProperties for SystemProperties {
    fn get(&self, key: &str) -> Option<String> {
        let output = Command::new("getprop").arg(key).output().ok()?;
        if !output.status.success() {
            return None;
        }
        let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
        (!value.is_empty()).then_some(value)
    }
}

/// Reads the platform encryption state from the kernel status file.
pub struct PlatformStateProbe<'a> {
    status_path: PathBuf,
    product_property: String,
    properties: &'a dyn DeviceProperties,
}

impl<'a> PlatformStateProbe<'a> {
    pub fn new(
        status_path: impl Into<PathBuf>,
        product_property: impl Into<String>,
        properties: &'a dyn DeviceProperties,
    ) -> Self {
        Self {
            status_path: status_path.into(),
            product_property: product_property.into(),
            properties,
        }
    }

    /// Returns the platform encryption state.
    ///
    /// A missing or unreadable status file, an empty status, the `fail` token
    /// and any unrecognized token are all errors.
    pub fn probe(&self) -> SecureCheckResult<EncryptionState> {
        let mut file =
            File::open(&self.status_path).map_err(|source| SecureCheckError::ResourceUnavailable {
                path: self.status_path.clone(),
                source,
            })?;

        let product = self
            .properties
            .get(&self.product_property)
            .unwrap_or_else(|| UNKNOWN_PRODUCT.to_string());

        let mut buf = [0u8; STATUS_MAX_LEN];
        let count = file
            .read(&mut buf)
            .map_err(|source| SecureCheckError::ResourceUnavailable {
                path: self.status_path.clone(),
                source,
            })?;
        if count == 0 {
            error!("read {:?} failed (count:0)", self.status_path);
            return Err(SecureCheckError::EmptyPlatformStatus {
                path: self.status_path.clone(),
            });
        }

        let status = String::from_utf8_lossy(&buf[..count]);
        let state = parse_status(&status);
        match state {
            Some(state) => info!("check platform({product}): {state}"),
            None => info!("check platform({product}): {}", status.trim_end()),
        }

        state.ok_or_else(|| SecureCheckError::PlatformUndetermined {
            status: status.trim_end().to_string(),
        })
    }
}

/// Maps a raw status read onto an encryption state.
///
/// `fail` and unrecognized tokens both yield `None`.
fn parse_status(status: &str) -> Option<EncryptionState> {
    match status.trim_end() {
        STATUS_UNENCRYPTED => Some(EncryptionState::Unencrypted),
        STATUS_ENCRYPTED => Some(EncryptionState::Encrypted),
        STATUS_FAILED => None,
        _ => None,
    }
}
