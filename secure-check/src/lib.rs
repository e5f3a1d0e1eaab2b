// Licensed under the Apache-2.0 license

//! Secure-boot gate for OTA update packages.
//!
//! Before an update package is installed, the encryption state of the running
//! platform has to agree with the encryption state of every boot-chain image
//! (`bootloader.img`, `boot.img`, `recovery.img`) carried in the package. When
//! both the platform and an image are encrypted, the image signature is handed
//! to the kernel's verification channel, which is the only component that
//! knows the platform key material.
//!
//! The entry point is [`SecureCheck::run`], which returns a four-valued
//! [`Verdict`]. Callers allow installation on [`Verdict::AllMatch`] and
//! [`Verdict::KernelUnsupported`] and deny it otherwise.

pub mod check;
pub mod classifier;
pub mod config;
pub mod error;
pub mod header;
pub mod image;
pub mod matcher;
pub mod package;
pub mod platform;
pub mod verifier;

pub use check::{ImageMismatch, SecureCheck, Verdict};
pub use classifier::classify;
pub use config::SecureCheckConfig;
pub use error::{ErrorKind, SecureCheckError, SecureCheckResult};
pub use header::SecureBootImageHeader;
pub use image::{EncryptionState, ImageBuffer, ImageKind};
pub use matcher::{match_platform, MatchOutcome};
pub use package::{ImageSource, ZipPackage};
pub use platform::{DeviceProperties, PlatformStateProbe, SystemProperties};
pub use verifier::{DefendKeyChannel, SignatureVerifier};
