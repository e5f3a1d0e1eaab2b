// Licensed under the Apache-2.0 license

//! Secure check of an OTA package against the running platform.

use core::fmt;
use std::path::Path;

use log::{debug, error, info, warn};

use crate::classifier::classify;
use crate::config::SecureCheckConfig;
use crate::error::{SecureCheckError, SecureCheckResult};
use crate::image::{EncryptionState, ImageKind};
use crate::matcher::{match_platform, MatchOutcome};
use crate::package::{ImageSource, ZipPackage};
use crate::platform::{DeviceProperties, PlatformStateProbe, SystemProperties};
use crate::verifier::{DefendKeyChannel, SignatureVerifier};

/// Image that vetoed the installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageMismatch {
    pub image: ImageKind,
    pub platform: EncryptionState,
    pub image_state: EncryptionState,
}

impl fmt::Display for ImageMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.platform == self.image_state {
            // Only reachable when both are encrypted and the channel said no.
            write!(f, "{} is signed for a different platform", self.image)
        } else {
            write!(
                f,
                "{} is {} but the platform is {}",
                self.image, self.image_state, self.platform
            )
        }
    }
}

/// Final decision of a secure check.
#[derive(Debug)]
pub enum Verdict {
    /// The check could not be completed; installation must not proceed.
    Fatal(SecureCheckError),
    /// An image does not match the platform; installation must not proceed.
    Mismatch(ImageMismatch),
    /// Every image present in the package matches the platform.
    AllMatch,
    /// The kernel does not support the secure check; installation may proceed.
    KernelUnsupported,
}

impl Verdict {
    pub const FATAL: i32 = -1;
    pub const MISMATCH: i32 = 0;
    pub const ALL_MATCH: i32 = 1;
    pub const KERNEL_UNSUPPORTED: i32 = 2;

    /// Integer form of the verdict handed to the installer.
    pub fn code(&self) -> i32 {
        match self {
            Verdict::Fatal(_) => Self::FATAL,
            Verdict::Mismatch(_) => Self::MISMATCH,
            Verdict::AllMatch => Self::ALL_MATCH,
            Verdict::KernelUnsupported => Self::KERNEL_UNSUPPORTED,
        }
    }

    pub fn allows_install(&self) -> bool {
        matches!(self, Verdict::AllMatch | Verdict::KernelUnsupported)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Fatal(e) => write!(f, "secure check failed: {e}"),
            Verdict::Mismatch(mismatch) => write!(f, "update rejected: {mismatch}"),
            Verdict::AllMatch => f.write_str("all images match the platform"),
            Verdict::KernelUnsupported => f.write_str("kernel doesn't support secure check"),
        }
    }
}

/// Runs the secure check for OTA packages.
pub struct SecureCheck<V = DefendKeyChannel> {
    config: SecureCheckConfig,
    verifier: V,
    properties: Box<dyn DeviceProperties>,
}

impl SecureCheck<DefendKeyChannel> {
    /// Secure check against the kernel resources named by `config`.
    pub fn new(config: SecureCheckConfig) -> Self {
        let verifier = DefendKeyChannel::new(config.channel_path.clone());
        Self::with_verifier(config, verifier)
    }
}

impl<V: SignatureVerifier> SecureCheck<V> {
    pub fn with_verifier(config: SecureCheckConfig, verifier: V) -> Self {
        Self {
            config,
            verifier,
            properties: Box::new(SystemProperties),
        }
    }

    pub fn with_properties(mut self, properties: Box<dyn DeviceProperties>) -> Self {
        self.properties = properties;
        self
    }

    pub fn config(&self) -> &SecureCheckConfig {
        &self.config
    }

    pub fn verifier(&self) -> &V {
        &self.verifier
    }

    /// Checks the package at `package` against the platform.
    ///
    /// The package is not opened when the kernel lacks support or the
    /// platform state cannot be determined. The package and any extracted
    /// image are released before this returns.
    pub fn run(&mut self, package: &Path) -> Verdict {
        if let Err(e) = self.config.require_kernel_support() {
            debug!("kernel doesn't support secure check: {e}");
            return Verdict::KernelUnsupported;
        }

        info!("-- Secure Check...");
        let verdict = match self.probe_platform() {
            Ok(platform) => match ZipPackage::open(package) {
                Ok(mut package) => self.check_images(platform, &mut package),
                Err(e) => Verdict::Fatal(e),
            },
            Err(e) => Verdict::Fatal(e),
        };
        log_verdict(&verdict);
        verdict
    }

    /// Reads the platform encryption state.
    pub fn probe_platform(&self) -> SecureCheckResult<EncryptionState> {
        PlatformStateProbe::new(
            &self.config.status_path,
            self.config.product_property.as_str(),
            self.properties.as_ref(),
        )
        .probe()
    }

    /// Checks every boot-chain image of `source` against `platform`, in
    /// [`ImageKind::ALL`] order.
    ///
    /// Images absent from the source are skipped. The first mismatch or error
    /// ends the check; later images are never fetched.
    pub fn check_images<S: ImageSource + ?Sized>(
        &mut self,
        platform: EncryptionState,
        source: &mut S,
    ) -> Verdict {
        for kind in ImageKind::ALL {
            match self.check_image(platform, kind, source) {
                Ok(Some(mismatch)) => return Verdict::Mismatch(mismatch),
                Ok(None) => {}
                Err(e) => return Verdict::Fatal(e),
            }
        }
        Verdict::AllMatch
    }

    /// Checks a single image; `Ok(Some(_))` reports a mismatch.
    fn check_image<S: ImageSource + ?Sized>(
        &mut self,
        platform: EncryptionState,
        kind: ImageKind,
        source: &mut S,
    ) -> SecureCheckResult<Option<ImageMismatch>> {
        let Some(image) = source.fetch(kind)? else {
            info!("check {kind}: not find, skipping...");
            return Ok(None);
        };

        let image = image.as_ref();
        let image_state = classify(kind, image)?;
        info!("check {kind}: {image_state}");

        match match_platform(platform, image_state, kind, image, &mut self.verifier)? {
            MatchOutcome::Match => {
                debug!("{kind} match platform");
                Ok(None)
            }
            MatchOutcome::NoMatch => Ok(Some(ImageMismatch {
                image: kind,
                platform,
                image_state,
            })),
            MatchOutcome::Failed => Err(SecureCheckError::VerificationFailed { image: kind }),
        }
    }
}

fn log_verdict(verdict: &Verdict) {
    match verdict {
        Verdict::Fatal(e) => {
            error!("{verdict}");
            let mut source = std::error::Error::source(e);
            while let Some(cause) = source {
                error!("  caused by: {cause}");
                source = std::error::Error::source(cause);
            }
        }
        Verdict::Mismatch(_) => warn!("{verdict}"),
        Verdict::AllMatch => info!("{verdict}"),
        Verdict::KernelUnsupported => debug!("{verdict}"),
    }
}
