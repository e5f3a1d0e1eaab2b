// Licensed under the Apache-2.0 license

//! Boot-chain image identities and the owned buffers extracted for them.

use core::fmt;
use core::str::FromStr;

/// Boot-chain images inspected by the secure check, in check order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageKind {
    Bootloader,
    Boot,
    Recovery,
}

impl ImageKind {
    /// Fixed processing order of the secure check.
    pub const ALL: [ImageKind; 3] = [ImageKind::Bootloader, ImageKind::Boot, ImageKind::Recovery];

    /// Name of the package entry holding this image.
    pub const fn entry_name(self) -> &'static str {
        match self {
            ImageKind::Bootloader => "bootloader.img",
            ImageKind::Boot => "boot.img",
            ImageKind::Recovery => "recovery.img",
        }
    }

    /// Boot and recovery images carry a secure-boot header; the bootloader
    /// uses a raw marker instead.
    pub const fn has_secure_boot_header(self) -> bool {
        matches!(self, ImageKind::Boot | ImageKind::Recovery)
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.entry_name())
    }
}

impl FromStr for ImageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bootloader" | "bootloader.img" => Ok(ImageKind::Bootloader),
            "boot" | "boot.img" => Ok(ImageKind::Boot),
            "recovery" | "recovery.img" => Ok(ImageKind::Recovery),
            other => Err(format!("unsupported image kind: {other}")),
        }
    }
}

/// Encryption state of the platform or of a single image.
///
/// A platform whose state cannot be determined never produces a value of this
/// type; the probe reports it as an error instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncryptionState {
    Unencrypted,
    Encrypted,
}

impl fmt::Display for EncryptionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncryptionState::Unencrypted => f.write_str("unencrypted"),
            EncryptionState::Encrypted => f.write_str("encrypted"),
        }
    }
}

/// Decompressed contents of one package image.
///
/// The buffer is owned by whoever is checking the image and is dropped before
/// the next image is fetched.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageBuffer {
    kind: ImageKind,
    data: Vec<u8>,
}

impl ImageBuffer {
    pub fn new(kind: ImageKind, data: Vec<u8>) -> Self {
        Self { kind, data }
    }

    pub fn kind(&self) -> ImageKind {
        self.kind
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

}

impl AsRef<[u8]> for ImageBuffer {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl fmt::Debug for ImageBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageBuffer")
            .field("kind", &self.kind)
            .field("len", &self.data.len())
            .finish()
    }
}
