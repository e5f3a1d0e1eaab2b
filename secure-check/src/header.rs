// Licensed under the Apache-2.0 license

//! Secure-boot header carried at the start of encrypted boot and recovery
//! images.

use zerocopy::byteorder::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// Magic tag written by the secure-boot signing tool.
pub const SECUREBOOT_MAGIC: [u8; 8] = *b"AMLSECU!";

/// Bytes reserved for the Android boot image header ahead of the encryption
/// info block.
pub const BOOT_IMG_HDR_RESERVED_LEN: usize = 1024;

/// Encryption info block following the reserved boot image header area.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned,
)]
#[repr(C)]
pub struct EncryptBootImgInfo {
    pub magic: [u8; 8],
    pub version: U32,
    pub total_len_after_encrypted: U32,
}

/// Fixed-layout view over the leading bytes of a boot or recovery image.
///
/// Layout:
/// - Bytes 0..1024    - Reserved for the boot image header
/// - Bytes 1024..1032 - Magic tag
/// - Bytes 1032..1036 - Header version (little-endian)
/// - Bytes 1036..1040 - Total length after encryption (little-endian)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned,
)]
#[repr(C)]
pub struct SecureBootImageHeader {
    pub reserved: [u8; BOOT_IMG_HDR_RESERVED_LEN],
    pub info: EncryptBootImgInfo,
}

impl SecureBootImageHeader {
    pub const SIZE: usize = core::mem::size_of::<Self>();

    /// Header describing an encrypted image, as the signing tool emits it.
    pub fn new_encrypted(version: u32, total_len_after_encrypted: u32) -> Self {
        Self {
            reserved: [0; BOOT_IMG_HDR_RESERVED_LEN],
            info: EncryptBootImgInfo {
                magic: SECUREBOOT_MAGIC,
                version: U32::new(version),
                total_len_after_encrypted: U32::new(total_len_after_encrypted),
            },
        }
    }

    /// Borrows the header from the start of `image`; `None` when the image is
    /// shorter than the header.
    pub fn parse(image: &[u8]) -> Option<&Self> {
        Self::ref_from_prefix(image).ok().map(|(header, _)| header)
    }

    pub fn magic(&self) -> &[u8; 8] {
        &self.info.magic
    }

    pub fn version(&self) -> u32 {
        self.info.version.get()
    }

    pub fn total_len_after_encrypted(&self) -> u32 {
        self.info.total_len_after_encrypted.get()
    }

    pub fn has_secureboot_magic(&self) -> bool {
        self.info.magic == SECUREBOOT_MAGIC
    }

    /// An image is encrypted when it carries the magic and a non-zero version.
    pub fn is_encrypted(&self) -> bool {
        self.has_secureboot_magic() && self.version() != 0
    }
}
