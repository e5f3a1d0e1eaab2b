// Licensed under the Apache-2.0 license

//! Classifies a boot-chain image as encrypted or unencrypted from its raw
//! bytes.

use log::debug;

use crate::error::{SecureCheckError, SecureCheckResult};
use crate::header::SecureBootImageHeader;
use crate::image::{EncryptionState, ImageKind};

/// Offset of the bootloader marker checked against [`UNENCRYPTED_BOOTLOADER_MARKER`].
pub const BOOTLOADER_MARKER_OFFSET: usize = 0x1b0;

/// Marker present at [`BOOTLOADER_MARKER_OFFSET`] in an unencrypted bootloader.
pub const UNENCRYPTED_BOOTLOADER_MARKER: [u8; 8] = *b"M3HHREV0";

/// Determines the encryption state of `image`.
///
/// Bootloaders are classified by a presence check of a fixed marker: the
/// marker means unencrypted, anything else means encrypted. This is a
/// heuristic, not a cryptographic check. Boot and recovery images are
/// encrypted when their [`SecureBootImageHeader`] carries the secure-boot
/// magic and a non-zero version.
pub fn classify(kind: ImageKind, image: &[u8]) -> SecureCheckResult<EncryptionState> {
    if image.is_empty() {
        return Err(SecureCheckError::EmptyImage { image: kind });
    }

    match kind {
        ImageKind::Bootloader => classify_bootloader(image),
        ImageKind::Boot | ImageKind::Recovery => classify_secure_boot_image(kind, image),
    }
}

fn classify_bootloader(image: &[u8]) -> SecureCheckResult<EncryptionState> {
    let end = BOOTLOADER_MARKER_OFFSET + UNENCRYPTED_BOOTLOADER_MARKER.len();
    let marker = image
        .get(BOOTLOADER_MARKER_OFFSET..end)
        .ok_or(SecureCheckError::ImageTooShort {
            image: ImageKind::Bootloader,
            len: image.len(),
            required: end,
        })?;

    debug!("bootloader marker at {BOOTLOADER_MARKER_OFFSET:#x}: {marker:02x?}");

    if marker == UNENCRYPTED_BOOTLOADER_MARKER {
        Ok(EncryptionState::Unencrypted)
    } else {
        Ok(EncryptionState::Encrypted)
    }
}

fn classify_secure_boot_image(
    kind: ImageKind,
    image: &[u8],
) -> SecureCheckResult<EncryptionState> {
    let header = SecureBootImageHeader::parse(image).ok_or(SecureCheckError::ImageTooShort {
        image: kind,
        len: image.len(),
        required: SecureBootImageHeader::SIZE,
    })?;

    debug!(
        "{kind}: magic:{}, version:{:#06x}, totalLenAfterEncrypted:{:#x}",
        String::from_utf8_lossy(header.magic()),
        header.version(),
        header.total_len_after_encrypted()
    );

    if header.is_encrypted() {
        Ok(EncryptionState::Encrypted)
    } else {
        Ok(EncryptionState::Unencrypted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zerocopy::IntoBytes;

    fn bootloader_with_marker(marker: &[u8; 8]) -> Vec<u8> {
        let mut image = vec![0u8; 0x1000];
        image[BOOTLOADER_MARKER_OFFSET..BOOTLOADER_MARKER_OFFSET + 8].copy_from_slice(marker);
        image
    }

    fn secure_boot_image(version: u32) -> Vec<u8> {
        let mut image = SecureBootImageHeader::new_encrypted(version, 0x800)
            .as_bytes()
            .to_vec();
        image.resize(0x800, 0x5A);
        image
    }

    #[test]
    fn bootloader_marker_bytes() {
        assert_eq!(
            UNENCRYPTED_BOOTLOADER_MARKER,
            [0x4D, 0x33, 0x48, 0x48, 0x52, 0x45, 0x56, 0x30]
        );
    }

    #[test]
    fn bootloader_marker_means_unencrypted() {
        let image = bootloader_with_marker(&UNENCRYPTED_BOOTLOADER_MARKER);
        assert_eq!(
            classify(ImageKind::Bootloader, &image).unwrap(),
            EncryptionState::Unencrypted
        );
    }

    #[test]
    fn bootloader_without_marker_means_encrypted() {
        let mut marker = UNENCRYPTED_BOOTLOADER_MARKER;
        marker[7] ^= 0x01;
        let image = bootloader_with_marker(&marker);
        assert_eq!(
            classify(ImageKind::Bootloader, &image).unwrap(),
            EncryptionState::Encrypted
        );
    }

    #[test]
    fn bootloader_shorter_than_marker_is_rejected() {
        let err = classify(ImageKind::Bootloader, &[0u8; 0x1b4]).unwrap_err();
        assert!(matches!(
            err,
            SecureCheckError::ImageTooShort {
                image: ImageKind::Bootloader,
                len: 0x1b4,
                required: 0x1b8,
            }
        ));
    }

    #[test]
    fn magic_and_version_mean_encrypted() {
        for kind in [ImageKind::Boot, ImageKind::Recovery] {
            assert_eq!(
                classify(kind, &secure_boot_image(0x1)).unwrap(),
                EncryptionState::Encrypted
            );
        }
    }

    #[test]
    fn zero_version_means_unencrypted() {
        assert_eq!(
            classify(ImageKind::Boot, &secure_boot_image(0)).unwrap(),
            EncryptionState::Unencrypted
        );
    }

    #[test]
    fn missing_magic_means_unencrypted() {
        let mut image = secure_boot_image(0x1);
        image[1024..1032].copy_from_slice(b"ANDROID!");
        assert_eq!(
            classify(ImageKind::Recovery, &image).unwrap(),
            EncryptionState::Unencrypted
        );
    }

    #[test]
    fn header_sized_image_is_accepted() {
        let image = SecureBootImageHeader::new_encrypted(2, 0).as_bytes().to_vec();
        assert_eq!(
            classify(ImageKind::Boot, &image).unwrap(),
            EncryptionState::Encrypted
        );
    }

    #[test]
    fn undersized_boot_image_is_rejected() {
        let err = classify(ImageKind::Boot, &[0u8; 512]).unwrap_err();
        assert!(matches!(
            err,
            SecureCheckError::ImageTooShort {
                image: ImageKind::Boot,
                required: 1040,
                ..
            }
        ));
    }

    #[test]
    fn empty_image_is_rejected() {
        for kind in ImageKind::ALL {
            assert!(matches!(
                classify(kind, &[]),
                Err(SecureCheckError::EmptyImage { image }) if image == kind
            ));
        }
    }

    #[test]
    fn classification_is_idempotent() {
        let images = [
            (ImageKind::Bootloader, bootloader_with_marker(&UNENCRYPTED_BOOTLOADER_MARKER)),
            (ImageKind::Bootloader, vec![0xFF; 0x400]),
            (ImageKind::Boot, secure_boot_image(1)),
            (ImageKind::Recovery, secure_boot_image(0)),
        ];
        for (kind, image) in images {
            assert_eq!(
                classify(kind, &image).unwrap(),
                classify(kind, &image).unwrap()
            );
        }
    }
}
