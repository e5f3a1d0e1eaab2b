// Licensed under the Apache-2.0 license

use std::path::PathBuf;

use thiserror::Error;

use crate::image::ImageKind;

/// Coarse classification of a [`SecureCheckError`].
///
/// Every variant is fatal to the secure check. A platform/image mismatch is
/// not an error and is reported through [`crate::Verdict::Mismatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A kernel resource or the package file could not be opened or read.
    ResourceUnavailable,
    /// Package or image contents are corrupt, truncated or unrecognized.
    MalformedData,
    /// The verification channel refused or failed the request.
    ChannelFailure,
}

/// Errors that abort a secure check.
#[derive(Error, Debug)]
pub enum SecureCheckError {
    #[error("cannot access {path:?}")]
    ResourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("platform status {path:?} is empty")]
    EmptyPlatformStatus { path: PathBuf },

    /// The kernel reported `fail` or a token that is not recognized.
    #[error("platform encryption state is undetermined (status: {status:?})")]
    PlatformUndetermined { status: String },

    #[error("cannot open package {path:?}")]
    PackageOpen {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("cannot locate {image} in package")]
    EntryLookup {
        image: ImageKind,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("{image} has an invalid uncompressed length ({len})")]
    InvalidEntryLength { image: ImageKind, len: u64 },

    #[error("cannot extract {image} from package")]
    Extract {
        image: ImageKind,
        #[source]
        source: std::io::Error,
    },

    #[error("{image} buffer is empty")]
    EmptyImage { image: ImageKind },

    #[error("{image} is {len} bytes, at least {required} are required")]
    ImageTooShort {
        image: ImageKind,
        len: usize,
        required: usize,
    },

    #[error("verification channel failed for {image}")]
    VerificationFailed { image: ImageKind },
}

impl SecureCheckError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SecureCheckError::ResourceUnavailable { .. } => ErrorKind::ResourceUnavailable,
            SecureCheckError::PackageOpen { source, .. } => match source {
                zip::result::ZipError::Io(_) => ErrorKind::ResourceUnavailable,
                _ => ErrorKind::MalformedData,
            },
            SecureCheckError::EmptyPlatformStatus { .. }
            | SecureCheckError::PlatformUndetermined { .. }
            | SecureCheckError::EntryLookup { .. }
            | SecureCheckError::InvalidEntryLength { .. }
            | SecureCheckError::Extract { .. }
            | SecureCheckError::EmptyImage { .. }
            | SecureCheckError::ImageTooShort { .. } => ErrorKind::MalformedData,
            SecureCheckError::VerificationFailed { .. } => ErrorKind::ChannelFailure,
        }
    }

    /// Image the error concerns, if any.
    pub fn image(&self) -> Option<ImageKind> {
        match self {
            SecureCheckError::EntryLookup { image, .. }
            | SecureCheckError::InvalidEntryLength { image, .. }
            | SecureCheckError::Extract { image, .. }
            | SecureCheckError::EmptyImage { image }
            | SecureCheckError::ImageTooShort { image, .. }
            | SecureCheckError::VerificationFailed { image } => Some(*image),
            _ => None,
        }
    }
}

/// Result type for secure check operations
pub type SecureCheckResult<T> = std::result::Result<T, SecureCheckError>;
