// Licensed under the Apache-2.0 license

//! Extraction of boot-chain images from an OTA package.

use std::fs::File;
use std::io::{self, Read, Seek};
use std::path::Path;

use log::debug;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::{SecureCheckError, SecureCheckResult};
use crate::image::{ImageBuffer, ImageKind};

/// Source of package images.
///
/// `fetch` returns `Ok(None)` when the package does not carry the image, which
/// is not an error. Every returned image is a fresh allocation owned by the
/// caller.
pub trait ImageSource {
    type Image: AsRef<[u8]>;

    fn fetch(&mut self, kind: ImageKind) -> SecureCheckResult<Option<Self::Image>>;
}

impl<S: ImageSource + ?Sized> ImageSource for &mut S {
    type Image = S::Image;

    fn fetch(&mut self, kind: ImageKind) -> SecureCheckResult<Option<S::Image>> {
        (**self).fetch(kind)
    }
}

/// OTA package opened as a zip archive.
///
/// The archive (and the file behind it) is released when the package is
/// dropped.
pub struct ZipPackage<R> {
    archive: ZipArchive<R>,
}

impl ZipPackage<File> {
    pub fn open(path: &Path) -> SecureCheckResult<Self> {
        let file = File::open(path).map_err(|e| SecureCheckError::PackageOpen {
            path: path.to_path_buf(),
            source: ZipError::Io(e),
        })?;
        ZipArchive::new(file)
            .map(|archive| Self { archive })
            .map_err(|source| SecureCheckError::PackageOpen {
                path: path.to_path_buf(),
                source,
            })
    }
}

impl<R: Read + Seek> ZipPackage<R> {
    pub fn from_reader(reader: R) -> Result<Self, ZipError> {
        Ok(Self {
            archive: ZipArchive::new(reader)?,
        })
    }
}

impl<R: Read + Seek> ImageSource for ZipPackage<R> {
    type Image = ImageBuffer;

    fn fetch(&mut self, kind: ImageKind) -> SecureCheckResult<Option<ImageBuffer>> {
        let mut entry = match self.archive.by_name(kind.entry_name()) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(source) => return Err(SecureCheckError::EntryLookup { image: kind, source }),
        };

        let len = entry.size();
        let size = usize::try_from(len)
            .ok()
            .filter(|size| *size > 0)
            .ok_or(SecureCheckError::InvalidEntryLength { image: kind, len })?;

        // The declared size comes from the archive and is untrusted.
        let mut data = Vec::new();
        data.try_reserve_exact(size)
            .map_err(|_| SecureCheckError::InvalidEntryLength { image: kind, len })?;
        let read = entry
            .by_ref()
            .take(len)
            .read_to_end(&mut data)
            .map_err(|source| SecureCheckError::Extract { image: kind, source })?;
        if read != size {
            return Err(SecureCheckError::Extract {
                image: kind,
                source: io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("read {read:#x} of {size:#x} bytes"),
                ),
            });
        }

        let image = ImageBuffer::new(kind, data);
        debug!("get {} datas (size:{size:#x}) successful", image.kind());
        Ok(Some(image))
    }
}
