// Licensed under the Apache-2.0 license

//! Adapter over the kernel's image signature verification channel.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use log::{debug, warn};

use crate::matcher::MatchOutcome;

/// Byte count the channel reports when the image belongs to this platform.
const CHANNEL_MATCH: usize = 1;

/// Errno the channel reports when the image signature does not belong to this
/// platform.
const CHANNEL_NO_MATCH_ERRNO: i32 = libc::ENOENT;

/// Verifies an encrypted image against the platform-held key material.
///
/// Implementations return [`MatchOutcome::Failed`] when the verification
/// could not be performed at all, so that callers can tell "unavailable"
/// apart from "verified and does not match".
pub trait SignatureVerifier {
    fn verify(&mut self, image: &[u8]) -> MatchOutcome;
}

impl<V: SignatureVerifier + ?Sized> SignatureVerifier for &mut V {
    fn verify(&mut self, image: &[u8]) -> MatchOutcome {
        (**self).verify(image)
    }
}

/// Verification channel exposed by the defendkey driver.
///
/// Each verification opens the device, writes the whole image once and
/// closes the device again.
#[derive(Debug, Clone)]
pub struct DefendKeyChannel {
    path: PathBuf,
}

impl DefendKeyChannel {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SignatureVerifier for DefendKeyChannel {
    fn verify(&mut self, image: &[u8]) -> MatchOutcome {
        let mut channel = match OpenOptions::new().read(true).write(true).open(&self.path) {
            Ok(channel) => channel,
            Err(e) => {
                warn!("open {:?} failed ({e})", self.path);
                return MatchOutcome::Failed;
            }
        };

        let result = channel.write(image);
        debug!(
            "wrote {} bytes to {:?}: {result:?}",
            image.len(),
            self.path
        );
        outcome_from_write(result)
    }
}

/// Maps the result of the single channel write onto a match outcome.
fn outcome_from_write(result: std::io::Result<usize>) -> MatchOutcome {
    match result {
        Ok(CHANNEL_MATCH) => MatchOutcome::Match,
        Err(e) if e.raw_os_error() == Some(CHANNEL_NO_MATCH_ERRNO) => MatchOutcome::NoMatch,
        Ok(count) => {
            warn!("verification channel returned unexpected count {count}");
            MatchOutcome::Failed
        }
        Err(e) => {
            warn!("verification failed or not supported ({e})");
            MatchOutcome::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn write_results_map_to_outcomes() {
        assert_eq!(outcome_from_write(Ok(1)), MatchOutcome::Match);
        assert_eq!(
            outcome_from_write(Err(io::Error::from_raw_os_error(libc::ENOENT))),
            MatchOutcome::NoMatch
        );
        assert_eq!(outcome_from_write(Ok(0)), MatchOutcome::Failed);
        assert_eq!(outcome_from_write(Ok(4096)), MatchOutcome::Failed);
        assert_eq!(
            outcome_from_write(Err(io::Error::from_raw_os_error(libc::EINVAL))),
            MatchOutcome::Failed
        );
        assert_eq!(
            outcome_from_write(Err(io::Error::new(io::ErrorKind::Other, "no errno"))),
            MatchOutcome::Failed
        );
    }

    #[test]
    fn missing_channel_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut channel = DefendKeyChannel::new(dir.path().join("defendkey"));
        assert_eq!(channel.verify(&[0xAA; 16]), MatchOutcome::Failed);
    }

    #[test]
    fn regular_file_accepting_whole_image_fails() {
        // A plain file swallows every byte, which is not the match sentinel.
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut channel = DefendKeyChannel::new(file.path());
        assert_eq!(channel.verify(&[0xAA; 16]), MatchOutcome::Failed);
    }

    #[test]
    fn regular_file_accepting_one_byte_matches() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut channel = DefendKeyChannel::new(file.path());
        assert_eq!(channel.verify(&[0xAA]), MatchOutcome::Match);
    }
}
