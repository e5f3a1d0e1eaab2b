// Licensed under the Apache-2.0 license

//! Decides whether an image is acceptable on the running platform.

use log::debug;

use crate::error::{SecureCheckError, SecureCheckResult};
use crate::image::{EncryptionState, ImageKind};
use crate::verifier::SignatureVerifier;

/// Result of matching one image against the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// The verification channel could not decide.
    Failed,
    NoMatch,
    Match,
}

/// Applies the platform/image policy:
///
/// | platform    | image       | outcome                    |
/// |-------------|-------------|----------------------------|
/// | unencrypted | unencrypted | `Match`                    |
/// | unencrypted | encrypted   | `NoMatch`                  |
/// | encrypted   | unencrypted | `NoMatch`                  |
/// | encrypted   | encrypted   | answer of `verifier`       |
///
/// The verifier is consulted only in the last case and its answer is passed
/// through unchanged.
pub fn match_platform<V: SignatureVerifier + ?Sized>(
    platform: EncryptionState,
    image_state: EncryptionState,
    kind: ImageKind,
    image: &[u8],
    verifier: &mut V,
) -> SecureCheckResult<MatchOutcome> {
    if image.is_empty() {
        return Err(SecureCheckError::EmptyImage { image: kind });
    }

    let outcome = match (platform, image_state) {
        (EncryptionState::Unencrypted, EncryptionState::Unencrypted) => MatchOutcome::Match,
        (EncryptionState::Unencrypted, EncryptionState::Encrypted)
        | (EncryptionState::Encrypted, EncryptionState::Unencrypted) => MatchOutcome::NoMatch,
        (EncryptionState::Encrypted, EncryptionState::Encrypted) => {
            let outcome = verifier.verify(image);
            debug!("{kind}: verification channel answered {outcome:?}");
            outcome
        }
    };

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedVerifier {
        answer: MatchOutcome,
        calls: usize,
    }

    impl FixedVerifier {
        fn new(answer: MatchOutcome) -> Self {
            Self { answer, calls: 0 }
        }
    }

    impl SignatureVerifier for FixedVerifier {
        fn verify(&mut self, _image: &[u8]) -> MatchOutcome {
            self.calls += 1;
            self.answer
        }
    }

    #[test]
    fn policy_table() {
        use EncryptionState::*;

        let cases = [
            (Unencrypted, Unencrypted, MatchOutcome::Match, 0),
            (Unencrypted, Encrypted, MatchOutcome::NoMatch, 0),
            (Encrypted, Unencrypted, MatchOutcome::NoMatch, 0),
            (Encrypted, Encrypted, MatchOutcome::Failed, 1),
        ];

        for (platform, image_state, expected, calls) in cases {
            // The verifier's answer is distinct from every fixed outcome so
            // delegation is observable.
            let mut verifier = FixedVerifier::new(MatchOutcome::Failed);
            let outcome = match_platform(
                platform,
                image_state,
                ImageKind::Boot,
                &[0x11; 32],
                &mut verifier,
            )
            .unwrap();
            assert_eq!(outcome, expected, "{platform} platform, {image_state} image");
            assert_eq!(verifier.calls, calls);
        }
    }

    #[test]
    fn verifier_answer_passes_through() {
        for answer in [MatchOutcome::Match, MatchOutcome::NoMatch, MatchOutcome::Failed] {
            let mut verifier = FixedVerifier::new(answer);
            let outcome = match_platform(
                EncryptionState::Encrypted,
                EncryptionState::Encrypted,
                ImageKind::Recovery,
                &[0x22; 8],
                &mut verifier,
            )
            .unwrap();
            assert_eq!(outcome, answer);
        }
    }

    #[test]
    fn empty_image_is_rejected_before_delegation() {
        let mut verifier = FixedVerifier::new(MatchOutcome::Match);
        let err = match_platform(
            EncryptionState::Encrypted,
            EncryptionState::Encrypted,
            ImageKind::Bootloader,
            &[],
            &mut verifier,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SecureCheckError::EmptyImage {
                image: ImageKind::Bootloader
            }
        ));
        assert_eq!(verifier.calls, 0);
    }
}
