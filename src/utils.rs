use std::cmp::Ordering;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};

use crate::types::{Album, PkceChallenge};

/// Verifier length used for every login. Upper bound of the RFC 7636 range.
pub const CODE_VERIFIER_LEN: usize = 128;
pub const MIN_CODE_VERIFIER_LEN: usize = 43;

pub fn generate_code_verifier() -> String {
    generate_code_verifier_with(&mut rand::rng(), CODE_VERIFIER_LEN)
}

/// Draws a verifier of `len` characters from `[A-Za-z0-9]`.
///
/// `len` is clamped into the 43..=128 range accepted by the provider.
pub fn generate_code_verifier_with<R: Rng>(rng: &mut R, len: usize) -> String {
    let len = len.clamp(MIN_CODE_VERIFIER_LEN, CODE_VERIFIER_LEN);
    (0..len).map(|_| char::from(rng.sample(Alphanumeric))).collect()
}

/// SHA-256 of the verifier, base64url without padding.
pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

pub fn generate_challenge() -> PkceChallenge {
    generate_challenge_with(&mut rand::rng(), CODE_VERIFIER_LEN)
}

/// Same as [`generate_challenge`] with an injected random source.
pub fn generate_challenge_with<R: Rng>(rng: &mut R, len: usize) -> PkceChallenge {
    let verifier = generate_code_verifier_with(rng, len);
    let challenge = generate_code_challenge(&verifier);
    PkceChallenge {
        verifier,
        challenge,
    }
}

/// Year prefix of a provider release date (`YYYY`, `YYYY-MM` or `YYYY-MM-DD`).
pub fn release_year(release_date: &str) -> Option<i32> {
    let year = release_date.trim().get(..4)?;
    if !year.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    year.parse().ok()
}

/// Newest release first, then artist ascending.
pub fn sort_albums_by_release(albums: &mut [Album]) {
    albums.sort_by(|a, b| match b.release_date.cmp(&a.release_date) {
        Ordering::Equal => a.artist.cmp(&b.artist),
        other => other,
    });
}

/// Human readable `m:ss` for a track length.
pub fn format_duration_ms(duration_ms: u64) -> String {
    let secs = duration_ms / 1000;
    format!("{}:{:02}", secs / 60, secs % 60)
}
