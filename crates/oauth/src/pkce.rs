use {
    base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD},
    rand::{TryRngCore, rngs::OsRng},
    sha2::{Digest, Sha256},
};

use crate::{
    error::{Error, Result},
    types::PkceChallenge,
};

/// Random bytes behind a code verifier (86 characters once encoded).
pub const VERIFIER_BYTES: usize = 64;
/// Random bytes behind a state token.
pub const STATE_BYTES: usize = 24;

/// URL-safe random string built from `size` bytes of OS entropy.
pub fn random_string(size: usize) -> Result<String> {
    let mut buf = vec![0u8; size];
    OsRng
        .try_fill_bytes(&mut buf)
        .map_err(|e| Error::Random(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(buf))
}

pub fn new_verifier() -> Result<String> {
    random_string(VERIFIER_BYTES)
}

pub fn new_state() -> Result<String> {
    random_string(STATE_BYTES)
}

/// base64url (no padding) of SHA-256 over the verifier.
pub fn challenge_for(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

pub fn generate() -> Result<PkceChallenge> {
    let verifier = new_verifier()?;
    let challenge = challenge_for(&verifier);
    Ok(PkceChallenge {
        verifier,
        challenge,
    })
}
