//! Key sets and the resolution logic that picks which candidate keys to
//! try when verifying a signature or decrypting a ciphertext.
//!
//! Resolution is the same shape for both operations: an exact `kid` match
//! when the protected header names one, otherwise a trial loop over every
//! key whose type matches what the header's algorithm requires. The trial
//! loop reports how many keys it tried and the error of the last attempt
//! only; earlier failures are emitted as `tracing` events as they happen.
//!
//! An empty key set always fails fast, before any primitive is invoked.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::jose::{
    JWK, JWT, JoseError, Result,
    jwa::key_type_for,
    jwe::CompactJwe,
};

/// Capabilities and defects of the cryptographic primitive provider,
/// resolved once and consulted by the resolution loops.
///
/// Some providers are known to invalidate their internal signature state
/// when a verification fails, making any further use of the same signed
/// representation undefined. With
/// [`poisons_handle_on_failed_verify`](Self::assume_poisoned_verify_state)
/// set, the verify loop invalidates the token's signature handle at the
/// first failed attempt and stops trying further keys instead of reusing
/// the handle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProviderProfile {
    poisons_handle_on_failed_verify: bool,
}

impl ProviderProfile {
    /// The profile of the in-tree provider (aws-lc-rs), whose signature
    /// verification is stateless: a failed verify leaves the signed
    /// representation untouched and the trial loop may continue.
    pub fn detect() -> Self {
        Self::default()
    }

    /// Profile for a provider that corrupts its own verification state on
    /// failure.
    pub fn assume_poisoned_verify_state() -> Self {
        Self {
            poisons_handle_on_failed_verify: true,
        }
    }

    /// Whether a failed verification must invalidate the signature handle.
    pub fn poisons_handle_on_failed_verify(&self) -> bool {
        self.poisons_handle_on_failed_verify
    }
}

/// An owned collection of [`JWK`]s indexed by their kid.
///
/// Keys are unique per kid (inserting a second key under the same kid
/// replaces the first); iteration order is unspecified. Dropping the set
/// drops every key in it.
#[derive(Debug, Default)]
pub struct KeySet {
    keys: HashMap<String, JWK>,
    profile: ProviderProfile,
}

impl KeySet {
    /// Create an empty key set with the detected provider profile.
    pub fn new() -> Self {
        Self::with_profile(ProviderProfile::detect())
    }

    /// Create an empty key set with an explicit provider profile.
    pub fn with_profile(profile: ProviderProfile) -> Self {
        Self {
            keys: HashMap::new(),
            profile,
        }
    }

    /// Insert a key, indexed by its kid.
    ///
    /// Keys without a kid cannot be resolved and are rejected.
    pub fn insert(&mut self, jwk: JWK) -> Result<()> {
        let Some(kid) = jwk.kid() else {
            return Err(JoseError::input("cannot insert a JWK without a kid"));
        };
        self.keys.insert(kid.to_owned(), jwk);
        Ok(())
    }

    /// Look up a key by exact kid.
    pub fn get(&self, kid: &str) -> Option<&JWK> {
        self.keys.get(kid)
    }

    /// Number of keys in the set.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the set holds no keys.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Iterate over the keys, in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &JWK> {
        self.keys.values()
    }

    /// Decrypt a compact JWE with a key from this set, returning the
    /// plaintext.
    ///
    /// When the input does not parse as a JWE at all it is returned
    /// unchanged, unless `must_succeed` is set, which turns that into an
    /// error. This supports deployments where encryption is optional and
    /// tokens may arrive bare.
    pub fn decrypt(&self, input: &str, must_succeed: bool) -> Result<String> {
        let jwe = match CompactJwe::import(input) {
            Ok(jwe) => jwe,
            Err(err) => {
                if must_succeed {
                    return Err(err);
                }
                trace!("input is not a JWE, passing through unchanged");
                return Ok(input.to_owned());
            }
        };

        let plaintext = self.decrypt_imported(&jwe)?;
        String::from_utf8(plaintext)
            .map_err(|_| JoseError::input("decrypted content is not valid UTF-8"))
    }

    fn decrypt_imported(&self, jwe: &CompactJwe) -> Result<Vec<u8>> {
        if self.keys.is_empty() {
            return Err(JoseError::NoKeysConfigured);
        }

        let algorithm = jwe
            .alg()
            .ok_or_else(|| JoseError::input("JWE protected header misses \"alg\""))?;

        if let Some(kid) = jwe.kid() {
            let jwk = self
                .keys
                .get(kid)
                .ok_or_else(|| JoseError::KeyNotFound(kid.to_owned()))?;
            return jwe.decrypt(jwk);
        }

        let wanted = key_type_for(algorithm);
        let mut tried = 0;
        let mut last: Option<JoseError> = None;
        for jwk in self.keys.values() {
            if Some(jwk.key_type()) != wanted {
                continue;
            }
            tried += 1;
            match jwe.decrypt(jwk) {
                Ok(plaintext) => return Ok(plaintext),
                Err(err) => {
                    debug!(kid = ?jwk.kid(), %err, "decryption attempt failed");
                    last = Some(err);
                }
            }
        }

        Err(keys_exhausted("decryption", algorithm, tried, last))
    }

    /// Verify the signature on a parsed token with a key from this set.
    ///
    /// With a `kid` in the header: one exact-match attempt. Without one:
    /// a trial loop over all keys of the algorithm's key type. When the
    /// provider profile declares poisoned verify state, the first failed
    /// attempt invalidates the token's signature handle and ends the loop.
    pub fn verify(&self, jwt: &mut JWT) -> Result<()> {
        if self.keys.is_empty() {
            return Err(JoseError::NoKeysConfigured);
        }

        let algorithm = jwt.algorithm().to_owned();

        if let Some(kid) = jwt.kid().map(str::to_owned) {
            let jwk = self
                .keys
                .get(&kid)
                .ok_or_else(|| JoseError::KeyNotFound(kid.clone()))?;
            let outcome = jwt.try_verify_with(jwk);
            if outcome.is_err() && self.profile.poisons_handle_on_failed_verify() {
                jwt.invalidate_signature();
            }
            return outcome;
        }

        let wanted = key_type_for(&algorithm);
        let mut tried = 0;
        let mut last: Option<JoseError> = None;
        for jwk in self.keys.values() {
            if Some(jwk.key_type()) != wanted {
                continue;
            }
            tried += 1;
            match jwt.try_verify_with(jwk) {
                Ok(()) => return Ok(()),
                Err(err) => {
                    debug!(kid = ?jwk.kid(), %err, "verification attempt failed");
                    last = Some(err);
                    if self.profile.poisons_handle_on_failed_verify() {
                        // the handle is no longer trustworthy, stop here
                        jwt.invalidate_signature();
                        break;
                    }
                }
            }
            if !jwt.has_signature() {
                break;
            }
        }

        Err(keys_exhausted(
            "signature verification",
            &algorithm,
            tried,
            last,
        ))
    }
}

fn keys_exhausted(
    operation: &'static str,
    algorithm: &str,
    tried: usize,
    last: Option<JoseError>,
) -> JoseError {
    JoseError::KeysExhausted {
        operation,
        tried,
        last: match last {
            Some(err) => err.to_string(),
            None => format!(
                "no configured key matches the key type required by algorithm {algorithm:?}"
            ),
        },
    }
}
