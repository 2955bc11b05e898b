//! Compact JWS backend.
//!
//! [`CompactJws`] is the opaque signed representation a [`JWT`] holds on
//! to: the exact signing input (protected header and payload as they were
//! base64url-encoded on the wire), the raw signature bytes, and owned
//! decoded copies of header and payload. Keeping the encoded signing
//! input around means re-verification and re-serialization never have to
//! re-encode anything.
//!
//! Signing and verification dispatch on the `alg` header and the key
//! material type; offering key material of the wrong family for an
//! algorithm is rejected before any primitive is invoked.
//!
//! [`JWT`]: crate::jose::JWT

use aws_lc_rs::{
    hmac,
    rand::SystemRandom,
    signature::{
        RSA_PKCS1_2048_8192_SHA256, RSA_PKCS1_2048_8192_SHA384, RSA_PKCS1_2048_8192_SHA512,
        RSA_PKCS1_SHA256, RSA_PKCS1_SHA384, RSA_PKCS1_SHA512, RSA_PSS_2048_8192_SHA256,
        RSA_PSS_2048_8192_SHA384, RSA_PSS_2048_8192_SHA512, RSA_PSS_SHA256, RSA_PSS_SHA384,
        RSA_PSS_SHA512, RsaEncoding, RsaParameters, RsaPublicKeyComponents,
    },
};
use base64::{Engine as _, prelude::BASE64_URL_SAFE_NO_PAD};
use serde_json::{Map, Value};

#[cfg(feature = "ecdsa")]
use aws_lc_rs::signature::UnparsedPublicKey;

use crate::jose::{
    JWK, JoseError, Result,
    jwa::alg,
    jwk::KeyMaterial,
};

/// A parsed or freshly computed compact JWS.
#[derive(Debug, Clone)]
pub(crate) struct CompactJws {
    /// `base64url(header) "." base64url(payload)`, byte-exact as signed.
    signing_input: String,
    /// Raw (decoded) signature bytes; empty for unsigned tokens.
    signature: Vec<u8>,
    /// Owned copy of the decoded protected header.
    header: Map<String, Value>,
    /// Decoded payload bytes.
    payload: Vec<u8>,
}

impl CompactJws {
    /// Import a compact serialization: three dot-separated base64url
    /// segments, of which the signature segment may be empty.
    pub(crate) fn import(compact: &str) -> Result<Self> {
        let mut segments = compact.split('.');
        let (Some(header_b64), Some(payload_b64), Some(signature_b64), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(JoseError::input(
                "compact JWS must consist of exactly 3 dot-separated segments",
            ));
        };

        let header_bytes = BASE64_URL_SAFE_NO_PAD
            .decode(header_b64)
            .map_err(|err| JoseError::input(format!("protected header segment: {err}")))?;
        let header: Value = serde_json::from_slice(&header_bytes)
            .map_err(|err| JoseError::input(format!("protected header is not valid JSON: {err}")))?;
        let Value::Object(header) = header else {
            return Err(JoseError::input("protected header is not a JSON object"));
        };
        if !header.contains_key("alg") {
            return Err(JoseError::input("protected header misses \"alg\""));
        }

        let payload = BASE64_URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|err| JoseError::input(format!("payload segment: {err}")))?;
        let signature = BASE64_URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|err| JoseError::input(format!("signature segment: {err}")))?;

        Ok(Self {
            signing_input: format!("{header_b64}.{payload_b64}"),
            signature,
            header,
            payload,
        })
    }

    /// Sign `payload` under `header` with the given key, producing the
    /// compact representation.
    pub(crate) fn sign(header: &Map<String, Value>, payload: &[u8], jwk: &JWK) -> Result<Self> {
        let algorithm = header
            .get("alg")
            .and_then(Value::as_str)
            .ok_or_else(|| JoseError::input("protected header misses \"alg\""))?
            .to_owned();

        let header_bytes = serde_json::to_vec(header)
            .map_err(|err| JoseError::input(format!("could not serialize header: {err}")))?;
        let signing_input = format!(
            "{}.{}",
            BASE64_URL_SAFE_NO_PAD.encode(header_bytes),
            BASE64_URL_SAFE_NO_PAD.encode(payload)
        );

        let signature = sign_bytes(jwk, &algorithm, signing_input.as_bytes())?;

        Ok(Self {
            signing_input,
            signature,
            header: header.clone(),
            payload: payload.to_vec(),
        })
    }

    /// Re-emit the compact serialization.
    pub(crate) fn export(&self) -> String {
        format!(
            "{}.{}",
            self.signing_input,
            BASE64_URL_SAFE_NO_PAD.encode(&self.signature)
        )
    }

    /// Verify the stored signature over the stored signing input.
    pub(crate) fn verify(&self, jwk: &JWK) -> Result<()> {
        let algorithm = self
            .header
            .get("alg")
            .and_then(Value::as_str)
            .ok_or_else(|| JoseError::input("protected header misses \"alg\""))?;
        verify_bytes(
            jwk,
            algorithm,
            self.signing_input.as_bytes(),
            &self.signature,
        )
    }

    pub(crate) fn header(&self) -> &Map<String, Value> {
        &self.header
    }

    pub(crate) fn payload(&self) -> &[u8] {
        &self.payload
    }
}

/// Compute a signature over `data` with the key and algorithm combination,
/// rejecting mismatched key families up front.
fn sign_bytes(jwk: &JWK, algorithm: &str, data: &[u8]) -> Result<Vec<u8>> {
    match algorithm {
        alg::HS256 | alg::HS384 | alg::HS512 => {
            let KeyMaterial::Octet(secret) = jwk.material() else {
                return Err(key_type_confusion(algorithm, "a symmetric", jwk));
            };
            let key = hmac::Key::new(hmac_algorithm(algorithm)?, secret);
            Ok(hmac::sign(&key, data).as_ref().to_vec())
        }
        alg::RS256 | alg::RS384 | alg::RS512 | alg::PS256 | alg::PS384 | alg::PS512 => {
            let KeyMaterial::Rsa(rsa) = jwk.material() else {
                return Err(key_type_confusion(algorithm, "an RSA", jwk));
            };
            let Some(private) = &rsa.private else {
                return Err(JoseError::crypto(format!(
                    "signing with {algorithm} requires an RSA private key"
                )));
            };
            let rng = SystemRandom::new();
            let mut signature = vec![0; private.key_pair.public_modulus_len()];
            private
                .key_pair
                .sign(rsa_signing_params(algorithm)?, &rng, data, &mut signature)
                .map_err(|_| JoseError::crypto(format!("{algorithm} signing")))?;
            Ok(signature)
        }
        #[cfg(feature = "ecdsa")]
        alg::ES256 | alg::ES384 | alg::ES512 => {
            let KeyMaterial::Ec(ec) = jwk.material() else {
                return Err(key_type_confusion(algorithm, "an elliptic-curve", jwk));
            };
            if ec.curve.alg_id() != algorithm {
                return Err(JoseError::UnsupportedAlgorithm(format!(
                    "{algorithm} does not match key curve {}",
                    ec.curve.as_str()
                )));
            }
            let Some(key_pair) = &ec.key_pair else {
                return Err(JoseError::crypto(format!(
                    "signing with {algorithm} requires an EC private key"
                )));
            };
            let rng = SystemRandom::new();
            let signature = key_pair
                .sign(&rng, data)
                .map_err(|_| JoseError::crypto(format!("{algorithm} signing")))?;
            Ok(signature.as_ref().to_vec())
        }
        other => Err(JoseError::UnsupportedAlgorithm(other.to_owned())),
    }
}

/// Verify `signature` over `data`, rejecting mismatched key families up
/// front. A verification failure reports the algorithm that failed; the
/// provider's own error carries no further detail.
fn verify_bytes(jwk: &JWK, algorithm: &str, data: &[u8], signature: &[u8]) -> Result<()> {
    match algorithm {
        alg::HS256 | alg::HS384 | alg::HS512 => {
            let KeyMaterial::Octet(secret) = jwk.material() else {
                return Err(key_type_confusion(algorithm, "a symmetric", jwk));
            };
            let key = hmac::Key::new(hmac_algorithm(algorithm)?, secret);
            hmac::verify(&key, data, signature)
                .map_err(|_| JoseError::crypto(format!("{algorithm} verification failed")))
        }
        alg::RS256 | alg::RS384 | alg::RS512 | alg::PS256 | alg::PS384 | alg::PS512 => {
            let KeyMaterial::Rsa(rsa) = jwk.material() else {
                return Err(key_type_confusion(algorithm, "an RSA", jwk));
            };
            let components = RsaPublicKeyComponents {
                n: rsa.n.as_slice(),
                e: rsa.e.as_slice(),
            };
            components
                .verify(rsa_verification_params(algorithm)?, data, signature)
                .map_err(|_| JoseError::crypto(format!("{algorithm} verification failed")))
        }
        #[cfg(feature = "ecdsa")]
        alg::ES256 | alg::ES384 | alg::ES512 => {
            let KeyMaterial::Ec(ec) = jwk.material() else {
                return Err(key_type_confusion(algorithm, "an elliptic-curve", jwk));
            };
            if ec.curve.alg_id() != algorithm {
                return Err(JoseError::UnsupportedAlgorithm(format!(
                    "{algorithm} does not match key curve {}",
                    ec.curve.as_str()
                )));
            }
            UnparsedPublicKey::new(ec.curve.verification_algorithm(), &ec.point)
                .verify(data, signature)
                .map_err(|_| JoseError::crypto(format!("{algorithm} verification failed")))
        }
        other => Err(JoseError::UnsupportedAlgorithm(other.to_owned())),
    }
}

fn key_type_confusion(algorithm: &str, wanted: &str, jwk: &JWK) -> JoseError {
    JoseError::UnsupportedAlgorithm(format!(
        "{algorithm} requires {wanted} key, got key type {}",
        jwk.key_type()
    ))
}

fn hmac_algorithm(algorithm: &str) -> Result<hmac::Algorithm> {
    match algorithm {
        alg::HS256 => Ok(hmac::HMAC_SHA256),
        alg::HS384 => Ok(hmac::HMAC_SHA384),
        alg::HS512 => Ok(hmac::HMAC_SHA512),
        other => Err(JoseError::UnsupportedAlgorithm(other.to_owned())),
    }
}

fn rsa_signing_params(algorithm: &str) -> Result<&'static dyn RsaEncoding> {
    match algorithm {
        alg::RS256 => Ok(&RSA_PKCS1_SHA256),
        alg::RS384 => Ok(&RSA_PKCS1_SHA384),
        alg::RS512 => Ok(&RSA_PKCS1_SHA512),
        alg::PS256 => Ok(&RSA_PSS_SHA256),
        alg::PS384 => Ok(&RSA_PSS_SHA384),
        alg::PS512 => Ok(&RSA_PSS_SHA512),
        other => Err(JoseError::UnsupportedAlgorithm(other.to_owned())),
    }
}

fn rsa_verification_params(algorithm: &str) -> Result<&'static RsaParameters> {
    match algorithm {
        alg::RS256 => Ok(&RSA_PKCS1_2048_8192_SHA256),
        alg::RS384 => Ok(&RSA_PKCS1_2048_8192_SHA384),
        alg::RS512 => Ok(&RSA_PKCS1_2048_8192_SHA512),
        alg::PS256 => Ok(&RSA_PSS_2048_8192_SHA256),
        alg::PS384 => Ok(&RSA_PSS_2048_8192_SHA384),
        alg::PS512 => Ok(&RSA_PSS_2048_8192_SHA512),
        other => Err(JoseError::UnsupportedAlgorithm(other.to_owned())),
    }
}
