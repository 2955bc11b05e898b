//! Shared fixtures for the in-module test suites.

use crate::jose::{JWK, x509::rsa_jwk_from_pem};

pub(crate) const RSA_A_PKCS8: &[u8] = include_bytes!("../../testdata/rsa-a.pkcs8.pem");
pub(crate) const RSA_A_PUBLIC: &[u8] = include_bytes!("../../testdata/rsa-a.pub.pem");
pub(crate) const RSA_B_PUBLIC: &[u8] = include_bytes!("../../testdata/rsa-b.pub.pem");

const OCT_SECRET: &[u8] = b"a-symmetric-signing-secret-32byte";

/// A deterministic symmetric key; repeated calls yield the same key and kid.
pub(crate) fn oct_jwk() -> JWK {
    JWK::new_symmetric(OCT_SECRET, None).unwrap()
}

/// A deterministic symmetric key of exactly `len` bytes.
pub(crate) fn oct_jwk_len(len: usize) -> JWK {
    let secret: Vec<u8> = (0..len).map(|i| (i as u8).wrapping_mul(7).wrapping_add(3)).collect();
    JWK::new_symmetric(secret, None).unwrap()
}

/// The fixture RSA private key (signing + decryption capable).
pub(crate) fn rsa_private_jwk(kid: Option<&str>) -> JWK {
    rsa_jwk_from_pem(RSA_A_PKCS8, true, kid).unwrap()
}

/// The public half of [`rsa_private_jwk`].
pub(crate) fn rsa_public_jwk(kid: Option<&str>) -> JWK {
    rsa_jwk_from_pem(RSA_A_PUBLIC, false, kid).unwrap()
}

/// The public half of an unrelated RSA key.
pub(crate) fn rsa_b_public_jwk(kid: Option<&str>) -> JWK {
    rsa_jwk_from_pem(RSA_B_PUBLIC, false, kid).unwrap()
}

#[cfg(feature = "ecdsa")]
/// An EC P-256 private JWK (RFC 7515 appendix A.3 example key).
pub(crate) fn ec_private_jwk() -> JWK {
    JWK::parse(
        r#"{"kty":"EC","crv":"P-256",
            "x":"f83OJ3D2xF1Bg8vub9tLe1gHMzV76e8Tus9uPHvRVEU",
            "y":"x_FEzRu9m36HLN_tue659LNpXW6pCyStikYjKIWI5a0",
            "d":"jpsQnnGQmL-YBIffH1136cspYG6-0iY7X1fCE9-E9LI"}"#,
    )
    .unwrap()
}
