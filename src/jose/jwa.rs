//! Algorithm metadata tables.
//!
//! Maps JWA algorithm identifiers (as defined in [`rfc7518`]) to the key
//! type they operate on, the digest they are built on and their fixed key
//! sizes, and enumerates the closed set of algorithms this crate supports.
//!
//! Identifiers are looked up as strings: an unknown identifier is simply
//! unsupported (`None` / `0` / `false`), never a hard error. Failing
//! because of an unknown algorithm is the business of the operation that
//! actually needs it.
//!
//! [`rfc7518`]: https://datatracker.ietf.org/doc/html/rfc7518

use std::fmt;

use aws_lc_rs::digest;

/// Algorithm identifiers carried in the JOSE `alg` header: signing
/// algorithms first, key-management algorithms after.
pub mod alg {
    /// RSASSA-PKCS1-v1_5 using SHA-256
    pub const RS256: &str = "RS256";
    /// RSASSA-PKCS1-v1_5 using SHA-384
    pub const RS384: &str = "RS384";
    /// RSASSA-PKCS1-v1_5 using SHA-512
    pub const RS512: &str = "RS512";
    /// RSASSA-PSS using SHA-256 and MGF1 with SHA-256
    pub const PS256: &str = "PS256";
    /// RSASSA-PSS using SHA-384 and MGF1 with SHA-384
    pub const PS384: &str = "PS384";
    /// RSASSA-PSS using SHA-512 and MGF1 with SHA-512
    pub const PS512: &str = "PS512";
    /// HMAC using SHA-256
    pub const HS256: &str = "HS256";
    /// HMAC using SHA-384
    pub const HS384: &str = "HS384";
    /// HMAC using SHA-512
    pub const HS512: &str = "HS512";
    /// ECDSA using P-256 and SHA-256
    pub const ES256: &str = "ES256";
    /// ECDSA using P-384 and SHA-384
    pub const ES384: &str = "ES384";
    /// ECDSA using P-521 and SHA-512
    pub const ES512: &str = "ES512";
    /// Unsigned (unsecured) tokens
    pub const NONE: &str = "none";

    /// RSAES-PKCS1-v1_5 key encryption
    pub const RSA1_5: &str = "RSA1_5";
    /// RSAES-OAEP key encryption
    pub const RSA_OAEP: &str = "RSA-OAEP";
    /// AES-128 key wrap
    pub const A128KW: &str = "A128KW";
    /// AES-192 key wrap
    pub const A192KW: &str = "A192KW";
    /// AES-256 key wrap
    pub const A256KW: &str = "A256KW";
    /// Direct use of a shared symmetric key
    pub const DIR: &str = "dir";
}

/// Content-encryption (JWE `enc`) algorithm identifiers.
pub mod enc {
    /// AES-128-CBC with HMAC-SHA-256 authentication
    pub const A128CBC_HS256: &str = "A128CBC-HS256";
    /// AES-192-CBC with HMAC-SHA-384 authentication
    pub const A192CBC_HS384: &str = "A192CBC-HS384";
    /// AES-256-CBC with HMAC-SHA-512 authentication
    pub const A256CBC_HS512: &str = "A256CBC-HS512";
    /// AES-256-GCM
    pub const A256GCM: &str = "A256GCM";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// The cryptographic key family an algorithm operates on, mirroring the
/// JWK `kty` member.
pub enum KeyType {
    /// An octet sequence: a symmetric key (`kty: oct`)
    Octet,
    /// An RSA key pair or public key (`kty: RSA`)
    Rsa,
    /// An elliptic-curve key (`kty: EC`)
    EllipticCurve,
}

impl KeyType {
    /// The JWK `kty` member value for this key type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Octet => "oct",
            Self::Rsa => "RSA",
            Self::EllipticCurve => "EC",
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The key type required by the given algorithm, or `None` when the
/// algorithm is not recognized.
///
/// `RS*`/`PS*` are matched by prefix so that e.g. `RSA-OAEP` and `RSA1_5`
/// resolve consistently with their exact entries.
pub fn key_type_for(alg: &str) -> Option<KeyType> {
    match alg {
        alg::DIR => Some(KeyType::Octet),
        alg::A128KW | alg::A192KW | alg::A256KW => Some(KeyType::Octet),
        alg::RSA1_5 | alg::RSA_OAEP => Some(KeyType::Rsa),
        _ if alg.starts_with("RS") || alg.starts_with("PS") => Some(KeyType::Rsa),
        _ if alg.starts_with("HS") => Some(KeyType::Octet),
        #[cfg(feature = "ecdsa")]
        _ if alg.starts_with("ES") => Some(KeyType::EllipticCurve),
        _ => None,
    }
}

/// The digest a signing algorithm is built on, or `None` for `none`,
/// key-management algorithms and unrecognized identifiers.
pub fn digest_for(alg: &str) -> Option<&'static digest::Algorithm> {
    match alg {
        alg::RS256 | alg::PS256 | alg::HS256 | alg::ES256 => Some(&digest::SHA256),
        alg::RS384 | alg::PS384 | alg::HS384 | alg::ES384 => Some(&digest::SHA384),
        alg::RS512 | alg::PS512 | alg::HS512 | alg::ES512 => Some(&digest::SHA512),
        _ => None,
    }
}

/// The fixed key (or hash output) size in bytes associated with an
/// algorithm, or `0` when the algorithm has no fixed size or is unknown.
pub fn key_size_for(alg: &str) -> usize {
    match alg {
        alg::A128KW => 16,
        alg::A192KW => 24,
        alg::A256KW => 32,
        alg::RS256 | alg::PS256 | alg::HS256 => 32,
        alg::RS384 | alg::PS384 | alg::HS384 => 48,
        alg::RS512 | alg::PS512 | alg::HS512 => 64,
        _ => 0,
    }
}

/// All signing algorithms this crate recognizes, in a stable order.
///
/// Includes `none`: an unsigned token is a valid, degenerate JWS.
pub fn supported_signing_algorithms() -> &'static [&'static str] {
    #[cfg(feature = "ecdsa")]
    {
        &[
            alg::RS256,
            alg::RS384,
            alg::RS512,
            alg::PS256,
            alg::PS384,
            alg::PS512,
            alg::HS256,
            alg::HS384,
            alg::HS512,
            alg::ES256,
            alg::ES384,
            alg::ES512,
            alg::NONE,
        ]
    }
    #[cfg(not(feature = "ecdsa"))]
    {
        &[
            alg::RS256,
            alg::RS384,
            alg::RS512,
            alg::PS256,
            alg::PS384,
            alg::PS512,
            alg::HS256,
            alg::HS384,
            alg::HS512,
            alg::NONE,
        ]
    }
}

/// All key-management (JWE `alg`) algorithms this crate recognizes.
pub fn supported_key_management_algorithms() -> &'static [&'static str] {
    &[
        alg::RSA1_5,
        alg::A128KW,
        alg::A192KW,
        alg::A256KW,
        alg::RSA_OAEP,
    ]
}

/// All content-encryption (JWE `enc`) algorithms this crate recognizes.
pub fn supported_content_encryption_algorithms() -> &'static [&'static str] {
    #[cfg(feature = "gcm")]
    {
        &[
            enc::A128CBC_HS256,
            enc::A192CBC_HS384,
            enc::A256CBC_HS512,
            enc::A256GCM,
        ]
    }
    #[cfg(not(feature = "gcm"))]
    {
        &[enc::A128CBC_HS256, enc::A192CBC_HS384, enc::A256CBC_HS512]
    }
}

/// Whether `alg` is a supported signing algorithm.
pub fn is_signing_supported(alg: &str) -> bool {
    supported_signing_algorithms().contains(&alg)
}

/// Whether `alg` is a supported key-management algorithm.
pub fn is_key_management_supported(alg: &str) -> bool {
    supported_key_management_algorithms().contains(&alg)
}

/// Whether `enc` is a supported content-encryption algorithm.
pub fn is_content_encryption_supported(enc: &str) -> bool {
    supported_content_encryption_algorithms().contains(&enc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_types_follow_algorithm_family() {
        assert_eq!(key_type_for(alg::RS256), Some(KeyType::Rsa));
        assert_eq!(key_type_for(alg::PS512), Some(KeyType::Rsa));
        assert_eq!(key_type_for(alg::RSA1_5), Some(KeyType::Rsa));
        assert_eq!(key_type_for(alg::RSA_OAEP), Some(KeyType::Rsa));
        assert_eq!(key_type_for(alg::HS384), Some(KeyType::Octet));
        assert_eq!(key_type_for(alg::A192KW), Some(KeyType::Octet));
        assert_eq!(key_type_for(alg::DIR), Some(KeyType::Octet));
        #[cfg(feature = "ecdsa")]
        assert_eq!(key_type_for(alg::ES256), Some(KeyType::EllipticCurve));
    }

    #[test]
    fn unknown_algorithms_are_unsupported_not_fatal() {
        assert_eq!(key_type_for("XYZ42"), None);
        assert!(digest_for("XYZ42").is_none());
        assert_eq!(key_size_for("XYZ42"), 0);
        assert!(!is_signing_supported("XYZ42"));
        assert!(!is_key_management_supported("XYZ42"));
        assert!(!is_content_encryption_supported("XYZ42"));
    }

    #[test]
    fn key_sizes_match_digest_strength() {
        assert_eq!(key_size_for(alg::A128KW), 16);
        assert_eq!(key_size_for(alg::A192KW), 24);
        assert_eq!(key_size_for(alg::A256KW), 32);
        assert_eq!(key_size_for(alg::HS256), 32);
        assert_eq!(key_size_for(alg::RS384), 48);
        assert_eq!(key_size_for(alg::PS512), 64);
        assert_eq!(key_size_for(alg::NONE), 0);
        assert_eq!(key_size_for(alg::RSA_OAEP), 0);
    }

    #[test]
    fn digest_output_lengths() {
        fn out_len(alg: &str) -> Option<usize> {
            digest_for(alg).map(|d| digest::digest(d, b"").as_ref().len())
        }
        assert_eq!(out_len(alg::RS256), Some(32));
        assert_eq!(out_len(alg::HS384), Some(48));
        assert_eq!(out_len(alg::PS512), Some(64));
        assert!(digest_for(alg::NONE).is_none());
        assert!(digest_for(alg::A128KW).is_none());
    }

    #[test]
    fn supported_lists_are_closed_sets() {
        assert!(is_signing_supported(alg::NONE));
        assert!(is_signing_supported(alg::HS256));
        assert!(!is_signing_supported(alg::DIR));
        assert!(is_key_management_supported(alg::RSA_OAEP));
        assert!(!is_key_management_supported(alg::DIR));
        assert!(is_content_encryption_supported(enc::A128CBC_HS256));
        #[cfg(feature = "gcm")]
        assert!(is_content_encryption_supported(enc::A256GCM));
        assert!(!is_content_encryption_supported(alg::HS256));
    }
}
