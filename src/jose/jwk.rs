use std::fmt;

use aws_lc_rs::{digest, rsa, signature::KeyPair as _};
use base64::{Engine as _, prelude::BASE64_URL_SAFE_NO_PAD};
use serde::Deserialize;
use serde_json::{Map, Value};
use zeroize::Zeroizing;

#[cfg(feature = "ecdsa")]
use aws_lc_rs::signature::{
    ECDSA_P256_SHA256_FIXED, ECDSA_P256_SHA256_FIXED_SIGNING, ECDSA_P384_SHA384_FIXED,
    ECDSA_P384_SHA384_FIXED_SIGNING, ECDSA_P521_SHA512_FIXED, ECDSA_P521_SHA512_FIXED_SIGNING,
    EcdsaKeyPair, EcdsaSigningAlgorithm, EcdsaVerificationAlgorithm,
};

#[cfg(feature = "ecdsa")]
use crate::jose::jwa::alg;
use crate::jose::{
    JoseError, KeyType, Result,
    jwk_utils::{strip_leading_zeroes, wrap_pkcs1_in_pkcs8},
    x509,
};

#[derive(Debug)]
/// [`JWK`] or JSON Web Key as defined in [`rfc7517`].
///
/// A `JWK` owns its key material exclusively; dropping the `JWK` releases
/// it (zeroizing secrets), and there is no way to observe it half-built:
/// every constructor either returns a complete key or an error.
///
/// The `kid` is either supplied by the caller (used verbatim) or derived
/// deterministically from the key material: base64url(SHA-256(fingerprint)),
/// where the fingerprint is the raw secret for symmetric keys and
/// modulus‖exponent for RSA keys. Keys parsed from JWK JSON keep whatever
/// `kid` the document carries, including none at all.
///
/// [`rfc7517`]: https://datatracker.ietf.org/doc/html/rfc7517
pub struct JWK {
    kid: Option<String>,
    key: KeyMaterial,
    x5c: Vec<String>,
    x5t: Option<String>,
    x5t_s256: Option<String>,
}

/// The actual key bytes or provider key handles backing a [`JWK`].
pub(crate) enum KeyMaterial {
    Octet(Zeroizing<Vec<u8>>),
    Rsa(RsaKeyMaterial),
    #[cfg(feature = "ecdsa")]
    Ec(EcKeyMaterial),
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // key bytes must never end up in logs
        match self {
            Self::Octet(_) => f.write_str("KeyMaterial::Octet"),
            Self::Rsa(rsa) => write!(
                f,
                "KeyMaterial::Rsa {{ bits: {}, private: {} }}",
                rsa.n.len() * 8,
                rsa.private.is_some()
            ),
            #[cfg(feature = "ecdsa")]
            Self::Ec(ec) => write!(
                f,
                "KeyMaterial::Ec {{ crv: {}, private: {} }}",
                ec.curve.as_str(),
                ec.key_pair.is_some()
            ),
        }
    }
}

pub(crate) struct RsaKeyMaterial {
    /// Big-endian unsigned modulus bytes, leading zeroes stripped.
    pub(crate) n: Vec<u8>,
    /// Big-endian unsigned public exponent bytes, leading zeroes stripped.
    pub(crate) e: Vec<u8>,
    pub(crate) private: Option<RsaPrivateMaterial>,
}

impl RsaKeyMaterial {
    /// modulus‖exponent, the canonical kid fingerprint input for RSA keys.
    pub(crate) fn fingerprint(&self) -> Vec<u8> {
        let mut fingerprint = Vec::with_capacity(self.n.len() + self.e.len());
        fingerprint.extend_from_slice(&self.n);
        fingerprint.extend_from_slice(&self.e);
        fingerprint
    }
}

pub(crate) struct RsaPrivateMaterial {
    /// Signing handle.
    pub(crate) key_pair: rsa::KeyPair,
    /// PKCS#8 document the decryption handle is constructed from.
    pub(crate) pkcs8: Zeroizing<Vec<u8>>,
}

impl RsaPrivateMaterial {
    pub(crate) fn from_pkcs8(der: &[u8]) -> Result<Self> {
        let key_pair = rsa::KeyPair::from_pkcs8(der)
            .map_err(|err| JoseError::input(format!("invalid PKCS#8 RSA private key: {err}")))?;
        Ok(Self {
            key_pair,
            pkcs8: Zeroizing::new(der.to_vec()),
        })
    }

    pub(crate) fn from_pkcs1(der: &[u8]) -> Result<Self> {
        let key_pair = rsa::KeyPair::from_der(der)
            .map_err(|err| JoseError::input(format!("invalid PKCS#1 RSA private key: {err}")))?;
        Ok(Self {
            key_pair,
            pkcs8: Zeroizing::new(wrap_pkcs1_in_pkcs8(der)),
        })
    }

    /// Big-endian unsigned (modulus, exponent) of the embedded public key.
    pub(crate) fn public_components(&self) -> (Vec<u8>, Vec<u8>) {
        let public_key = self.key_pair.public_key();
        (
            public_key
                .modulus()
                .big_endian_without_leading_zero()
                .to_vec(),
            public_key
                .exponent()
                .big_endian_without_leading_zero()
                .to_vec(),
        )
    }
}

#[cfg(feature = "ecdsa")]
pub(crate) struct EcKeyMaterial {
    pub(crate) curve: EcCurve,
    /// Uncompressed SEC1 point: `0x04 ‖ x ‖ y`.
    pub(crate) point: Vec<u8>,
    pub(crate) key_pair: Option<EcdsaKeyPair>,
}

#[cfg(feature = "ecdsa")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EcCurve {
    P256,
    P384,
    P521,
}

#[cfg(feature = "ecdsa")]
impl EcCurve {
    pub(crate) fn from_crv(crv: &str) -> Option<Self> {
        match crv {
            "P-256" => Some(Self::P256),
            "P-384" => Some(Self::P384),
            "P-521" => Some(Self::P521),
            _ => None,
        }
    }

    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::P256 => "P-256",
            Self::P384 => "P-384",
            Self::P521 => "P-521",
        }
    }

    /// The signing algorithm identifier this curve is paired with.
    pub(crate) fn alg_id(&self) -> &'static str {
        match self {
            Self::P256 => alg::ES256,
            Self::P384 => alg::ES384,
            Self::P521 => alg::ES512,
        }
    }

    pub(crate) fn signing_algorithm(&self) -> &'static EcdsaSigningAlgorithm {
        match self {
            Self::P256 => &ECDSA_P256_SHA256_FIXED_SIGNING,
            Self::P384 => &ECDSA_P384_SHA384_FIXED_SIGNING,
            Self::P521 => &ECDSA_P521_SHA512_FIXED_SIGNING,
        }
    }

    pub(crate) fn verification_algorithm(&self) -> &'static EcdsaVerificationAlgorithm {
        match self {
            Self::P256 => &ECDSA_P256_SHA256_FIXED,
            Self::P384 => &ECDSA_P384_SHA384_FIXED,
            Self::P521 => &ECDSA_P521_SHA512_FIXED,
        }
    }
}

impl JWK {
    /// Create an `oct` (symmetric) key from raw secret bytes.
    ///
    /// Rejects empty secrets. The kid is the given one, or the SHA-256
    /// fingerprint of the secret bytes when none is given, so identical
    /// secrets always produce identical kids.
    pub fn new_symmetric(secret: impl Into<Vec<u8>>, kid: Option<&str>) -> Result<Self> {
        let secret = Zeroizing::new(secret.into());
        if secret.is_empty() {
            return Err(JoseError::input("symmetric key material must not be empty"));
        }
        let kid = set_or_generate_kid(kid, &secret);
        Ok(Self {
            kid: Some(kid),
            key: KeyMaterial::Octet(secret),
            x5c: Vec::new(),
            x5t: None,
            x5t_s256: None,
        })
    }

    /// Create a public RSA key from big-endian unsigned modulus and
    /// exponent bytes.
    pub fn new_rsa(n: impl Into<Vec<u8>>, e: impl Into<Vec<u8>>, kid: Option<&str>) -> Result<Self> {
        let n = n.into();
        let e = e.into();
        let n = strip_leading_zeroes(&n).to_vec();
        let e = strip_leading_zeroes(&e).to_vec();
        if n.is_empty() || e.is_empty() {
            return Err(JoseError::input(
                "RSA modulus and exponent must not be empty",
            ));
        }
        Ok(Self::from_rsa_material(
            RsaKeyMaterial {
                n,
                e,
                private: None,
            },
            kid,
        ))
    }

    /// Build a JWK around RSA key material, deriving the kid from the
    /// modulus‖exponent fingerprint when none is given.
    pub(crate) fn from_rsa_material(material: RsaKeyMaterial, kid: Option<&str>) -> Self {
        let kid = set_or_generate_kid(kid, &material.fingerprint());
        Self {
            kid: Some(kid),
            key: KeyMaterial::Rsa(material),
            x5c: Vec::new(),
            x5t: None,
            x5t_s256: None,
        }
    }

    /// Attach the certificate chain members extracted by the importer.
    pub(crate) fn with_certificate_chain(
        mut self,
        x5c: Vec<String>,
        x5t: Option<String>,
        x5t_s256: Option<String>,
    ) -> Self {
        self.x5c = x5c;
        self.x5t = x5t;
        self.x5t_s256 = x5t_s256;
        self
    }

    /// Parse a JWK from its JSON text representation.
    ///
    /// Supports `oct`, `RSA` (public components, or the `x5c`-only variant
    /// which is routed through the certificate importer) and, with the
    /// `ecdsa` feature, `EC` keys. Unlike the explicit constructors this
    /// keeps the `kid` exactly as found in the document.
    pub fn parse(s_json: &str) -> Result<Self> {
        let raw: RawJwk = serde_json::from_str(s_json)
            .map_err(|err| JoseError::input(format!("could not parse JWK JSON: {err}")))?;
        Self::from_raw(raw)
    }

    /// Parse a JWK from an already-parsed JSON value.
    pub fn parse_value(value: &Value) -> Result<Self> {
        let raw = RawJwk::deserialize(value)
            .map_err(|err| JoseError::input(format!("could not parse JWK JSON value: {err}")))?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawJwk) -> Result<Self> {
        match raw.kty.as_str() {
            "oct" => {
                let k = raw
                    .k
                    .as_deref()
                    .ok_or_else(|| JoseError::input("oct JWK misses the \"k\" member"))?;
                let secret = Zeroizing::new(BASE64_URL_SAFE_NO_PAD.decode(k).map_err(|err| {
                    JoseError::input(format!("oct JWK \"k\" is not valid base64url: {err}"))
                })?);
                if secret.is_empty() {
                    return Err(JoseError::input("symmetric key material must not be empty"));
                }
                Ok(Self {
                    kid: raw.kid,
                    key: KeyMaterial::Octet(secret),
                    x5c: raw.x5c.unwrap_or_default(),
                    x5t: raw.x5t,
                    x5t_s256: raw.x5t_s256,
                })
            }
            "RSA" => {
                if raw.d.is_some() {
                    return Err(JoseError::input(
                        "RSA private JWK parameters are not supported, import the key from PEM instead",
                    ));
                }
                match (&raw.n, &raw.e) {
                    (Some(n), Some(e)) => {
                        let n = decode_b64url_uint(n, "n")?;
                        let e = decode_b64url_uint(e, "e")?;
                        Ok(Self {
                            kid: raw.kid,
                            key: KeyMaterial::Rsa(RsaKeyMaterial {
                                n,
                                e,
                                private: None,
                            }),
                            x5c: raw.x5c.unwrap_or_default(),
                            x5t: raw.x5t,
                            x5t_s256: raw.x5t_s256,
                        })
                    }
                    _ => {
                        let first = raw
                            .x5c
                            .as_ref()
                            .and_then(|x5c| x5c.first())
                            .ok_or_else(|| {
                                JoseError::input(
                                    "RSA JWK carries neither modulus/exponent nor \"x5c\"",
                                )
                            })?;
                        x509::rsa_jwk_from_x5c(first, raw.kid.as_deref())
                    }
                }
            }
            "EC" => {
                #[cfg(feature = "ecdsa")]
                {
                    Self::ec_from_raw(raw)
                }
                #[cfg(not(feature = "ecdsa"))]
                {
                    Err(JoseError::UnsupportedAlgorithm(
                        "EC key type (built without the ecdsa capability)".into(),
                    ))
                }
            }
            other => Err(JoseError::UnsupportedAlgorithm(format!(
                "key type {other:?}"
            ))),
        }
    }

    #[cfg(feature = "ecdsa")]
    fn ec_from_raw(raw: RawJwk) -> Result<Self> {
        let crv = raw
            .crv
            .as_deref()
            .ok_or_else(|| JoseError::input("EC JWK misses the \"crv\" member"))?;
        let curve = EcCurve::from_crv(crv)
            .ok_or_else(|| JoseError::UnsupportedAlgorithm(format!("elliptic curve {crv:?}")))?;
        // coordinates are fixed-width, leading zero bytes are significant
        let x = decode_b64url(
            raw.x
                .as_deref()
                .ok_or_else(|| JoseError::input("EC JWK misses the \"x\" member"))?,
            "x",
        )?;
        let y = decode_b64url(
            raw.y
                .as_deref()
                .ok_or_else(|| JoseError::input("EC JWK misses the \"y\" member"))?,
            "y",
        )?;

        // uncompressed SEC1 point encoding
        let mut point = Vec::with_capacity(1 + x.len() + y.len());
        point.push(0x04);
        point.extend_from_slice(&x);
        point.extend_from_slice(&y);

        let key_pair = match raw.d.as_deref() {
            Some(d) => {
                let d = Zeroizing::new(BASE64_URL_SAFE_NO_PAD.decode(d).map_err(|err| {
                    JoseError::input(format!("EC JWK \"d\" is not valid base64url: {err}"))
                })?);
                Some(
                    EcdsaKeyPair::from_private_key_and_public_key(
                        curve.signing_algorithm(),
                        &d,
                        &point,
                    )
                    .map_err(|err| {
                        JoseError::input(format!("invalid EC private JWK parameters: {err}"))
                    })?,
                )
            }
            None => None,
        };

        Ok(Self {
            kid: raw.kid,
            key: KeyMaterial::Ec(EcKeyMaterial {
                curve,
                point,
                key_pair,
            }),
            x5c: raw.x5c.unwrap_or_default(),
            x5t: raw.x5t,
            x5t_s256: raw.x5t_s256,
        })
    }

    /// Serialize this JWK to its JSON text representation.
    ///
    /// Emits `kty`, `kid`, the public type-specific members and the
    /// certificate members (`x5c`, `x5t`, `x5t#S256`) in that order.
    /// Private key material is never serialized.
    pub fn to_json(&self) -> Result<String> {
        let mut map = Map::new();
        map.insert(
            "kty".to_owned(),
            Value::String(self.key_type().as_str().to_owned()),
        );
        if let Some(kid) = &self.kid {
            map.insert("kid".to_owned(), Value::String(kid.clone()));
        }
        match &self.key {
            KeyMaterial::Octet(k) => {
                map.insert(
                    "k".to_owned(),
                    Value::String(BASE64_URL_SAFE_NO_PAD.encode(k)),
                );
            }
            KeyMaterial::Rsa(rsa) => {
                map.insert(
                    "n".to_owned(),
                    Value::String(BASE64_URL_SAFE_NO_PAD.encode(&rsa.n)),
                );
                map.insert(
                    "e".to_owned(),
                    Value::String(BASE64_URL_SAFE_NO_PAD.encode(&rsa.e)),
                );
            }
            #[cfg(feature = "ecdsa")]
            KeyMaterial::Ec(ec) => {
                map.insert(
                    "crv".to_owned(),
                    Value::String(ec.curve.as_str().to_owned()),
                );
                let coordinate_len = (ec.point.len() - 1) / 2;
                let (x, y) = ec.point[1..].split_at(coordinate_len);
                map.insert(
                    "x".to_owned(),
                    Value::String(BASE64_URL_SAFE_NO_PAD.encode(x)),
                );
                map.insert(
                    "y".to_owned(),
                    Value::String(BASE64_URL_SAFE_NO_PAD.encode(y)),
                );
            }
        }
        if !self.x5c.is_empty() {
            map.insert(
                "x5c".to_owned(),
                Value::Array(
                    self.x5c
                        .iter()
                        .map(|cert| Value::String(cert.clone()))
                        .collect(),
                ),
            );
        }
        if let Some(x5t) = &self.x5t {
            map.insert("x5t".to_owned(), Value::String(x5t.clone()));
        }
        if let Some(x5t_s256) = &self.x5t_s256 {
            map.insert("x5t#S256".to_owned(), Value::String(x5t_s256.clone()));
        }
        serde_json::to_string(&map)
            .map_err(|err| JoseError::input(format!("could not serialize JWK: {err}")))
    }

    /// The key id, if any.
    pub fn kid(&self) -> Option<&str> {
        self.kid.as_deref()
    }

    /// The `kty` of the underlying key material.
    pub fn key_type(&self) -> KeyType {
        match &self.key {
            KeyMaterial::Octet(_) => KeyType::Octet,
            KeyMaterial::Rsa(_) => KeyType::Rsa,
            #[cfg(feature = "ecdsa")]
            KeyMaterial::Ec(_) => KeyType::EllipticCurve,
        }
    }

    /// The certificate chain (standard base64 DER, leaf first), empty when
    /// this key was not built from a certificate.
    pub fn x5c(&self) -> &[String] {
        &self.x5c
    }

    /// base64url SHA-1 thumbprint of the leaf certificate's DER bytes.
    pub fn x5t(&self) -> Option<&str> {
        self.x5t.as_deref()
    }

    /// base64url SHA-256 thumbprint of the leaf certificate's DER bytes.
    pub fn x5t_s256(&self) -> Option<&str> {
        self.x5t_s256.as_deref()
    }

    pub(crate) fn material(&self) -> &KeyMaterial {
        &self.key
    }
}

/// base64url encoding of the digest of `input`, the shape shared by kid
/// fingerprints and certificate thumbprints.
pub(crate) fn hash_and_base64url_encode(alg: &'static digest::Algorithm, input: &[u8]) -> String {
    BASE64_URL_SAFE_NO_PAD.encode(digest::digest(alg, input).as_ref())
}

/// Use the explicit kid verbatim, or fingerprint the key parameters.
pub(crate) fn set_or_generate_kid(explicit: Option<&str>, key_params: &[u8]) -> String {
    match explicit {
        Some(kid) => kid.to_owned(),
        None => hash_and_base64url_encode(&digest::SHA256, key_params),
    }
}

fn decode_b64url(encoded: &str, member: &str) -> Result<Vec<u8>> {
    BASE64_URL_SAFE_NO_PAD.decode(encoded).map_err(|err| {
        JoseError::input(format!("JWK member {member:?} is not valid base64url: {err}"))
    })
}

/// Decode a base64url big-endian unsigned integer member, normalizing
/// away leading zero bytes.
fn decode_b64url_uint(encoded: &str, member: &str) -> Result<Vec<u8>> {
    let bytes = decode_b64url(encoded, member)?;
    Ok(strip_leading_zeroes(&bytes).to_vec())
}

#[cfg_attr(not(feature = "ecdsa"), allow(dead_code))]
#[derive(Deserialize)]
struct RawJwk {
    kty: String,
    kid: Option<String>,
    k: Option<String>,
    n: Option<String>,
    e: Option<String>,
    d: Option<String>,
    crv: Option<String>,
    x: Option<String>,
    y: Option<String>,
    x5c: Option<Vec<String>>,
    x5t: Option<String>,
    #[serde(rename = "x5t#S256")]
    x5t_s256: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"a-symmetric-signing-secret-32byte";
    // independently computed: base64url(sha256(SECRET))
    const SECRET_KID: &str = "IFAZE5uoBGuRkD1BpmmhBMsCO4Y0rcYE3podPMjSCUE";

    #[test]
    fn symmetric_kid_is_deterministic() {
        let one = JWK::new_symmetric(SECRET, None).unwrap();
        let two = JWK::new_symmetric(SECRET, None).unwrap();
        assert_eq!(one.kid(), Some(SECRET_KID));
        assert_eq!(one.kid(), two.kid());
    }

    #[test]
    fn explicit_kid_is_used_verbatim() {
        let jwk = JWK::new_symmetric(SECRET, Some("my-kid")).unwrap();
        assert_eq!(jwk.kid(), Some("my-kid"));
    }

    #[test]
    fn empty_secret_is_rejected() {
        let err = JWK::new_symmetric(Vec::new(), None).unwrap_err();
        assert!(matches!(err, JoseError::InputFormat(_)));
    }

    #[test]
    fn parse_oct_jwk_keeps_document_kid() {
        let jwk = JWK::parse(r#"{"kty":"oct","kid":"sym1","k":"c2VjcmV0"}"#).unwrap();
        assert_eq!(jwk.kid(), Some("sym1"));
        assert_eq!(jwk.key_type(), KeyType::Octet);

        // no kid in the document means no kid on the key
        let jwk = JWK::parse(r#"{"kty":"oct","k":"c2VjcmV0"}"#).unwrap();
        assert_eq!(jwk.kid(), None);
    }

    #[test]
    fn parse_rsa_public_jwk() {
        let jwk = JWK::parse(r#"{"kty":"RSA","kid":"rsa1","n":"qqE","e":"AQAB"}"#).unwrap();
        assert_eq!(jwk.key_type(), KeyType::Rsa);
        assert_eq!(jwk.kid(), Some("rsa1"));
        let json = jwk.to_json().unwrap();
        assert!(json.starts_with(r#"{"kty":"RSA""#));
        assert!(json.contains(r#""e":"AQAB""#));
    }

    #[test]
    fn parse_rejects_unknown_kty() {
        let err = JWK::parse(r#"{"kty":"OKP","crv":"Ed25519","x":"qqE"}"#).unwrap_err();
        assert!(matches!(err, JoseError::UnsupportedAlgorithm(_)));
    }

    #[test]
    fn parse_rejects_rsa_private_parameters() {
        let err = JWK::parse(r#"{"kty":"RSA","n":"qqE","e":"AQAB","d":"qqE"}"#).unwrap_err();
        assert!(matches!(err, JoseError::InputFormat(_)));
    }

    #[test]
    fn parse_rejects_malformed_json() {
        let err = JWK::parse("{ not json").unwrap_err();
        assert!(matches!(err, JoseError::InputFormat(_)));
    }

    #[test]
    fn new_rsa_kid_fingerprint_is_deterministic() {
        let n = [0x00, 0xd1, 0x02, 0x03];
        let e = [0x01, 0x00, 0x01];
        let one = JWK::new_rsa(n, e, None).unwrap();
        let two = JWK::new_rsa([0xd1, 0x02, 0x03], e, None).unwrap();
        // leading-zero stripping makes both spell the same fingerprint
        assert_eq!(one.kid(), two.kid());
    }

    #[test]
    fn oct_round_trips_through_json() {
        let jwk = JWK::new_symmetric(SECRET, None).unwrap();
        let reparsed = JWK::parse(&jwk.to_json().unwrap()).unwrap();
        assert_eq!(reparsed.kid(), Some(SECRET_KID));
        assert_eq!(reparsed.key_type(), KeyType::Octet);
    }

    #[cfg(feature = "ecdsa")]
    #[test]
    fn parse_ec_public_jwk() {
        // RFC 7515 A.3 example key
        let jwk = JWK::parse(
            r#"{"kty":"EC","crv":"P-256",
                "x":"f83OJ3D2xF1Bg8vub9tLe1gHMzV76e8Tus9uPHvRVEU",
                "y":"x_FEzRu9m36HLN_tue659LNpXW6pCyStikYjKIWI5a0"}"#,
        )
        .unwrap();
        assert_eq!(jwk.key_type(), KeyType::EllipticCurve);
        assert_eq!(jwk.kid(), None);
        let json = jwk.to_json().unwrap();
        assert!(json.contains(r#""crv":"P-256""#));
    }
}
