//! PEM / X.509 key import.
//!
//! Builds RSA [`JWK`]s out of PEM input: bare public keys
//! (`SubjectPublicKeyInfo`), private keys (PKCS#1 or PKCS#8), or X.509
//! certificates. Certificate input additionally populates the JWK's
//! `x5c` chain (standard base64 DER, leaf first) and the `x5t` /
//! `x5t#S256` thumbprints, all computed over the same leaf DER bytes.
//!
//! The importer accumulates everything into local draft values and only
//! assembles the [`JWK`] once the whole input has been processed: a
//! failure anywhere returns an error and nothing else.

use aws_lc_rs::digest;
use base64::{Engine as _, prelude::BASE64_STANDARD};
use tracing::{debug, trace};
use x509_parser::{
    pem::Pem,
    prelude::{FromDer, X509Certificate},
    public_key::PublicKey,
    x509::SubjectPublicKeyInfo,
};

use crate::jose::{
    JWK, JoseError, Result,
    constants::{
        CERT_PEM_BEGIN, CERT_PEM_END, CERT_PEM_LINE_WIDTH, PEM_LABEL_CERTIFICATE,
        PEM_LABEL_PRIVATE_KEY_PKCS1, PEM_LABEL_PRIVATE_KEY_PKCS8, PEM_LABEL_PUBLIC_KEY,
    },
    jwk::{RsaKeyMaterial, RsaPrivateMaterial, hash_and_base64url_encode},
    jwk_utils::strip_leading_zeroes,
};

/// Import an RSA key from PEM input into a [`JWK`].
///
/// With `is_private` set, the first PEM block must be an RSA private key
/// (`RSA PRIVATE KEY` or `PRIVATE KEY`). Otherwise the first block must be
/// a bare public key (`PUBLIC KEY`) or an X.509 certificate; for a
/// certificate, the embedded public key is extracted, `x5c[0]`/`x5t`/
/// `x5t#S256` are populated from the leaf DER, and any further
/// certificate blocks in the input are appended to `x5c` in the order
/// encountered, stopping silently at the first block that fails to decode.
///
/// The kid is the explicit one, or the SHA-256 fingerprint of
/// modulus‖exponent when none is given.
pub fn rsa_jwk_from_pem(input: &[u8], is_private: bool, kid: Option<&str>) -> Result<JWK> {
    let mut blocks = Pem::iter_from_buffer(input);
    let first = blocks
        .next()
        .ok_or_else(|| JoseError::input("no PEM block found in input"))?
        .map_err(|err| JoseError::input(format!("malformed PEM input: {err}")))?;

    if is_private {
        let material = rsa_private_material(&first)?;
        return Ok(JWK::from_rsa_material(material, kid));
    }

    match first.label.as_str() {
        PEM_LABEL_PUBLIC_KEY => {
            let (n, e) = rsa_components_from_spki_der(&first.contents)?;
            Ok(JWK::from_rsa_material(
                RsaKeyMaterial {
                    n,
                    e,
                    private: None,
                },
                kid,
            ))
        }
        PEM_LABEL_CERTIFICATE => {
            let (_, certificate) = X509Certificate::from_der(&first.contents)
                .map_err(|err| JoseError::input(format!("malformed X.509 certificate: {err}")))?;
            let (n, e) = rsa_components_from_certificate(&certificate)?;

            // leaf first; thumbprints are over the same DER bytes as x5c[0]
            let mut x5c = vec![BASE64_STANDARD.encode(&first.contents)];
            let x5t = hash_and_base64url_encode(&digest::SHA1_FOR_LEGACY_USE_ONLY, &first.contents);
            let x5t_s256 = hash_and_base64url_encode(&digest::SHA256, &first.contents);

            // consume the rest of the chain, in order; the first block that
            // is not a decodable certificate marks the end of the chain
            for block in blocks {
                let Ok(block) = block else { break };
                if block.label != PEM_LABEL_CERTIFICATE
                    || X509Certificate::from_der(&block.contents).is_err()
                {
                    break;
                }
                x5c.push(BASE64_STANDARD.encode(&block.contents));
            }
            debug!(chain_len = x5c.len(), "imported RSA certificate chain");

            Ok(
                JWK::from_rsa_material(
                    RsaKeyMaterial {
                        n,
                        e,
                        private: None,
                    },
                    kid,
                )
                .with_certificate_chain(x5c, Some(x5t), Some(x5t_s256)),
            )
        }
        other => Err(JoseError::input(format!(
            "PEM block {other:?} is neither a public key nor a certificate"
        ))),
    }
}

/// Import an RSA key from the `x5c`-only JWK variant:
/// `{"kty":"RSA","x5c":["<base64 DER>"]}`.
///
/// The bare base64 payload is rewrapped into standard certificate PEM
/// framing at 75-character line width and sent through the certificate
/// import path above. Only the first chain element is consulted.
pub fn rsa_jwk_from_x5c(b64_der: &str, kid: Option<&str>) -> Result<JWK> {
    trace!("reframing x5c member as certificate PEM");
    let pem = wrap_certificate_pem(b64_der);
    rsa_jwk_from_pem(&pem, false, kid)
}

fn rsa_private_material(block: &Pem) -> Result<RsaKeyMaterial> {
    match block.label.as_str() {
        PEM_LABEL_PRIVATE_KEY_PKCS1 => RsaPrivateMaterial::from_pkcs1(&block.contents),
        PEM_LABEL_PRIVATE_KEY_PKCS8 => RsaPrivateMaterial::from_pkcs8(&block.contents),
        other => Err(JoseError::input(format!(
            "PEM block {other:?} is not an RSA private key"
        ))),
    }
    .map(|material| {
        let (n, e) = material.public_components();
        RsaKeyMaterial {
            n,
            e,
            private: Some(material),
        }
    })
}

fn rsa_components_from_spki_der(der: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
    let (_, spki) = SubjectPublicKeyInfo::from_der(der)
        .map_err(|err| JoseError::input(format!("malformed subject public key info: {err}")))?;
    rsa_components_from_spki(&spki)
}

fn rsa_components_from_certificate(certificate: &X509Certificate<'_>) -> Result<(Vec<u8>, Vec<u8>)> {
    rsa_components_from_spki(certificate.public_key())
}

fn rsa_components_from_spki(spki: &SubjectPublicKeyInfo<'_>) -> Result<(Vec<u8>, Vec<u8>)> {
    match spki
        .parsed()
        .map_err(|err| JoseError::input(format!("malformed public key: {err}")))?
    {
        PublicKey::RSA(rsa) => Ok((
            strip_leading_zeroes(rsa.modulus).to_vec(),
            strip_leading_zeroes(rsa.exponent).to_vec(),
        )),
        _ => Err(JoseError::UnsupportedAlgorithm(
            "public key is not an RSA key".into(),
        )),
    }
}

fn wrap_certificate_pem(b64_der: &str) -> Vec<u8> {
    let body = b64_der.as_bytes();
    let mut pem =
        Vec::with_capacity(CERT_PEM_BEGIN.len() + CERT_PEM_END.len() + body.len() + body.len() / CERT_PEM_LINE_WIDTH + 4);
    pem.extend_from_slice(CERT_PEM_BEGIN.as_bytes());
    pem.push(b'\n');
    for line in body.chunks(CERT_PEM_LINE_WIDTH) {
        pem.extend_from_slice(line);
        pem.push(b'\n');
    }
    pem.extend_from_slice(CERT_PEM_END.as_bytes());
    pem.push(b'\n');
    pem
}

#[cfg(test)]
mod tests {
    use base64::prelude::BASE64_URL_SAFE_NO_PAD;

    use super::*;
    use crate::jose::KeyType;

    const RSA_A_PKCS8: &[u8] = include_bytes!("../../testdata/rsa-a.pkcs8.pem");
    const RSA_A_PKCS1: &[u8] = include_bytes!("../../testdata/rsa-a.pkcs1.pem");
    const RSA_A_PUBLIC: &[u8] = include_bytes!("../../testdata/rsa-a.pub.pem");
    const CHAIN: &[u8] = include_bytes!("../../testdata/chain.pem");
    const LEAF: &str = include_str!("../../testdata/cert-leaf.pem");

    // independently computed: base64url(sha256(modulus ‖ exponent)) of rsa-a
    const RSA_A_KID: &str = "aUAbmPEXfusaWZtCErGoPTAxIavWcUQnL7kXpbCsIYc";

    #[test]
    fn public_key_import_derives_fingerprint_kid() {
        let jwk = rsa_jwk_from_pem(RSA_A_PUBLIC, false, None).unwrap();
        assert_eq!(jwk.key_type(), KeyType::Rsa);
        assert_eq!(jwk.kid(), Some(RSA_A_KID));
        assert!(jwk.x5c().is_empty());
        assert_eq!(jwk.x5t(), None);
    }

    #[test]
    fn pkcs1_and_pkcs8_import_agree() {
        let from_pkcs8 = rsa_jwk_from_pem(RSA_A_PKCS8, true, None).unwrap();
        let from_pkcs1 = rsa_jwk_from_pem(RSA_A_PKCS1, true, None).unwrap();
        assert_eq!(from_pkcs8.kid(), Some(RSA_A_KID));
        assert_eq!(from_pkcs8.kid(), from_pkcs1.kid());
    }

    #[test]
    fn explicit_kid_wins_over_fingerprint() {
        let jwk = rsa_jwk_from_pem(RSA_A_PUBLIC, false, Some("configured")).unwrap();
        assert_eq!(jwk.kid(), Some("configured"));
    }

    #[test]
    fn certificate_chain_import() {
        let jwk = rsa_jwk_from_pem(CHAIN, false, None).unwrap();

        assert_eq!(jwk.x5c().len(), 3);

        // the leaf carries the same RSA key as the rsa-a fixtures
        assert_eq!(jwk.kid(), Some(RSA_A_KID));

        // x5c[0] is the leaf DER in standard base64, which is exactly the
        // joined PEM body
        let leaf_b64: String = LEAF
            .lines()
            .filter(|line| !line.starts_with("-----"))
            .collect();
        assert_eq!(jwk.x5c()[0], leaf_b64);

        // thumbprints are over those same leaf DER bytes
        let leaf_der = BASE64_STANDARD.decode(&jwk.x5c()[0]).unwrap();
        let sha1 = digest::digest(&digest::SHA1_FOR_LEGACY_USE_ONLY, &leaf_der);
        let sha256 = digest::digest(&digest::SHA256, &leaf_der);
        assert_eq!(
            jwk.x5t().unwrap(),
            BASE64_URL_SAFE_NO_PAD.encode(sha1.as_ref())
        );
        assert_eq!(
            jwk.x5t_s256().unwrap(),
            BASE64_URL_SAFE_NO_PAD.encode(sha256.as_ref())
        );
    }

    #[test]
    fn chain_stops_silently_at_first_undecodable_block() {
        let mut input = Vec::new();
        input.extend_from_slice(LEAF.as_bytes());
        input.extend_from_slice(RSA_A_PUBLIC);
        let jwk = rsa_jwk_from_pem(&input, false, None).unwrap();
        assert_eq!(jwk.x5c().len(), 1);
    }

    #[test]
    fn x5c_only_jwk_matches_direct_certificate_import() {
        let leaf_b64: String = LEAF
            .lines()
            .filter(|line| !line.starts_with("-----"))
            .collect();
        let from_x5c = rsa_jwk_from_x5c(&leaf_b64, None).unwrap();
        assert_eq!(from_x5c.kid(), Some(RSA_A_KID));
        assert_eq!(from_x5c.x5c().len(), 1);
        assert_eq!(from_x5c.x5c()[0], leaf_b64);

        // and the whole thing also works when routed through JWK JSON parse
        let json = format!(r#"{{"kty":"RSA","x5c":["{leaf_b64}"]}}"#);
        let parsed = JWK::parse(&json).unwrap();
        assert_eq!(parsed.kid(), Some(RSA_A_KID));
        assert_eq!(parsed.x5t().unwrap(), from_x5c.x5t().unwrap());
    }

    #[test]
    fn garbage_input_yields_no_jwk() {
        assert!(matches!(
            rsa_jwk_from_pem(b"not pem at all", false, None),
            Err(JoseError::InputFormat(_))
        ));
        assert!(matches!(
            rsa_jwk_from_pem(RSA_A_PUBLIC, true, None),
            Err(JoseError::InputFormat(_))
        ));
    }
}
