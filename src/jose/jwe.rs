//! Compact JWE backend.
//!
//! [`CompactJwe`] carries the five decoded segments of a compact JWE
//! (protected header, encrypted key, IV, ciphertext, tag) plus the
//! original base64url header text, which doubles as the additional
//! authenticated data and therefore must survive byte-exact.
//!
//! Key management wraps/unwraps a freshly generated content-encryption
//! key (CEK) with RSA (PKCS#1 v1.5 or OAEP) or AES key wrap; content
//! encryption is AES-CBC with an HMAC authentication tag per
//! [`rfc7518, section 5.2`], or AES-GCM.
//!
//! [`rfc7518, section 5.2`]: https://datatracker.ietf.org/doc/html/rfc7518#section-5.2

use aws_lc_rs::{
    cipher::{
        self, DecryptionContext, EncryptionContext, PaddedBlockDecryptingKey,
        PaddedBlockEncryptingKey, UnboundCipherKey,
    },
    constant_time, hmac,
    iv::FixedLength,
    key_wrap::{self, AesKek, KeyWrap as _},
    rand,
    rsa::{
        OAEP_SHA1_MGF1SHA1, OaepPrivateDecryptingKey, OaepPublicEncryptingKey,
        Pkcs1PrivateDecryptingKey, Pkcs1PublicEncryptingKey, PrivateDecryptingKey,
        PublicEncryptingKey,
    },
};
use base64::{Engine as _, prelude::BASE64_URL_SAFE_NO_PAD};
use serde_json::{Map, Value};
use zeroize::Zeroizing;

#[cfg(feature = "gcm")]
use aws_lc_rs::aead::{AES_256_GCM, Aad, LessSafeKey, Nonce, UnboundKey};

use crate::jose::{
    JWK, JoseError, Result,
    jwa::{alg, enc, key_size_for},
    jwk::KeyMaterial,
    jwk_utils::rsa_subject_public_key_info,
};

/// A parsed compact JWE, ready for a decryption attempt.
pub(crate) struct CompactJwe {
    /// Owned copy of the decoded protected header.
    header: Map<String, Value>,
    /// The protected header segment as received; it is the AAD.
    protected_b64: String,
    encrypted_key: Vec<u8>,
    iv: Vec<u8>,
    ciphertext: Vec<u8>,
    tag: Vec<u8>,
}

impl CompactJwe {
    /// Import a compact serialization: five dot-separated base64url
    /// segments with a JSON-object protected header naming `alg` and `enc`.
    pub(crate) fn import(compact: &str) -> Result<Self> {
        let mut segments = compact.split('.');
        let (
            Some(protected_b64),
            Some(key_b64),
            Some(iv_b64),
            Some(ciphertext_b64),
            Some(tag_b64),
            None,
        ) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        )
        else {
            return Err(JoseError::input(
                "compact JWE must consist of exactly 5 dot-separated segments",
            ));
        };

        let header_bytes = BASE64_URL_SAFE_NO_PAD
            .decode(protected_b64)
            .map_err(|err| JoseError::input(format!("protected header segment: {err}")))?;
        let header: Value = serde_json::from_slice(&header_bytes)
            .map_err(|err| JoseError::input(format!("protected header is not valid JSON: {err}")))?;
        let Value::Object(header) = header else {
            return Err(JoseError::input("protected header is not a JSON object"));
        };
        if !header.contains_key("alg") || !header.contains_key("enc") {
            return Err(JoseError::input(
                "JWE protected header misses \"alg\" or \"enc\"",
            ));
        }

        let decode = |segment: &str, what: &str| {
            BASE64_URL_SAFE_NO_PAD
                .decode(segment)
                .map_err(|err| JoseError::input(format!("{what} segment: {err}")))
        };

        Ok(Self {
            header,
            protected_b64: protected_b64.to_owned(),
            encrypted_key: decode(key_b64, "encrypted key")?,
            iv: decode(iv_b64, "initialization vector")?,
            ciphertext: decode(ciphertext_b64, "ciphertext")?,
            tag: decode(tag_b64, "authentication tag")?,
        })
    }

    pub(crate) fn alg(&self) -> Option<&str> {
        self.header.get("alg").and_then(Value::as_str)
    }

    pub(crate) fn kid(&self) -> Option<&str> {
        self.header.get("kid").and_then(Value::as_str)
    }

    /// Encrypt `plaintext` under `header` for the given key, producing the
    /// compact serialization.
    ///
    /// A fresh CEK and IV are drawn from the provider's RNG for every
    /// call; the CEK is wrapped according to the header's `alg` and the
    /// content encrypted according to its `enc`.
    pub(crate) fn encrypt(
        header: &Map<String, Value>,
        jwk: &JWK,
        plaintext: &[u8],
    ) -> Result<String> {
        let algorithm = header
            .get("alg")
            .and_then(Value::as_str)
            .ok_or_else(|| JoseError::input("JWE protected header misses \"alg\""))?;
        let encryption = header
            .get("enc")
            .and_then(Value::as_str)
            .ok_or_else(|| JoseError::input("JWE protected header misses \"enc\""))?;
        let encryption = ContentEncryption::from_name(encryption)?;

        let mut cek = Zeroizing::new(vec![0u8; encryption.cek_len()]);
        rand::fill(&mut cek).map_err(|_| JoseError::crypto("CEK generation"))?;
        let encrypted_key = wrap_cek(jwk, algorithm, &cek)?;

        let mut iv = vec![0u8; encryption.iv_len()];
        rand::fill(&mut iv).map_err(|_| JoseError::crypto("IV generation"))?;

        let header_bytes = serde_json::to_vec(header)
            .map_err(|err| JoseError::input(format!("could not serialize header: {err}")))?;
        let protected_b64 = BASE64_URL_SAFE_NO_PAD.encode(header_bytes);

        let (ciphertext, tag) = encryption.seal(&cek, &iv, protected_b64.as_bytes(), plaintext)?;

        Ok(format!(
            "{protected_b64}.{}.{}.{}.{}",
            BASE64_URL_SAFE_NO_PAD.encode(&encrypted_key),
            BASE64_URL_SAFE_NO_PAD.encode(&iv),
            BASE64_URL_SAFE_NO_PAD.encode(&ciphertext),
            BASE64_URL_SAFE_NO_PAD.encode(&tag),
        ))
    }

    /// Attempt decryption with a single candidate key.
    pub(crate) fn decrypt(&self, jwk: &JWK) -> Result<Vec<u8>> {
        let algorithm = self
            .alg()
            .ok_or_else(|| JoseError::input("JWE protected header misses \"alg\""))?;
        let encryption = self
            .header
            .get("enc")
            .and_then(Value::as_str)
            .ok_or_else(|| JoseError::input("JWE protected header misses \"enc\""))?;
        let encryption = ContentEncryption::from_name(encryption)?;

        let cek = unwrap_cek(jwk, algorithm, &self.encrypted_key)?;
        if cek.len() != encryption.cek_len() {
            return Err(JoseError::crypto(format!(
                "unwrapped content key has wrong size for {}",
                encryption.name()
            )));
        }

        encryption.open(
            &cek,
            &self.iv,
            self.protected_b64.as_bytes(),
            &self.ciphertext,
            &self.tag,
        )
    }
}

/// Wrap the CEK for the recipient according to the key-management `alg`.
fn wrap_cek(jwk: &JWK, algorithm: &str, cek: &[u8]) -> Result<Vec<u8>> {
    match algorithm {
        alg::RSA1_5 | alg::RSA_OAEP => {
            let KeyMaterial::Rsa(rsa) = jwk.material() else {
                return Err(key_type_confusion(algorithm, "an RSA", jwk));
            };
            let spki = rsa_subject_public_key_info(&rsa.n, &rsa.e);
            let public_key = PublicEncryptingKey::from_der(&spki)
                .map_err(|err| JoseError::crypto(format!("RSA public key rejected: {err}")))?;
            if algorithm == alg::RSA1_5 {
                let key = Pkcs1PublicEncryptingKey::new(public_key)
                    .map_err(|_| JoseError::crypto("RSA1_5 key setup"))?;
                let mut out = vec![0u8; key.ciphertext_size()];
                let ciphertext = key
                    .encrypt(cek, &mut out)
                    .map_err(|_| JoseError::crypto("RSA1_5 key wrap"))?;
                Ok(ciphertext.to_vec())
            } else {
                let key = OaepPublicEncryptingKey::new(public_key)
                    .map_err(|_| JoseError::crypto("RSA-OAEP key setup"))?;
                let mut out = vec![0u8; key.ciphertext_size()];
                let ciphertext = key
                    .encrypt(&OAEP_SHA1_MGF1SHA1, cek, &mut out, None)
                    .map_err(|_| JoseError::crypto("RSA-OAEP key wrap"))?;
                Ok(ciphertext.to_vec())
            }
        }
        alg::A128KW | alg::A192KW | alg::A256KW => {
            let kek = aes_kek(jwk, algorithm)?;
            let mut out = vec![0u8; cek.len() + 8];
            let wrapped = kek
                .wrap(cek, &mut out)
                .map_err(|_| JoseError::crypto(format!("{algorithm} key wrap")))?;
            Ok(wrapped.to_vec())
        }
        other => Err(JoseError::UnsupportedAlgorithm(other.to_owned())),
    }
}

/// Unwrap the CEK according to the key-management `alg`.
fn unwrap_cek(jwk: &JWK, algorithm: &str, encrypted_key: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    match algorithm {
        alg::RSA1_5 | alg::RSA_OAEP => {
            let KeyMaterial::Rsa(rsa) = jwk.material() else {
                return Err(key_type_confusion(algorithm, "an RSA", jwk));
            };
            let Some(private) = &rsa.private else {
                return Err(JoseError::crypto(format!(
                    "{algorithm} unwrap requires an RSA private key"
                )));
            };
            let private_key = PrivateDecryptingKey::from_pkcs8(&private.pkcs8)
                .map_err(|err| JoseError::crypto(format!("RSA private key rejected: {err}")))?;
            if algorithm == alg::RSA1_5 {
                let key = Pkcs1PrivateDecryptingKey::new(private_key)
                    .map_err(|_| JoseError::crypto("RSA1_5 key setup"))?;
                let mut out = Zeroizing::new(vec![0u8; key.min_output_size()]);
                let len = key
                    .decrypt(encrypted_key, &mut out)
                    .map_err(|_| JoseError::crypto("RSA1_5 key unwrap"))?
                    .len();
                out.truncate(len);
                Ok(out)
            } else {
                let key = OaepPrivateDecryptingKey::new(private_key)
                    .map_err(|_| JoseError::crypto("RSA-OAEP key setup"))?;
                let mut out = Zeroizing::new(vec![0u8; key.min_output_size()]);
                let len = key
                    .decrypt(&OAEP_SHA1_MGF1SHA1, encrypted_key, &mut out, None)
                    .map_err(|_| JoseError::crypto("RSA-OAEP key unwrap"))?
                    .len();
                out.truncate(len);
                Ok(out)
            }
        }
        alg::A128KW | alg::A192KW | alg::A256KW => {
            if encrypted_key.len() < 8 {
                return Err(JoseError::input("wrapped key is too short"));
            }
            let kek = aes_kek(jwk, algorithm)?;
            let mut out = Zeroizing::new(vec![0u8; encrypted_key.len()]);
            let len = kek
                .unwrap(encrypted_key, &mut out)
                .map_err(|_| JoseError::crypto(format!("{algorithm} key unwrap")))?
                .len();
            out.truncate(len);
            Ok(out)
        }
        other => Err(JoseError::UnsupportedAlgorithm(other.to_owned())),
    }
}

fn aes_kek(jwk: &JWK, algorithm: &str) -> Result<AesKek> {
    let KeyMaterial::Octet(secret) = jwk.material() else {
        return Err(key_type_confusion(algorithm, "a symmetric", jwk));
    };
    let expected = key_size_for(algorithm);
    if secret.len() != expected {
        return Err(JoseError::crypto(format!(
            "{algorithm} requires a {expected}-byte key, got {} bytes",
            secret.len()
        )));
    }
    let block_cipher = match algorithm {
        alg::A128KW => &key_wrap::AES_128,
        alg::A192KW => &key_wrap::AES_192,
        _ => &key_wrap::AES_256,
    };
    AesKek::new(block_cipher, secret).map_err(|_| JoseError::crypto(format!("{algorithm} key setup")))
}

fn key_type_confusion(algorithm: &str, wanted: &str, jwk: &JWK) -> JoseError {
    JoseError::UnsupportedAlgorithm(format!(
        "{algorithm} requires {wanted} key, got key type {}",
        jwk.key_type()
    ))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContentEncryption {
    A128CbcHs256,
    A192CbcHs384,
    A256CbcHs512,
    #[cfg(feature = "gcm")]
    A256Gcm,
}

impl ContentEncryption {
    fn from_name(name: &str) -> Result<Self> {
        match name {
            enc::A128CBC_HS256 => Ok(Self::A128CbcHs256),
            enc::A192CBC_HS384 => Ok(Self::A192CbcHs384),
            enc::A256CBC_HS512 => Ok(Self::A256CbcHs512),
            #[cfg(feature = "gcm")]
            enc::A256GCM => Ok(Self::A256Gcm),
            other => Err(JoseError::UnsupportedAlgorithm(other.to_owned())),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::A128CbcHs256 => enc::A128CBC_HS256,
            Self::A192CbcHs384 => enc::A192CBC_HS384,
            Self::A256CbcHs512 => enc::A256CBC_HS512,
            #[cfg(feature = "gcm")]
            Self::A256Gcm => enc::A256GCM,
        }
    }

    /// CEK size: MAC key ‖ AES key for the CBC composites.
    fn cek_len(&self) -> usize {
        match self {
            Self::A128CbcHs256 => 32,
            Self::A192CbcHs384 => 48,
            Self::A256CbcHs512 => 64,
            #[cfg(feature = "gcm")]
            Self::A256Gcm => 32,
        }
    }

    fn iv_len(&self) -> usize {
        match self {
            #[cfg(feature = "gcm")]
            Self::A256Gcm => 12,
            _ => 16,
        }
    }

    fn tag_len(&self) -> usize {
        match self {
            Self::A128CbcHs256 => 16,
            Self::A192CbcHs384 => 24,
            Self::A256CbcHs512 => 32,
            #[cfg(feature = "gcm")]
            Self::A256Gcm => 16,
        }
    }

    fn hmac_algorithm(&self) -> Option<hmac::Algorithm> {
        match self {
            Self::A128CbcHs256 => Some(hmac::HMAC_SHA256),
            Self::A192CbcHs384 => Some(hmac::HMAC_SHA384),
            Self::A256CbcHs512 => Some(hmac::HMAC_SHA512),
            #[cfg(feature = "gcm")]
            Self::A256Gcm => None,
        }
    }

    fn seal(&self, cek: &[u8], iv: &[u8], aad: &[u8], plaintext: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
        match self {
            #[cfg(feature = "gcm")]
            Self::A256Gcm => gcm_seal(cek, iv, aad, plaintext),
            _ => self.cbc_hmac_seal(cek, iv, aad, plaintext),
        }
    }

    fn open(
        &self,
        cek: &[u8],
        iv: &[u8],
        aad: &[u8],
        ciphertext: &[u8],
        tag: &[u8],
    ) -> Result<Vec<u8>> {
        match self {
            #[cfg(feature = "gcm")]
            Self::A256Gcm => gcm_open(cek, iv, aad, ciphertext, tag),
            _ => self.cbc_hmac_open(cek, iv, aad, ciphertext, tag),
        }
    }

    /// AES-CBC + HMAC composite per rfc7518 section 5.2: the first half of
    /// the CEK is the MAC key, the second half the AES key; the tag is the
    /// truncated HMAC over `aad ‖ iv ‖ ciphertext ‖ bitlen64(aad)`.
    fn cbc_hmac_seal(
        &self,
        cek: &[u8],
        iv: &[u8],
        aad: &[u8],
        plaintext: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>)> {
        let (mac_key, aes_key) = cek.split_at(cek.len() / 2);

        let unbound = UnboundCipherKey::new(aes_cipher_algorithm(aes_key.len())?, aes_key)
            .map_err(|_| JoseError::crypto("AES-CBC key setup"))?;
        let encrypting_key = PaddedBlockEncryptingKey::cbc_pkcs7(unbound)
            .map_err(|_| JoseError::crypto("AES-CBC key setup"))?;
        let context = EncryptionContext::Iv128(
            FixedLength::try_from(iv).map_err(|_| JoseError::crypto("AES-CBC IV setup"))?,
        );
        let mut data = plaintext.to_vec();
        encrypting_key
            .less_safe_encrypt(&mut data, context)
            .map_err(|_| JoseError::crypto("AES-CBC encryption"))?;

        let tag = self.cbc_hmac_tag(mac_key, aad, iv, &data)?;
        Ok((data, tag))
    }

    fn cbc_hmac_open(
        &self,
        cek: &[u8],
        iv: &[u8],
        aad: &[u8],
        ciphertext: &[u8],
        tag: &[u8],
    ) -> Result<Vec<u8>> {
        let (mac_key, aes_key) = cek.split_at(cek.len() / 2);

        let expected = self.cbc_hmac_tag(mac_key, aad, iv, ciphertext)?;
        constant_time::verify_slices_are_equal(&expected, tag)
            .map_err(|_| JoseError::crypto("authentication tag mismatch"))?;

        let unbound = UnboundCipherKey::new(aes_cipher_algorithm(aes_key.len())?, aes_key)
            .map_err(|_| JoseError::crypto("AES-CBC key setup"))?;
        let decrypting_key = PaddedBlockDecryptingKey::cbc_pkcs7(unbound)
            .map_err(|_| JoseError::crypto("AES-CBC key setup"))?;
        let context = DecryptionContext::Iv128(
            FixedLength::try_from(iv).map_err(|_| JoseError::crypto("AES-CBC IV setup"))?,
        );
        let mut data = ciphertext.to_vec();
        let plaintext = decrypting_key
            .decrypt(&mut data, context)
            .map_err(|_| JoseError::crypto("AES-CBC decryption"))?;
        Ok(plaintext.to_vec())
    }

    fn cbc_hmac_tag(&self, mac_key: &[u8], aad: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
        let algorithm = self
            .hmac_algorithm()
            .ok_or_else(|| JoseError::crypto("no MAC algorithm for this encryption"))?;
        let mut mac_input =
            Vec::with_capacity(aad.len() + iv.len() + ciphertext.len() + size_of::<u64>());
        mac_input.extend_from_slice(aad);
        mac_input.extend_from_slice(iv);
        mac_input.extend_from_slice(ciphertext);
        mac_input.extend_from_slice(&((aad.len() as u64) * 8).to_be_bytes());

        let key = hmac::Key::new(algorithm, mac_key);
        let full = hmac::sign(&key, &mac_input);
        Ok(full.as_ref()[..self.tag_len()].to_vec())
    }
}

fn aes_cipher_algorithm(key_len: usize) -> Result<&'static cipher::Algorithm> {
    match key_len {
        16 => Ok(&cipher::AES_128),
        24 => Ok(&cipher::AES_192),
        32 => Ok(&cipher::AES_256),
        other => Err(JoseError::crypto(format!(
            "no AES variant for {other}-byte keys"
        ))),
    }
}

#[cfg(feature = "gcm")]
fn gcm_seal(cek: &[u8], iv: &[u8], aad: &[u8], plaintext: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
    let unbound =
        UnboundKey::new(&AES_256_GCM, cek).map_err(|_| JoseError::crypto("AES-GCM key setup"))?;
    let key = LessSafeKey::new(unbound);
    let nonce =
        Nonce::try_assume_unique_for_key(iv).map_err(|_| JoseError::crypto("AES-GCM IV setup"))?;
    let mut data = plaintext.to_vec();
    let tag = key
        .seal_in_place_separate_tag(nonce, Aad::from(aad), &mut data)
        .map_err(|_| JoseError::crypto("AES-GCM encryption"))?;
    Ok((data, tag.as_ref().to_vec()))
}

#[cfg(feature = "gcm")]
fn gcm_open(cek: &[u8], iv: &[u8], aad: &[u8], ciphertext: &[u8], tag: &[u8]) -> Result<Vec<u8>> {
    let unbound =
        UnboundKey::new(&AES_256_GCM, cek).map_err(|_| JoseError::crypto("AES-GCM key setup"))?;
    let key = LessSafeKey::new(unbound);
    let nonce =
        Nonce::try_assume_unique_for_key(iv).map_err(|_| JoseError::crypto("AES-GCM IV setup"))?;
    let mut data = Vec::with_capacity(ciphertext.len() + tag.len());
    data.extend_from_slice(ciphertext);
    data.extend_from_slice(tag);
    let plaintext = key
        .open_in_place(nonce, Aad::from(aad), &mut data)
        .map_err(|_| JoseError::crypto("AES-GCM authentication failed"))?;
    Ok(plaintext.to_vec())
}

#[cfg(test)]
mod tests {
    use tokio_test::assert_err;

    use super::*;
    use crate::jose::testutil;

    fn jwe_header(algorithm: &str, encryption: &str) -> Map<String, Value> {
        let mut header = Map::new();
        header.insert("alg".to_owned(), Value::String(algorithm.to_owned()));
        header.insert("enc".to_owned(), Value::String(encryption.to_owned()));
        header
    }

    #[test]
    fn aes_kw_cbc_round_trips() {
        for (algorithm, encryption, key_len) in [
            (alg::A128KW, enc::A128CBC_HS256, 16),
            (alg::A192KW, enc::A192CBC_HS384, 24),
            (alg::A256KW, enc::A256CBC_HS512, 32),
        ] {
            let jwk = testutil::oct_jwk_len(key_len);
            let compact =
                CompactJwe::encrypt(&jwe_header(algorithm, encryption), &jwk, b"the plaintext")
                    .unwrap();
            let imported = CompactJwe::import(&compact).unwrap();
            assert_eq!(imported.alg(), Some(algorithm));
            assert_eq!(imported.decrypt(&jwk).unwrap(), b"the plaintext");
        }
    }

    #[test]
    fn rsa_key_management_round_trips() {
        let private = testutil::rsa_private_jwk(None);
        for algorithm in [alg::RSA1_5, alg::RSA_OAEP] {
            let compact = CompactJwe::encrypt(
                &jwe_header(algorithm, enc::A128CBC_HS256),
                &private,
                b"secret text",
            )
            .unwrap();
            let imported = CompactJwe::import(&compact).unwrap();
            assert_eq!(imported.decrypt(&private).unwrap(), b"secret text");
        }
    }

    #[cfg(feature = "gcm")]
    #[test]
    fn gcm_round_trips() {
        let jwk = testutil::oct_jwk_len(32);
        let compact =
            CompactJwe::encrypt(&jwe_header(alg::A256KW, enc::A256GCM), &jwk, b"gcm payload")
                .unwrap();
        assert_eq!(
            CompactJwe::import(&compact).unwrap().decrypt(&jwk).unwrap(),
            b"gcm payload"
        );
    }

    #[test]
    fn tampered_ciphertext_is_rejected() {
        let jwk = testutil::oct_jwk_len(16);
        let compact = CompactJwe::encrypt(
            &jwe_header(alg::A128KW, enc::A128CBC_HS256),
            &jwk,
            b"sensitive",
        )
        .unwrap();

        let mut segments: Vec<String> = compact.split('.').map(str::to_owned).collect();
        // flip a byte inside the ciphertext segment
        let tampered_ct = BASE64_URL_SAFE_NO_PAD
            .decode(&segments[3])
            .map(|mut ct| {
                ct[0] ^= 0x01;
                BASE64_URL_SAFE_NO_PAD.encode(ct)
            })
            .unwrap();
        segments[3] = tampered_ct;
        let tampered = segments.join(".");

        let err = CompactJwe::import(&tampered).unwrap().decrypt(&jwk).unwrap_err();
        assert!(matches!(err, JoseError::CryptoPrimitive(_)));
    }

    #[test]
    fn wrong_kek_size_is_rejected() {
        let jwk = testutil::oct_jwk_len(17);
        let err = CompactJwe::encrypt(
            &jwe_header(alg::A128KW, enc::A128CBC_HS256),
            &jwk,
            b"sensitive",
        )
        .unwrap_err();
        assert!(matches!(err, JoseError::CryptoPrimitive(_)));
    }

    #[test]
    fn unsupported_algorithms_are_rejected() {
        let jwk = testutil::oct_jwk_len(16);
        assert!(matches!(
            CompactJwe::encrypt(&jwe_header("dir", enc::A128CBC_HS256), &jwk, b"x"),
            Err(JoseError::UnsupportedAlgorithm(_))
        ));
        assert!(matches!(
            CompactJwe::encrypt(&jwe_header(alg::A128KW, "A128GCM"), &jwk, b"x"),
            Err(JoseError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn key_type_confusion_is_rejected() {
        let oct = testutil::oct_jwk_len(16);
        let rsa = testutil::rsa_private_jwk(None);
        assert!(matches!(
            CompactJwe::encrypt(&jwe_header(alg::RSA_OAEP, enc::A128CBC_HS256), &oct, b"x"),
            Err(JoseError::UnsupportedAlgorithm(_))
        ));
        assert!(matches!(
            CompactJwe::encrypt(&jwe_header(alg::A128KW, enc::A128CBC_HS256), &rsa, b"x"),
            Err(JoseError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn import_rejects_wrong_segment_counts() {
        assert_err!(CompactJwe::import("a.b.c"));
        assert_err!(CompactJwe::import("a.b.c.d.e.f"));
    }

    #[test]
    fn import_requires_alg_and_enc() {
        let header_b64 = BASE64_URL_SAFE_NO_PAD.encode(b"{\"alg\":\"A128KW\"}");
        let err = CompactJwe::import(&format!("{header_b64}.a.b.c.d")).unwrap_err();
        assert!(matches!(err, JoseError::InputFormat(_)));
    }
}
