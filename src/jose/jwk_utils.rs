//! Minimal DER assembly for the RSA structures this crate has to hand the
//! crypto provider.
//!
//! The provider consumes public keys as X.509 `SubjectPublicKeyInfo` and
//! private keys as PKCS#8 `PrivateKeyInfo`; key material parsed out of
//! JWKs or legacy PEM blocks arrives as raw component bytes or PKCS#1
//! documents, so the two wrappers below rebuild the outer framing.
//!
//! These helpers implement just enough of
//! [ITU X.690](https://www.itu.int/ITU-T/studygroups/com17/languages/X.690-0207.pdf)
//! for that purpose. They must ***NOT*** be used as a general ASN.1 encoder.

use crate::jose::constants::{
    BIT_STRING_NO_UNUSED_BITS, DER_LENGTH_SHORT_FORM_MAX, DER_TAG_BIT_STRING, DER_TAG_INTEGER,
    DER_TAG_OCTET_STRING, DER_TAG_SEQUENCE, INTEGER_SIGN_BIT_MASK, RSA_ALGORITHM_IDENTIFIER,
};

/// Build the DER `SubjectPublicKeyInfo` for an RSA public key from its
/// big-endian unsigned modulus and exponent bytes.
///
/// Per section 4.1 of [RFC 5280](https://datatracker.ietf.org/doc/rfc5280/)
/// the structure is
/// ```rust,ignore
/// SubjectPublicKeyInfo = SEQUENCE {
///     algorithm AlgorithmIdentifier,
///     subjectPublicKey BIT STRING
/// }
/// ```
/// where the bit string wraps the PKCS#1 `RSAPublicKey` sequence
/// (`SEQUENCE { modulus INTEGER, exponent INTEGER }`, section 2.3.1 of
/// [RFC 3279](https://datatracker.ietf.org/doc/rfc3279/)).
pub(crate) fn rsa_subject_public_key_info(n: &[u8], e: &[u8]) -> Vec<u8> {
    let rsa_public_key = {
        let n_der = encode_integer(n);
        let e_der = encode_integer(e);
        let mut seq = der_header(DER_TAG_SEQUENCE, n_der.len() + e_der.len());
        seq.extend_from_slice(&n_der);
        seq.extend_from_slice(&e_der);
        seq
    };

    let mut bit_string = der_header(DER_TAG_BIT_STRING, 1 + rsa_public_key.len());
    bit_string.push(BIT_STRING_NO_UNUSED_BITS);
    bit_string.extend_from_slice(&rsa_public_key);

    let mut spki = der_header(
        DER_TAG_SEQUENCE,
        RSA_ALGORITHM_IDENTIFIER.len() + bit_string.len(),
    );
    spki.extend_from_slice(&RSA_ALGORITHM_IDENTIFIER);
    spki.extend_from_slice(&bit_string);
    spki
}

/// Wrap a PKCS#1 `RSAPrivateKey` document into a PKCS#8 `PrivateKeyInfo`.
///
/// Per section 5 of [RFC 5208](https://datatracker.ietf.org/doc/rfc5208/):
/// ```rust,ignore
/// PrivateKeyInfo = SEQUENCE {
///     version Version (0),
///     privateKeyAlgorithm AlgorithmIdentifier,
///     privateKey OCTET STRING
/// }
/// ```
pub(crate) fn wrap_pkcs1_in_pkcs8(pkcs1: &[u8]) -> Vec<u8> {
    const VERSION_ZERO: [u8; 3] = [DER_TAG_INTEGER, 0x01, 0x00];

    let mut private_key = der_header(DER_TAG_OCTET_STRING, pkcs1.len());
    private_key.extend_from_slice(pkcs1);

    let mut info = der_header(
        DER_TAG_SEQUENCE,
        VERSION_ZERO.len() + RSA_ALGORITHM_IDENTIFIER.len() + private_key.len(),
    );
    info.extend_from_slice(&VERSION_ZERO);
    info.extend_from_slice(&RSA_ALGORITHM_IDENTIFIER);
    info.extend_from_slice(&private_key);
    info
}

/// Strip the big-endian sign/padding zero bytes off a DER integer's
/// content bytes, yielding the unsigned magnitude.
///
/// An all-zero input collapses to a single zero byte.
pub(crate) fn strip_leading_zeroes(bytes: &[u8]) -> &[u8] {
    match bytes.iter().position(|b| *b != 0) {
        Some(start) => &bytes[start..],
        None => &bytes[bytes.len().saturating_sub(1)..],
    }
}

/// Tag + length header per section 8.1.3 of
/// [ITU X.690](https://www.itu.int/ITU-T/studygroups/com17/languages/X.690-0207.pdf),
/// with capacity reserved for `content_len` more bytes.
fn der_header(tag: u8, content_len: usize) -> Vec<u8> {
    let len_bytes = encode_der_length(content_len);
    let mut out = Vec::with_capacity(1 + len_bytes.len() + content_len);
    out.push(tag);
    out.extend_from_slice(&len_bytes);
    out
}

/// Length encoding per section 8.1.3 of
/// [ITU X.690](https://www.itu.int/ITU-T/studygroups/com17/languages/X.690-0207.pdf):
/// short form up to 127, long form above.
fn encode_der_length(len: usize) -> Vec<u8> {
    if len <= DER_LENGTH_SHORT_FORM_MAX {
        vec![len as u8]
    } else {
        let mut len_bytes = len.to_be_bytes().to_vec();
        while len_bytes.first() == Some(&0) {
            len_bytes.remove(0);
        }
        let first_byte = INTEGER_SIGN_BIT_MASK | len_bytes.len() as u8;
        let mut result = vec![first_byte];
        result.extend_from_slice(&len_bytes);
        result
    }
}

/// Encode a big-endian unsigned magnitude as a DER INTEGER, inserting the
/// leading zero octet when the sign bit would otherwise be set.
///
/// The input must be non-empty and in minimal (stripped) form.
fn encode_integer(value: &[u8]) -> Vec<u8> {
    let needs_leading_zero = value.first().is_some_and(|b| b & INTEGER_SIGN_BIT_MASK != 0);
    let content_len = value.len() + usize::from(needs_leading_zero);
    let mut result = der_header(DER_TAG_INTEGER, content_len);
    if needs_leading_zero {
        result.push(0);
    }
    result.extend_from_slice(value);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_gets_sign_padding_only_when_needed() {
        assert_eq!(encode_integer(&[0x01, 0x00, 0x01]), [0x02, 0x03, 0x01, 0x00, 0x01]);
        assert_eq!(encode_integer(&[0x80]), [0x02, 0x02, 0x00, 0x80]);
    }

    #[test]
    fn long_form_lengths() {
        assert_eq!(encode_der_length(127), [0x7f]);
        assert_eq!(encode_der_length(128), [0x81, 0x80]);
        assert_eq!(encode_der_length(300), [0x82, 0x01, 0x2c]);
    }

    #[test]
    fn strip_removes_padding_keeps_zero_value() {
        assert_eq!(strip_leading_zeroes(&[0x00, 0x80, 0x01]), [0x80, 0x01]);
        assert_eq!(strip_leading_zeroes(&[0x12]), [0x12]);
        assert_eq!(strip_leading_zeroes(&[0x00, 0x00]), [0x00]);
        assert!(strip_leading_zeroes(&[]).is_empty());
    }

    #[test]
    fn spki_structure_is_well_formed() {
        // 2048-bit modulus worth of bytes forces long-form lengths everywhere
        let n = vec![0xab; 256];
        let e = [0x01, 0x00, 0x01];
        let spki = rsa_subject_public_key_info(&n, &e);

        assert_eq!(spki[0], DER_TAG_SEQUENCE);
        // outer length is long-form 2 bytes for this size
        assert_eq!(spki[1], 0x82);
        let outer_len = usize::from(spki[2]) << 8 | usize::from(spki[3]);
        assert_eq!(outer_len, spki.len() - 4);
        assert_eq!(&spki[4..4 + RSA_ALGORITHM_IDENTIFIER.len()], RSA_ALGORITHM_IDENTIFIER);
    }

    #[test]
    fn pkcs8_wrapper_embeds_pkcs1_document() {
        let pkcs1 = vec![0x30, 0x03, 0x02, 0x01, 0x00];
        let pkcs8 = wrap_pkcs1_in_pkcs8(&pkcs1);
        assert_eq!(pkcs8[0], DER_TAG_SEQUENCE);
        // version 0 follows the outer header
        assert_eq!(&pkcs8[2..5], &[0x02, 0x01, 0x00]);
        assert!(
            pkcs8
                .windows(pkcs1.len())
                .any(|window| window == pkcs1.as_slice())
        );
    }
}
