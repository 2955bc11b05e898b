//! JSON Web Tokens: a header + payload pair carried as a compact JWS or
//! JWE, as defined in [`rfc7519`].
//!
//! [`rfc7519`]: https://datatracker.ietf.org/doc/html/rfc7519

use base64::{Engine as _, prelude::BASE64_URL_SAFE_NO_PAD};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::trace;

use crate::jose::{
    JWK, JoseError, KeySet, Result,
    jwa::alg,
    jwe::CompactJwe,
    jws::CompactJws,
};

/// base64url of `{"alg":"none"}`, the fixed header segment of an unsigned
/// token. Pre-computed: verifiers of unsigned tokens match it byte-exact.
const ALG_NONE_HEADER_B64: &str = "eyJhbGciOiJub25lIn0";

#[derive(Debug, Default, Clone, PartialEq)]
/// The registered claims this crate extracts opportunistically while
/// parsing a token payload. Everything else stays in the payload object
/// untouched; absent (or mistyped optional) claims are simply `None`.
pub struct RegisteredClaims {
    /// `iss`: issuer
    pub iss: Option<String>,
    /// `sub`: subject
    pub sub: Option<String>,
    /// `exp`: expiry, seconds since the epoch
    pub exp: Option<f64>,
    /// `iat`: issued at, seconds since the epoch
    pub iat: Option<f64>,
}

impl RegisteredClaims {
    fn extract(payload: &Map<String, Value>) -> Self {
        Self {
            iss: payload
                .get("iss")
                .and_then(Value::as_str)
                .map(str::to_owned),
            sub: payload
                .get("sub")
                .and_then(Value::as_str)
                .map(str::to_owned),
            exp: payload.get("exp").and_then(Value::as_f64),
            iat: payload.get("iat").and_then(Value::as_f64),
        }
    }
}

#[derive(Debug)]
/// A JSON Web Token: an owned header and payload JSON object, plus, once
/// parsed or signed, the opaque compact-JWS representation needed to
/// verify or re-serialize it.
///
/// A freshly created token is unsigned (`alg` is `none`); populate the
/// payload and header fields, then [`sign`] or [`encrypt`] it. A token
/// built by [`parse`] is ready for [`KeySet::verify`].
///
/// The payload is always a JSON object; scalar or array payloads are
/// rejected at parse time.
///
/// [`sign`]: Self::sign
/// [`encrypt`]: Self::encrypt
/// [`parse`]: Self::parse
/// [`KeySet::verify`]: crate::jose::KeySet::verify
pub struct JWT {
    header: Map<String, Value>,
    algorithm: String,
    kid: Option<String>,
    enc: Option<String>,
    payload: Map<String, Value>,
    claims: RegisteredClaims,
    jws: Option<CompactJws>,
    signature_poisoned: bool,
}

impl JWT {
    /// Create an empty, unsigned token.
    pub fn new() -> Self {
        Self {
            header: Map::new(),
            algorithm: alg::NONE.to_owned(),
            kid: None,
            enc: None,
            payload: Map::new(),
            claims: RegisteredClaims::default(),
            jws: None,
            signature_poisoned: false,
        }
    }

    /// Parse (and, if needed, decrypt) a compact-serialized token.
    ///
    /// The input is first offered to the key set as a JWE; if it does not
    /// parse as one it is taken as a bare signed token unchanged, since
    /// encryption is optional at this stage. The (possibly decrypted) text
    /// is then imported as a compact JWS, the protected header copied into
    /// an owned JSON tree, and the payload parsed, which must yield a JSON
    /// object.
    ///
    /// Nothing is returned on failure; whatever was built up to that point
    /// is torn down.
    pub fn parse(input: &str, keys: &KeySet) -> Result<Self> {
        let text = keys.decrypt(input, false)?;
        let jws = CompactJws::import(&text)?;

        let header = jws.header().clone();
        let algorithm = header
            .get("alg")
            .and_then(Value::as_str)
            .ok_or_else(|| JoseError::input("protected header misses \"alg\""))?
            .to_owned();
        let kid = header
            .get("kid")
            .and_then(Value::as_str)
            .map(str::to_owned);
        let enc = header
            .get("enc")
            .and_then(Value::as_str)
            .map(str::to_owned);

        let payload: Value = serde_json::from_slice(jws.payload())
            .map_err(|err| JoseError::input(format!("token payload is not valid JSON: {err}")))?;
        let Value::Object(payload) = payload else {
            return Err(JoseError::input("token payload is not a JSON object"));
        };
        let claims = RegisteredClaims::extract(&payload);

        trace!(alg = %algorithm, kid = ?kid, "parsed compact token");

        Ok(Self {
            header,
            algorithm,
            kid,
            enc,
            payload,
            claims,
            jws: Some(jws),
            signature_poisoned: false,
        })
    }

    /// Emit the compact serialization of this token.
    ///
    /// A signed token re-exports its stored representation. An unsigned
    /// one (`alg` = `none`) is emitted as the fixed header constant, the
    /// base64url compact payload, and an empty signature segment; the
    /// trailing dot is part of the format.
    pub fn serialize(&self) -> Result<String> {
        if self.algorithm != alg::NONE {
            return Ok(self
                .jws
                .as_ref()
                .ok_or_else(|| JoseError::input("token has not been signed yet"))?
                .export());
        }

        let payload = serde_json::to_vec(&self.payload)
            .map_err(|err| JoseError::input(format!("could not serialize payload: {err}")))?;
        Ok(format!(
            "{ALG_NONE_HEADER_B64}.{}.",
            BASE64_URL_SAFE_NO_PAD.encode(payload)
        ))
    }

    /// Sign this token with the given key.
    ///
    /// The configured `alg`/`kid`/`enc` values are copied into the header
    /// object first; any previously held signed representation is released
    /// before the new one is installed. Signing with `alg` = `none`
    /// succeeds without computing anything: the unsigned serialization is
    /// produced by [`serialize`](Self::serialize).
    pub fn sign(&mut self, jwk: &JWK) -> Result<()> {
        self.copy_fields_into_header();
        self.signature_poisoned = false;

        if self.algorithm == alg::NONE {
            self.jws = None;
            return Ok(());
        }

        let payload = serde_json::to_vec(&self.payload)
            .map_err(|err| JoseError::input(format!("could not serialize payload: {err}")))?;
        self.jws = Some(CompactJws::sign(&self.header, &payload, jwk)?);
        Ok(())
    }

    /// Encrypt `payload` for the given key, returning the 5-segment
    /// compact JWE serialization.
    ///
    /// The payload is passed explicitly rather than taken from this token:
    /// the usual content of a JWE is a complete serialized inner token
    /// (nested JWT). This token contributes the protected header,
    /// including its `alg` (key management) and `enc` (content
    /// encryption) selections.
    pub fn encrypt(&mut self, jwk: &JWK, payload: &str) -> Result<String> {
        self.copy_fields_into_header();
        CompactJwe::encrypt(&self.header, jwk, payload.as_bytes())
    }

    fn copy_fields_into_header(&mut self) {
        self.header.insert(
            "alg".to_owned(),
            Value::String(self.algorithm.clone()),
        );
        if let Some(kid) = &self.kid {
            self.header
                .insert("kid".to_owned(), Value::String(kid.clone()));
        }
        if let Some(enc) = &self.enc {
            self.header
                .insert("enc".to_owned(), Value::String(enc.clone()));
        }
    }

    /// The signature algorithm (`alg` header), `none` for a fresh token.
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// Set the `alg` header field.
    pub fn set_algorithm(&mut self, algorithm: impl Into<String>) {
        self.algorithm = algorithm.into();
    }

    /// The `kid` header field, if any.
    pub fn kid(&self) -> Option<&str> {
        self.kid.as_deref()
    }

    /// Set the `kid` header field.
    pub fn set_kid(&mut self, kid: impl Into<String>) {
        self.kid = Some(kid.into());
    }

    /// The `enc` header field, if any.
    pub fn enc(&self) -> Option<&str> {
        self.enc.as_deref()
    }

    /// Set the `enc` (content encryption) header field.
    pub fn set_enc(&mut self, enc: impl Into<String>) {
        self.enc = Some(enc.into());
    }

    /// The owned protected-header JSON object.
    pub fn header(&self) -> &Map<String, Value> {
        &self.header
    }

    /// Look up a header value.
    pub fn header_get(&self, name: &str) -> Option<&Value> {
        self.header.get(name)
    }

    /// Set a header value.
    pub fn header_set(&mut self, name: impl Into<String>, value: impl Serialize) -> Result<()> {
        let value = serde_json::to_value(value)
            .map_err(|err| JoseError::input(format!("header value: {err}")))?;
        self.header.insert(name.into(), value);
        Ok(())
    }

    /// The payload JSON object.
    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    /// Set a payload claim.
    pub fn set_claim(&mut self, name: impl Into<String>, value: impl Serialize) -> Result<()> {
        let value = serde_json::to_value(value)
            .map_err(|err| JoseError::input(format!("claim value: {err}")))?;
        self.payload.insert(name.into(), value);
        Ok(())
    }

    /// The registered claims extracted when this token was parsed.
    pub fn claims(&self) -> &RegisteredClaims {
        &self.claims
    }

    /// Attempt to verify the stored signature with a single key.
    pub(crate) fn try_verify_with(&self, jwk: &JWK) -> Result<()> {
        match &self.jws {
            Some(jws) => jws.verify(jwk),
            None if self.signature_poisoned => Err(JoseError::CorruptedSignatureHandle),
            None => Err(JoseError::input("token has no signature to verify")),
        }
    }

    /// Drop the signed representation after a failed verification against
    /// a provider that corrupts its own state on failure.
    pub(crate) fn invalidate_signature(&mut self) {
        self.jws = None;
        self.signature_poisoned = true;
    }

    pub(crate) fn has_signature(&self) -> bool {
        self.jws.is_some()
    }
}

impl Default for JWT {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use tokio_test::assert_err;

    use super::*;
    use crate::jose::{KeySet, jwa::enc, testutil};

    #[test]
    fn unsigned_token_shape_is_bit_exact() {
        let mut jwt = JWT::new();
        jwt.set_claim("a", 1).unwrap();
        let jwk = testutil::oct_jwk();
        jwt.sign(&jwk).unwrap();
        assert_eq!(jwt.serialize().unwrap(), "eyJhbGciOiJub25lIn0.eyJhIjoxfQ.");
    }

    #[test]
    fn unsigned_token_parses_back() {
        let keys = KeySet::new();
        let jwt = JWT::parse("eyJhbGciOiJub25lIn0.eyJhIjoxfQ.", &keys).unwrap();
        assert_eq!(jwt.algorithm(), "none");
        assert_eq!(jwt.payload().get("a").and_then(Value::as_i64), Some(1));
        assert_eq!(jwt.serialize().unwrap(), "eyJhbGciOiJub25lIn0.eyJhIjoxfQ.");
    }

    #[test]
    fn sign_and_parse_round_trip_preserves_payload() {
        let jwk = testutil::oct_jwk();

        let mut jwt = JWT::new();
        jwt.set_algorithm(crate::jose::jwa::alg::HS256);
        jwt.set_kid(jwk.kid().unwrap());
        jwt.set_claim("sub", "alice").unwrap();
        jwt.set_claim("iat", 1700000000).unwrap();
        jwt.set_claim("nested", serde_json::json!({"deep": [1, 2, 3]}))
            .unwrap();
        jwt.sign(&jwk).unwrap();

        let compact = jwt.serialize().unwrap();
        let mut keys = KeySet::new();
        keys.insert(testutil::oct_jwk()).unwrap();

        let mut parsed = JWT::parse(&compact, &keys).unwrap();
        keys.verify(&mut parsed).unwrap();
        assert_eq!(parsed.payload(), jwt.payload());
        assert_eq!(parsed.claims().sub.as_deref(), Some("alice"));
        assert_eq!(parsed.claims().iat, Some(1700000000.0));
        assert_eq!(parsed.claims().exp, None);
    }

    #[test]
    fn claims_with_wrong_types_are_ignored() {
        let keys = KeySet::new();
        // {"iss":42,"exp":"soon"}
        let payload = BASE64_URL_SAFE_NO_PAD.encode(b"{\"iss\":42,\"exp\":\"soon\"}");
        let jwt = JWT::parse(&format!("{ALG_NONE_HEADER_B64}.{payload}."), &keys).unwrap();
        assert_eq!(jwt.claims().iss, None);
        assert_eq!(jwt.claims().exp, None);
    }

    #[test]
    fn non_object_payloads_are_rejected() {
        let keys = KeySet::new();
        for bad_payload in [&b"[1,2,3]"[..], b"\"scalar\"", b"not json"] {
            let payload = BASE64_URL_SAFE_NO_PAD.encode(bad_payload);
            let err = JWT::parse(&format!("{ALG_NONE_HEADER_B64}.{payload}."), &keys).unwrap_err();
            assert!(matches!(err, JoseError::InputFormat(_)));
        }
    }

    #[test]
    fn serialize_before_sign_fails_for_real_algorithms() {
        let mut jwt = JWT::new();
        jwt.set_algorithm(crate::jose::jwa::alg::HS256);
        assert_err!(jwt.serialize());
    }

    #[test]
    fn encrypt_then_parse_round_trips_nested_token() {
        let kek = testutil::oct_jwk_len(16);

        // inner token, unsigned for the sake of the test
        let mut inner = JWT::new();
        inner.set_claim("a", 1).unwrap();
        let inner_compact = inner.serialize().unwrap();

        let mut envelope = JWT::new();
        envelope.set_algorithm(crate::jose::jwa::alg::A128KW);
        envelope.set_enc(enc::A128CBC_HS256);
        envelope.set_kid(kek.kid().unwrap());
        let jwe_compact = envelope.encrypt(&kek, &inner_compact).unwrap();
        assert_eq!(jwe_compact.split('.').count(), 5);

        let mut keys = KeySet::new();
        keys.insert(testutil::oct_jwk_len(16)).unwrap();
        let parsed = JWT::parse(&jwe_compact, &keys).unwrap();
        assert_eq!(parsed.algorithm(), "none");
        assert_eq!(parsed.payload().get("a").and_then(Value::as_i64), Some(1));
    }

    #[test]
    fn header_get_set_round_trip() {
        let mut jwt = JWT::new();
        jwt.header_set("typ", "JWT").unwrap();
        assert_eq!(
            jwt.header_get("typ").and_then(Value::as_str),
            Some("JWT")
        );
    }
}
