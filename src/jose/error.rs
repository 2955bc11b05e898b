use thiserror::Error;

/// Result type used throughout the [`jose`] module.
///
/// [`jose`]: crate::jose
pub type Result<T> = std::result::Result<T, JoseError>;

#[derive(Debug, Error)]
#[non_exhaustive]
/// Errors produced while building, parsing, verifying, decrypting,
/// signing or encrypting JOSE entities.
///
/// Every operation either fully completes or returns one of these and
/// leaves nothing behind: partially built keys and tokens are dropped
/// before the error is surfaced.
pub enum JoseError {
    /// Malformed JSON, PEM, DER or compact serialization, or a payload
    /// that is not a JSON object.
    #[error("malformed input: {0}")]
    InputFormat(String),

    /// Algorithm identifier not in the supported set, or an algorithm
    /// combined with key material of the wrong type.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// A `kid` was specified but no key with that id is configured.
    #[error("could not find key with kid: {0}")]
    KeyNotFound(String),

    /// The kid-less trial loop ran out of candidate keys.
    ///
    /// Only the error of the last attempt is retained; earlier per-key
    /// failures are reported through `tracing` events as they happen.
    #[error("{operation} failed against all {tried} candidate key(s): {last}")]
    KeysExhausted {
        operation: &'static str,
        tried: usize,
        last: String,
    },

    /// Verification or decryption was requested against an empty key set.
    #[error("no verification or decryption keys configured")]
    NoKeysConfigured,

    /// The underlying cryptographic primitive reported a failure.
    #[error("crypto primitive failure: {0}")]
    CryptoPrimitive(String),

    /// The token's signature handle was invalidated by an earlier failed
    /// verification against a provider that corrupts its own state on
    /// failure (see [`ProviderProfile`]).
    ///
    /// [`ProviderProfile`]: crate::jose::ProviderProfile
    #[error("signature handle was invalidated after a failed verification")]
    CorruptedSignatureHandle,
}

impl JoseError {
    /// Shorthand for a [`JoseError::CryptoPrimitive`] naming the failed operation.
    ///
    /// The provider's own error values are deliberately unspecific, so the
    /// operation name is the diagnostic.
    pub(crate) fn crypto(operation: impl Into<String>) -> Self {
        Self::CryptoPrimitive(operation.into())
    }

    /// Shorthand for a [`JoseError::InputFormat`].
    pub(crate) fn input(msg: impl Into<String>) -> Self {
        Self::InputFormat(msg.into())
    }
}
