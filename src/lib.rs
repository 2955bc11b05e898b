//! JOSE data model and compact token processing.
//!
//! This crate implements the pieces of the JOSE (JSON Object Signing and
//! Encryption) family needed to work with compact-serialized security tokens:
//!
//! - [`jose::JWK`]: keys, built from raw material, JWK JSON documents or
//!   PEM/X.509 input (including certificate chains with `x5c`/`x5t` members)
//! - [`jose::JWT`]: header + payload tokens, parsed from or emitted as
//!   compact JWS/JWE serializations, including the unsigned `alg: none` form
//! - [`jose::KeySet`]: a kid-indexed key collection with the resolution
//!   logic that selects which candidate keys to try when verifying a
//!   signature or decrypting a ciphertext
//! - [`jose::jwa`]: the algorithm-metadata tables mapping algorithm
//!   identifiers to key types, digests and sizes
//!
//! All cryptographic primitives are delegated to [`aws-lc-rs`]; certificate
//! and PEM decoding is delegated to [`x509-parser`]. Both are re-exported
//! under [`dep`] for convenience.
//!
//! [`aws-lc-rs`]: https://docs.rs/aws-lc-rs
//! [`x509-parser`]: https://docs.rs/x509-parser

#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(not(test), warn(clippy::print_stdout, clippy::dbg_macro))]

pub mod jose;

pub mod dep {
    //! Dependencies of this crate.
    //!
    //! Exported for your convenience

    pub mod aws_lc_rs {
        //! Re-export of the [`aws-lc-rs`] crate.
        //!
        //! [`aws-lc-rs`]: https://docs.rs/aws-lc-rs

        #[doc(inline)]
        pub use aws_lc_rs::*;
    }

    pub mod x509_parser {
        //! Re-export of the [`x509_parser`] crate.
        //!
        //! [`x509_parser`]: https://docs.rs/x509_parser

        #[doc(inline)]
        pub use x509_parser::*;
    }
}
