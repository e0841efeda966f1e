#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![doc = include_str!("../README.md")]
#![doc(
    html_logo_url = "https://raw.githubusercontent.com/RustCrypto/media/8f1a9894/logo.svg",
    html_favicon_url = "https://raw.githubusercontent.com/RustCrypto/media/8f1a9894/logo.svg"
)]
#![allow(clippy::needless_range_loop)]
#![forbid(unsafe_code)]
#![warn(
    clippy::unwrap_used,
    missing_docs,
    rust_2018_idioms,
    unused_lifetimes,
    unused_qualifications
)]

//! # Usage
//!
//! ```
//! use k256::{Message, Nonce, Secp256k1, SecretKey};
//!
//! let ctx = Secp256k1::new();
//!
//! let seckey = SecretKey::from_bytes(&[
//!     0x4c, 0x08, 0x83, 0xa6, 0x91, 0x02, 0xdb, 0xbd,
//!     0x02, 0x0e, 0x63, 0xeb, 0xf8, 0x8f, 0x1c, 0x30,
//!     0x2d, 0xa2, 0x2b, 0x63, 0x92, 0x5a, 0x32, 0xcc,
//!     0x7b, 0x5d, 0xa9, 0xac, 0xc9, 0x55, 0xe5, 0xe5,
//! ])?;
//! let pubkey = ctx.public_key(&seckey);
//!
//! // the message is a digest computed by the caller; the nonce must be
//! // unique and unpredictable per signature
//! let msg = Message::from_bytes(&[0xab; 32]);
//! let nonce = Nonce::from_bytes(&[0x01; 32])?;
//!
//! let sig = ctx.sign(&msg, &seckey, &nonce)?;
//! ctx.verify(&msg, &sig, &pubkey)?;
//! # Ok::<(), k256::Error>(())
//! ```

extern crate alloc;

#[cfg(test)]
extern crate std;

mod context;
mod der;
mod ecdsa;
mod error;
mod field;
mod group;
mod key;
mod mul;
mod mul_gen;
mod scalar;
mod util;

pub use crate::context::Secp256k1;
pub use crate::der::{DerPrivateKey, DerSignature};
pub use crate::ecdsa::{Message, Nonce, RecoveryId, Signature};
pub use crate::error::{Error, Result};
pub use crate::key::{PublicKey, SecretKey};

/// Low-level curve arithmetic. Most callers want the types at the crate
/// root instead; nothing here validates group membership for you.
pub mod curve {
    pub use crate::field::FieldElement;
    pub use crate::group::{AffinePoint, JacobianPoint};
    pub use crate::scalar::Scalar;
}
