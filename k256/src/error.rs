//! Error types.

use core::fmt;

/// Any error produced by this crate.
///
/// Every variant corresponds to an input-validation or arithmetic failure;
/// misusing a context (e.g. verifying with a signing-only context) is a
/// programmer error and panics instead.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// A signature encoding could not be parsed, or its scalars were zero
    /// or not below the group order.
    InvalidSignature,
    /// A well-formed signature did not verify against the key and message.
    IncorrectSignature,
    /// A public key encoding was malformed, off-curve, or the point at
    /// infinity.
    InvalidPublicKey,
    /// A secret key was zero, not below the group order, or carried in a
    /// malformed encoding.
    InvalidSecretKey,
    /// A nonce was zero or not below the group order.
    InvalidNonce,
    /// A recovery id was outside 0..=3.
    InvalidRecoveryId,
    /// A message was longer than 32 bytes.
    InvalidMessage,
    /// A tweak was not below the group order, was zero where disallowed, or
    /// its application produced an invalid key.
    InvalidTweak,
    /// The nonce produced r = 0 or s = 0; sign again with a fresh nonce.
    SignFailed,
    /// No public key could be recovered from the signature.
    RecoveryFailed,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Error::InvalidSignature => "invalid signature",
            Error::IncorrectSignature => "signature did not verify",
            Error::InvalidPublicKey => "invalid public key",
            Error::InvalidSecretKey => "invalid secret key",
            Error::InvalidNonce => "invalid nonce",
            Error::InvalidRecoveryId => "invalid recovery id",
            Error::InvalidMessage => "message longer than 32 bytes",
            Error::InvalidTweak => "invalid tweak",
            Error::SignFailed => "signing failed; retry with a fresh nonce",
            Error::RecoveryFailed => "no public key is recoverable",
        };
        f.write_str(msg)
    }
}

impl core::error::Error for Error {}

/// Result alias with this crate's [`Error`].
pub type Result<T> = core::result::Result<T, Error>;
