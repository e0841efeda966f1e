//! The `Secp256k1` context: explicit ownership of the precomputed tables
//! and the high-level signing, verification, and recovery operations.

use crate::der::{self, DerPrivateKey};
use crate::ecdsa::{self, Message, Nonce, RecoveryId, Signature};
use crate::error::{Error, Result};
use crate::key::{PublicKey, SecretKey};
use crate::group::JacobianPoint;
use crate::mul::EcMultContext;
use crate::mul_gen::EcMultGenContext;
use crate::scalar::Scalar;
use rand_core::{CryptoRng, RngCore};
use zeroize::Zeroize;

/// Precomputed state for secp256k1 operations.
///
/// The context is an explicit immutable value: build it once at startup
/// with the capabilities you need and share it by reference — after
/// construction it never changes, so `&Secp256k1` may cross threads freely.
/// Dropping the context releases its tables.
///
/// # Panics
///
/// Using a capability the context was not built with — signing with
/// [`Secp256k1::verification_only`] or verifying with
/// [`Secp256k1::signing_only`] — is a programmer error and panics.
pub struct Secp256k1 {
    ecmult: Option<EcMultContext>,
    ecmult_gen: Option<EcMultGenContext>,
}

impl Secp256k1 {
    /// Builds a context supporting both signing and verification
    /// (roughly a mebibyte of tables).
    pub fn new() -> Self {
        Self {
            ecmult: Some(EcMultContext::new()),
            ecmult_gen: Some(EcMultGenContext::new()),
        }
    }

    /// Builds a context that can only sign (64 KiB of tables).
    pub fn signing_only() -> Self {
        Self {
            ecmult: None,
            ecmult_gen: Some(EcMultGenContext::new()),
        }
    }

    /// Builds a context that can only verify and recover.
    pub fn verification_only() -> Self {
        Self {
            ecmult: Some(EcMultContext::new()),
            ecmult_gen: None,
        }
    }

    /// Whether this context supports signing.
    pub fn can_sign(&self) -> bool {
        self.ecmult_gen.is_some()
    }

    /// Whether this context supports verification and recovery.
    pub fn can_verify(&self) -> bool {
        self.ecmult.is_some()
    }

    /// Re-blinds the signing tables with fresh randomness, hardening the
    /// constant-time fixed-base multiplication against power analysis.
    /// Recommended once after construction when an RNG is available.
    pub fn randomize<R: CryptoRng + RngCore>(&mut self, rng: &mut R) {
        match &mut self.ecmult_gen {
            Some(gen) => gen.randomize(rng),
            None => panic!("this context does not support signing"),
        }
    }

    fn gen_ctx(&self) -> &EcMultGenContext {
        match &self.ecmult_gen {
            Some(ctx) => ctx,
            None => panic!("this context does not support signing"),
        }
    }

    fn mult_ctx(&self) -> &EcMultContext {
        match &self.ecmult {
            Some(ctx) => ctx,
            None => panic!("this context does not support verification"),
        }
    }

    /// Signs a message with the given secret key and caller-provided nonce.
    ///
    /// Fails with [`Error::SignFailed`] in the astronomically rare case the
    /// nonce maps to r = 0 or s = 0; retry with a fresh nonce.
    pub fn sign(&self, msg: &Message, seckey: &SecretKey, nonce: &Nonce) -> Result<Signature> {
        self.sign_recoverable(msg, seckey, nonce).map(|(sig, _)| sig)
    }

    /// Signs a message, additionally returning the recovery id that lets a
    /// verifier reconstruct the public key from the signature.
    pub fn sign_recoverable(
        &self,
        msg: &Message,
        seckey: &SecretKey,
        nonce: &Nonce,
    ) -> Result<(Signature, RecoveryId)> {
        ecdsa::sign_raw(self.gen_ctx(), &seckey.0, &msg.0, &nonce.0)
    }

    /// Verifies a signature over a message against a public key.
    pub fn verify(&self, msg: &Message, sig: &Signature, pubkey: &PublicKey) -> Result<()> {
        if ecdsa::verify_raw(self.mult_ctx(), sig, &pubkey.0, &msg.0) {
            Ok(())
        } else {
            Err(Error::IncorrectSignature)
        }
    }

    /// Recovers the public key that signed `msg` from a signature and its
    /// recovery id.
    pub fn recover(&self, msg: &Message, sig: &Signature, recid: RecoveryId) -> Result<PublicKey> {
        ecdsa::recover_raw(self.mult_ctx(), sig, recid, &msg.0).map(PublicKey)
    }

    /// Derives the public key of a secret key (constant time).
    pub fn public_key(&self, seckey: &SecretKey) -> PublicKey {
        let pj = self.gen_ctx().mul_base(&seckey.0);
        PublicKey(pj.to_affine())
    }

    /// Adds `tweak`·G to a public key. Fails if the tweak is not below the
    /// group order or the sum is the point at infinity.
    pub fn tweak_add_public_key(&self, pubkey: &PublicKey, tweak: &[u8; 32]) -> Result<PublicKey> {
        let (t, overflow) = Scalar::from_bytes(tweak);
        if bool::from(overflow) {
            return Err(Error::InvalidTweak);
        }
        let r = self.mult_ctx().ecmult(
            &JacobianPoint::from_affine(&pubkey.0),
            &Scalar::ONE,
            &t,
        );
        if r.is_infinity() {
            return Err(Error::InvalidTweak);
        }
        Ok(PublicKey(r.to_affine()))
    }

    /// Multiplies a public key by a tweak. Fails if the tweak is zero or
    /// not below the group order.
    pub fn tweak_mul_public_key(&self, pubkey: &PublicKey, tweak: &[u8; 32]) -> Result<PublicKey> {
        let (t, overflow) = Scalar::from_bytes(tweak);
        if bool::from(overflow | t.is_zero()) {
            return Err(Error::InvalidTweak);
        }
        let r = self.mult_ctx().ecmult(
            &JacobianPoint::from_affine(&pubkey.0),
            &t,
            &Scalar::ZERO,
        );
        Ok(PublicKey(r.to_affine()))
    }

    /// Exports a secret key in the legacy EC private key DER envelope,
    /// byte-compatible with OpenSSL's `EC_KEY` serialization.
    pub fn export_secret_key_der(&self, seckey: &SecretKey, compressed: bool) -> DerPrivateKey {
        let pubkey = self.public_key(seckey);
        let mut buf = [0u8; der::MAX_PRIVKEY_LEN];
        let mut seckey_bytes = seckey.to_bytes();
        let len = if compressed {
            der::privkey_to_der(&mut buf, &seckey_bytes, &pubkey.serialize_compressed())
        } else {
            der::privkey_to_der(&mut buf, &seckey_bytes, &pubkey.serialize_uncompressed())
        };
        seckey_bytes.zeroize();
        DerPrivateKey::new(buf, len)
    }
}

impl Default for Secp256k1 {
    fn default() -> Self {
        Self::new()
    }
}
