//! ECDSA signatures: the (r, s) pair, recovery ids, and the raw signing,
//! verification, and recovery primitives on top of the multiplication
//! contexts.

use crate::error::{Error, Result};
use crate::field::FieldElement;
use crate::group::{AffinePoint, JacobianPoint};
use crate::mul::EcMultContext;
use crate::mul_gen::EcMultGenContext;
use crate::scalar::Scalar;
use rand_core::{CryptoRng, RngCore};
use zeroize::Zeroize;

/// p − n: signature r values below this bound admit a second candidate
/// x-coordinate r + n that is still a valid field element.
const P_MINUS_N: Scalar = Scalar::from_raw([
    0x402D_A172_2FC9_BAEE,
    0x4551_2319_50B7_5FC4,
    0x0000_0000_0000_0001,
    0x0000_0000_0000_0000,
]);

/// The group order n lifted into the base field.
const ORDER_AS_FE: FieldElement = FieldElement::from_raw([
    0x25E8CD0364141,
    0xE6AF48A03BBFD,
    0xFFFFFFEBAAEDC,
    0xFFFFFFFFFFFFF,
    0x0FFFFFFFFFFFF,
]);

/// An ECDSA signature: a pair of non-zero scalars (r, s).
///
/// The low-s canonical form is not enforced; [`Signature::normalize_s`]
/// converts on request.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Signature {
    pub(crate) r: Scalar,
    pub(crate) s: Scalar,
}

impl Signature {
    /// Assembles a signature from its scalars, rejecting zero components.
    pub fn from_scalars(r: Scalar, s: Scalar) -> Result<Self> {
        if bool::from(r.is_zero() | s.is_zero()) {
            return Err(Error::InvalidSignature);
        }
        Ok(Self { r, s })
    }

    /// The `r` component.
    pub fn r(&self) -> &Scalar {
        &self.r
    }

    /// The `s` component.
    pub fn s(&self) -> &Scalar {
        &self.s
    }

    /// Parses the 64-byte compact form r ‖ s (big-endian); each component
    /// must be in [1, n).
    pub fn from_compact(bytes: &[u8; 64]) -> Result<Self> {
        let mut half = [0u8; 32];
        half.copy_from_slice(&bytes[..32]);
        let (r, overflow_r) = Scalar::from_bytes(&half);
        half.copy_from_slice(&bytes[32..]);
        let (s, overflow_s) = Scalar::from_bytes(&half);
        if bool::from(overflow_r | overflow_s) {
            return Err(Error::InvalidSignature);
        }
        Self::from_scalars(r, s)
    }

    /// Serializes to the 64-byte compact form r ‖ s.
    pub fn to_compact(&self) -> [u8; 64] {
        let mut out = [0u8; 64];
        out[..32].copy_from_slice(&self.r.to_bytes());
        out[32..].copy_from_slice(&self.s.to_bytes());
        out
    }

    /// Normalizes the signature into "low S" form as described in
    /// [BIP 0062: Dealing with Malleability][1], or returns `None` if it
    /// already is low.
    ///
    /// A caller holding a recovery id for this signature must flip its
    /// y-parity bit when normalization occurred.
    ///
    /// [1]: https://github.com/bitcoin/bips/blob/master/bip-0062.mediawiki
    pub fn normalize_s(&self) -> Option<Self> {
        if bool::from(self.s.is_high()) {
            Some(Self {
                r: self.r,
                s: self.s.negate(),
            })
        } else {
            None
        }
    }
}

/// Recovery IDs, a.k.a. "recid".
///
/// An integer in 0..=3 carried alongside a signature, allowing the verifier
/// to reconstruct the signing public key:
///
/// - low bit: was the y-coordinate of the ephemeral point k×G odd?
/// - high bit: did the x-coordinate of k×G overflow the group order,
///   requiring a reduction when computing `r`?
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
pub struct RecoveryId(u8);

impl RecoveryId {
    /// Maximum supported value for the recovery ID (inclusive).
    pub const MAX: u8 = 3;

    /// Creates a [`RecoveryId`] from its two component bits.
    pub const fn new(is_y_odd: bool, is_x_reduced: bool) -> Self {
        Self(((is_x_reduced as u8) << 1) | (is_y_odd as u8))
    }

    /// Did the x-coordinate of k×G overflow the group order?
    pub const fn is_x_reduced(self) -> bool {
        (self.0 & 0b10) != 0
    }

    /// Is the y-coordinate of k×G odd?
    pub const fn is_y_odd(self) -> bool {
        (self.0 & 1) != 0
    }

    /// Converts a `u8` into a [`RecoveryId`].
    pub const fn from_byte(byte: u8) -> Option<Self> {
        if byte <= Self::MAX {
            Some(Self(byte))
        } else {
            None
        }
    }

    /// Converts this [`RecoveryId`] into a `u8`.
    pub const fn to_byte(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for RecoveryId {
    type Error = Error;

    fn try_from(byte: u8) -> Result<Self> {
        Self::from_byte(byte).ok_or(Error::InvalidRecoveryId)
    }
}

impl From<RecoveryId> for u8 {
    fn from(id: RecoveryId) -> u8 {
        id.0
    }
}

/// A message to be signed or verified: up to 32 bytes, interpreted as a
/// big-endian integer and reduced modulo the group order.
///
/// Hashing is the caller's responsibility; pass the digest here.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Message(pub(crate) Scalar);

impl Message {
    /// Interprets up to 32 bytes, right-aligned, as the message scalar.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        if bytes.len() > 32 {
            return Err(Error::InvalidMessage);
        }
        let mut buf = [0u8; 32];
        buf[32 - bytes.len()..].copy_from_slice(bytes);
        let m = Scalar::from_bytes_reduced(&buf);
        buf.zeroize();
        Ok(Self(m))
    }

    /// Interprets a 32-byte digest as the message scalar.
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self(Scalar::from_bytes_reduced(bytes))
    }
}

/// An ephemeral signing nonce in [1, n).
///
/// The caller is responsible for uniqueness and unpredictability: a
/// repeated or predictable nonce reveals the secret key.
#[derive(Clone)]
pub struct Nonce(pub(crate) Scalar);

impl Nonce {
    /// Validates 32 big-endian bytes as a nonce; rejects zero and values
    /// not below the group order.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self> {
        let (k, overflow) = Scalar::from_bytes(bytes);
        if bool::from(overflow | k.is_zero()) {
            return Err(Error::InvalidNonce);
        }
        Ok(Self(k))
    }

    /// Draws a fresh random nonce.
    pub fn random<R: CryptoRng + RngCore>(rng: &mut R) -> Self {
        Self(Scalar::random(rng))
    }
}

impl Drop for Nonce {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Produces a signature and recovery id over `message` with the secret
/// scalar `seckey` and the ephemeral scalar `nonce`, both already validated
/// to lie in [1, n). Constant time in all secret inputs.
pub(crate) fn sign_raw(
    gen_ctx: &EcMultGenContext,
    seckey: &Scalar,
    message: &Scalar,
    nonce: &Scalar,
) -> Result<(Signature, RecoveryId)> {
    let mut rp = gen_ctx.mul_base(nonce);
    let mut p = rp.to_affine();
    let (r, overflow) = Scalar::from_bytes(&p.x.to_bytes());
    let recid = RecoveryId::new(p.y.is_odd().into(), overflow.into());
    rp.zeroize();

    if bool::from(r.is_zero()) {
        p.zeroize();
        return Err(Error::SignFailed);
    }

    let mut rd = r.mul(seckey);
    let mut sum = rd.add(message);
    let mut kinv = nonce.invert();
    let s = kinv.mul(&sum);

    p.zeroize();
    rd.zeroize();
    sum.zeroize();
    kinv.zeroize();

    if bool::from(s.is_zero()) {
        return Err(Error::SignFailed);
    }
    Ok((Signature { r, s }, recid))
}

/// Checks a signature over `message` against a public key. Variable time;
/// all inputs are public.
pub(crate) fn verify_raw(
    ctx: &EcMultContext,
    sig: &Signature,
    pubkey: &AffinePoint,
    message: &Scalar,
) -> bool {
    if bool::from(sig.r.is_zero() | sig.s.is_zero()) {
        return false;
    }

    let sn = sig.s.invert();
    let u1 = sn.mul(message);
    let u2 = sn.mul(&sig.r);
    let pr = ctx.ecmult(&JacobianPoint::from_affine(pubkey), &u2, &u1);
    if pr.is_infinity() {
        return false;
    }

    // accept iff pr.x ≡ r (mod n); pr.x is reduced mod p, so both r and
    // (when it exists as a field element) r + n are candidates
    let xr = FieldElement::from_bytes_unchecked(&sig.r.to_bytes());
    if pr.eq_x_var(&xr) {
        return true;
    }
    if sig.r.lt_var(&P_MINUS_N) && pr.eq_x_var(&xr.add(&ORDER_AS_FE)) {
        return true;
    }
    false
}

/// Reconstructs the public key of a signature over `message`. Variable
/// time; all inputs are public.
pub(crate) fn recover_raw(
    ctx: &EcMultContext,
    sig: &Signature,
    recid: RecoveryId,
    message: &Scalar,
) -> Result<AffinePoint> {
    if bool::from(sig.r.is_zero() | sig.s.is_zero()) {
        return Err(Error::InvalidSignature);
    }

    let mut fx = FieldElement::from_bytes_unchecked(&sig.r.to_bytes());
    if recid.is_x_reduced() {
        if !sig.r.lt_var(&P_MINUS_N) {
            return Err(Error::RecoveryFailed);
        }
        fx = fx.add(&ORDER_AS_FE).normalize();
    }
    let big_r = AffinePoint::decompress_var(&fx, recid.is_y_odd()).ok_or(Error::RecoveryFailed)?;

    let rn = sig.r.invert();
    let u1 = rn.mul(message).negate();
    let u2 = rn.mul(&sig.s);
    let qj = ctx.ecmult(&JacobianPoint::from_affine(&big_r), &u2, &u1);
    if qj.is_infinity() {
        return Err(Error::RecoveryFailed);
    }
    Ok(qj.to_affine())
}

#[cfg(test)]
mod tests {
    use super::{sign_raw, verify_raw, RecoveryId, Signature};
    use crate::scalar::Scalar;
    use hex_literal::hex;

    #[test]
    fn recovery_id_bits() {
        assert_eq!(RecoveryId::new(false, false).to_byte(), 0);
        assert_eq!(RecoveryId::new(true, false).to_byte(), 1);
        assert_eq!(RecoveryId::new(false, true).to_byte(), 2);
        assert_eq!(RecoveryId::new(true, true).to_byte(), 3);
    }

    #[test]
    fn recovery_id_try_from() {
        for n in 0u8..=3 {
            assert_eq!(RecoveryId::try_from(n).unwrap().to_byte(), n);
        }
        for n in 4u8..=255 {
            assert!(RecoveryId::try_from(n).is_err());
        }
    }

    #[test]
    fn compact_roundtrip() {
        let bytes = hex!(
            "F9308A019258C31049344F85F89D5229B531C845836F99B08601F113BCE036F9"
            "A676070161E62D0B31233559A613E1C6CE76DB2EAD4ABC20AF01A10D7E407A51"
        );
        let sig = Signature::from_compact(&bytes).unwrap();
        assert_eq!(sig.to_compact(), bytes);
    }

    #[test]
    fn compact_rejects_out_of_range() {
        // r = n
        let mut bytes = [0u8; 64];
        bytes[..32].copy_from_slice(&hex!(
            "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141"
        ));
        bytes[63] = 1;
        assert!(Signature::from_compact(&bytes).is_err());
        // s = 0
        let mut bytes = [0u8; 64];
        bytes[31] = 1;
        assert!(Signature::from_compact(&bytes).is_err());
    }

    #[test]
    fn normalize_s() {
        let low = Signature::from_scalars(Scalar::ONE, Scalar::ONE).unwrap();
        assert!(low.normalize_s().is_none());

        let high = Signature::from_scalars(Scalar::ONE, Scalar::ONE.negate()).unwrap();
        let normalized = high.normalize_s().unwrap();
        assert_eq!(normalized.s, Scalar::ONE);
        assert!(normalized.normalize_s().is_none());
    }

    #[test]
    fn sign_matches_vector() {
        // d = 2, m = 0x0101...01, k = 3
        let gen = crate::mul_gen::EcMultGenContext::new();
        let d = Scalar::from_raw([2, 0, 0, 0]);
        let m = Scalar::from_bytes_reduced(&[1u8; 32]);
        let k = Scalar::from_raw([3, 0, 0, 0]);
        let (sig, recid) = sign_raw(&gen, &d, &m, &k).unwrap();
        assert_eq!(
            sig.r.to_bytes(),
            hex!("F9308A019258C31049344F85F89D5229B531C845836F99B08601F113BCE036F9")
        );
        assert_eq!(
            sig.s.to_bytes(),
            hex!("A676070161E62D0B31233559A613E1C6CE76DB2EAD4ABC20AF01A10D7E407A51")
        );
        assert_eq!(recid.to_byte(), 0);
    }

    #[test]
    fn verify_rejects_zero_scalars() {
        let ctx = crate::mul::EcMultContext::new();
        let pk = crate::group::AffinePoint::GENERATOR;
        let sig = Signature {
            r: Scalar::ONE,
            s: Scalar::ZERO,
        };
        assert!(!verify_raw(&ctx, &sig, &pk, &Scalar::ONE));
    }
}
