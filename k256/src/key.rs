//! Secret and public keys, their SEC1 encodings, and secret-key tweaks.

use crate::der;
use crate::error::{Error, Result};
use crate::field::FieldElement;
use crate::group::AffinePoint;
use crate::scalar::Scalar;
use core::fmt;
use rand_core::{CryptoRng, RngCore};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

pub(crate) const TAG_PUBKEY_EVEN: u8 = 0x02;
pub(crate) const TAG_PUBKEY_ODD: u8 = 0x03;
pub(crate) const TAG_PUBKEY_UNCOMPRESSED: u8 = 0x04;
pub(crate) const TAG_PUBKEY_HYBRID_EVEN: u8 = 0x06;
pub(crate) const TAG_PUBKEY_HYBRID_ODD: u8 = 0x07;

/// A secret key: a scalar in [1, n).
///
/// The value is wiped from memory on drop. `Debug` does not reveal it.
#[derive(Clone)]
pub struct SecretKey(pub(crate) Scalar);

impl SecretKey {
    /// Validates 32 big-endian bytes as a secret key; rejects zero and
    /// values not below the group order.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self> {
        let (sec, overflow) = Scalar::from_bytes(bytes);
        if bool::from(overflow | sec.is_zero()) {
            return Err(Error::InvalidSecretKey);
        }
        Ok(Self(sec))
    }

    /// Encodes the secret key as 32 big-endian bytes.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    /// Generates a random secret key by rejection sampling.
    pub fn random<R: CryptoRng + RngCore>(rng: &mut R) -> Self {
        Self(Scalar::random(rng))
    }

    /// Imports a secret key from the legacy EC private key DER envelope
    /// (only the outer framing and the key octets are inspected).
    pub fn from_der(input: &[u8]) -> Result<Self> {
        der::privkey_from_der(input).map(Self)
    }

    /// Adds a tweak to the key: sec ← (sec + t) mod n. Fails if the tweak
    /// is not below the group order or the sum is zero. Constant time.
    pub fn tweak_add(&self, tweak: &[u8; 32]) -> Result<Self> {
        let (t, overflow) = Scalar::from_bytes(tweak);
        let sum = self.0.add(&t);
        if bool::from(overflow | sum.is_zero()) {
            return Err(Error::InvalidTweak);
        }
        Ok(Self(sum))
    }

    /// Multiplies the key by a tweak: sec ← (sec · t) mod n. Fails if the
    /// tweak is zero or not below the group order. Constant time.
    pub fn tweak_mul(&self, tweak: &[u8; 32]) -> Result<Self> {
        let (t, overflow) = Scalar::from_bytes(tweak);
        if bool::from(overflow | t.is_zero()) {
            return Err(Error::InvalidTweak);
        }
        Ok(Self(self.0.mul(&t)))
    }
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl PartialEq for SecretKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for SecretKey {}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(...)")
    }
}

/// A public key: a non-infinity point on the curve.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PublicKey(pub(crate) AffinePoint);

impl PublicKey {
    /// Parses a SEC1-encoded public key: 33-byte compressed (tags 02/03),
    /// 65-byte uncompressed (tag 04), or 65-byte hybrid (tags 06/07, whose
    /// parity must match the y-coordinate). Hybrid keys are accepted but
    /// never emitted.
    pub fn parse(input: &[u8]) -> Result<Self> {
        match input.len() {
            33 if input[0] == TAG_PUBKEY_EVEN || input[0] == TAG_PUBKEY_ODD => {
                let x = field_element(&input[1..33])?;
                let point = AffinePoint::decompress_var(&x, input[0] == TAG_PUBKEY_ODD)
                    .ok_or(Error::InvalidPublicKey)?;
                Ok(Self(point))
            }
            65 if input[0] == TAG_PUBKEY_UNCOMPRESSED
                || input[0] == TAG_PUBKEY_HYBRID_EVEN
                || input[0] == TAG_PUBKEY_HYBRID_ODD =>
            {
                let x = field_element(&input[1..33])?;
                let y = field_element(&input[33..65])?;
                if (input[0] == TAG_PUBKEY_HYBRID_EVEN || input[0] == TAG_PUBKEY_HYBRID_ODD)
                    && bool::from(y.is_odd()) != (input[0] == TAG_PUBKEY_HYBRID_ODD)
                {
                    return Err(Error::InvalidPublicKey);
                }
                let point = AffinePoint::from_xy(x, y);
                if !point.is_valid_var() {
                    return Err(Error::InvalidPublicKey);
                }
                Ok(Self(point))
            }
            _ => Err(Error::InvalidPublicKey),
        }
    }

    /// Serializes to the 33-byte compressed form.
    pub fn serialize_compressed(&self) -> [u8; 33] {
        let mut out = [0u8; 33];
        let y = self.0.y().normalize();
        out[0] = if bool::from(y.is_odd()) {
            TAG_PUBKEY_ODD
        } else {
            TAG_PUBKEY_EVEN
        };
        out[1..].copy_from_slice(&self.0.x().normalize().to_bytes());
        out
    }

    /// Serializes to the 65-byte uncompressed form.
    pub fn serialize_uncompressed(&self) -> [u8; 65] {
        let mut out = [0u8; 65];
        out[0] = TAG_PUBKEY_UNCOMPRESSED;
        out[1..33].copy_from_slice(&self.0.x().normalize().to_bytes());
        out[33..].copy_from_slice(&self.0.y().normalize().to_bytes());
        out
    }

    /// Expands any accepted encoding to the uncompressed form.
    pub fn decompress(input: &[u8]) -> Result<[u8; 65]> {
        Ok(Self::parse(input)?.serialize_uncompressed())
    }

    /// The underlying curve point.
    pub fn as_point(&self) -> &AffinePoint {
        &self.0
    }
}

fn field_element(bytes: &[u8]) -> Result<FieldElement> {
    let mut buf = [0u8; 32];
    buf.copy_from_slice(bytes);
    Option::<FieldElement>::from(FieldElement::from_bytes(&buf)).ok_or(Error::InvalidPublicKey)
}

#[cfg(test)]
mod tests {
    use super::{PublicKey, SecretKey};
    use hex_literal::hex;

    const G_COMPRESSED: [u8; 33] =
        hex!("0279BE667EF9DCBBAC55A06295CE870B07029BFCDB2DCE28D959F2815B16F81798");
    const G_UNCOMPRESSED: [u8; 65] = hex!(
        "0479BE667EF9DCBBAC55A06295CE870B07029BFCDB2DCE28D959F2815B16F81798"
        "483ADA7726A3C4655DA4FBFC0E1108A8FD17B448A68554199C47D08FFB10D4B8"
    );

    #[test]
    fn seckey_range() {
        assert!(SecretKey::from_bytes(&[0u8; 32]).is_err());
        let n = hex!("FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141");
        assert!(SecretKey::from_bytes(&n).is_err());
        let mut n_minus_1 = n;
        n_minus_1[31] -= 1;
        assert!(SecretKey::from_bytes(&n_minus_1).is_ok());
    }

    #[test]
    fn seckey_tweaks() {
        let one = {
            let mut b = [0u8; 32];
            b[31] = 1;
            b
        };
        let sk = SecretKey::from_bytes(&one).unwrap();

        let sum = sk.tweak_add(&one).unwrap();
        let mut two = [0u8; 32];
        two[31] = 2;
        assert_eq!(sum.to_bytes(), two);

        let prod = sum.tweak_mul(&two).unwrap();
        let mut four = [0u8; 32];
        four[31] = 4;
        assert_eq!(prod.to_bytes(), four);

        assert!(sk.tweak_mul(&[0u8; 32]).is_err());
        // tweak = n - 1 makes sec + t = 0 for sec = 1
        let n_minus_1 =
            hex!("FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364140");
        assert!(sk.tweak_add(&n_minus_1).is_err());
    }

    #[test]
    fn pubkey_roundtrip() {
        let pk = PublicKey::parse(&G_COMPRESSED).unwrap();
        assert_eq!(pk.serialize_compressed(), G_COMPRESSED);
        assert_eq!(pk.serialize_uncompressed(), G_UNCOMPRESSED);

        let pk2 = PublicKey::parse(&G_UNCOMPRESSED).unwrap();
        assert_eq!(pk, pk2);
    }

    #[test]
    fn pubkey_hybrid() {
        // G has an even y, so the hybrid tag must be 06
        let mut hybrid = G_UNCOMPRESSED;
        hybrid[0] = 0x06;
        assert!(PublicKey::parse(&hybrid).is_ok());
        hybrid[0] = 0x07;
        assert!(PublicKey::parse(&hybrid).is_err());
    }

    #[test]
    fn pubkey_rejects_malformed() {
        // wrong length
        assert!(PublicKey::parse(&G_COMPRESSED[..32]).is_err());
        // wrong tag for the length
        let mut bad = G_COMPRESSED;
        bad[0] = 0x04;
        assert!(PublicKey::parse(&bad).is_err());
        // off-curve uncompressed point: flip one bit of y
        let mut off = G_UNCOMPRESSED;
        off[64] ^= 1;
        assert!(PublicKey::parse(&off).is_err());
        // x not below the field modulus
        let mut big_x = G_COMPRESSED;
        big_x[1..].copy_from_slice(&[0xFF; 32]);
        assert!(PublicKey::parse(&big_x).is_err());
    }

    #[test]
    fn decompress_matches_uncompressed() {
        assert_eq!(PublicKey::decompress(&G_COMPRESSED).unwrap(), G_UNCOMPRESSED);
    }
}
