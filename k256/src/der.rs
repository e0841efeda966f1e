//! DER encodings: ECDSA-Sig-Value signatures and the legacy SEC1 private
//! key envelope.
//!
//! Signature parsing is deliberately lenient — over-long and zero-padded
//! INTEGER bodies are tolerated — because deployed encoders disagree on
//! minimality. Serialization always emits canonical minimal DER. The
//! private key envelope reproduces the OpenSSL `EC_KEY` byte layout exactly
//! for interoperability.

use crate::ecdsa::Signature;
use crate::error::{Error, Result};
use crate::scalar::Scalar;
use core::fmt;
use zeroize::Zeroize;

/// Maximum length of a canonical signature encoding:
/// `30 len 02 21 <r:33> 02 21 <s:33>`.
const MAX_SIG_LEN: usize = 72;

/// A DER-encoded ECDSA signature:
///
/// ```text
/// ECDSA-Sig-Value ::= SEQUENCE {
///   r  INTEGER,
///   s  INTEGER
/// }
/// ```
#[derive(Clone, Copy, Eq, PartialEq)]
pub struct DerSignature {
    bytes: [u8; MAX_SIG_LEN],
    len: usize,
}

impl DerSignature {
    /// Borrows the encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// The encoded length in bytes.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.len
    }
}

impl AsRef<[u8]> for DerSignature {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl fmt::Debug for DerSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DerSignature(")?;
        for byte in self.as_bytes() {
            write!(f, "{:02x}", byte)?;
        }
        write!(f, ")")
    }
}

impl Signature {
    /// Parses a DER signature. Tolerates non-minimal INTEGER bodies but
    /// rejects r or s outside [1, n).
    pub fn from_der(input: &[u8]) -> Result<Self> {
        if input.len() < 6 || input[0] != 0x30 || input[2] != 0x02 {
            return Err(Error::InvalidSignature);
        }
        let lenr = input[3] as usize;
        if lenr == 0 || 5 + lenr >= input.len() {
            return Err(Error::InvalidSignature);
        }
        let lens = input[lenr + 5] as usize;
        if input[1] as usize != lenr + lens + 4 {
            return Err(Error::InvalidSignature);
        }
        if lens == 0 || 6 + lenr + lens > input.len() {
            return Err(Error::InvalidSignature);
        }
        if input[lenr + 4] != 0x02 {
            return Err(Error::InvalidSignature);
        }

        let r = scalar_from_int_body(&input[4..4 + lenr])?;
        let s = scalar_from_int_body(&input[6 + lenr..6 + lenr + lens])?;
        Self::from_scalars(r, s)
    }

    /// Serializes to canonical DER with minimal INTEGER encodings.
    pub fn to_der(&self) -> DerSignature {
        let (rb, rl) = int_body(&self.r);
        let (sb, sl) = int_body(&self.s);

        let mut bytes = [0u8; MAX_SIG_LEN];
        bytes[0] = 0x30;
        bytes[1] = (4 + rl + sl) as u8;
        bytes[2] = 0x02;
        bytes[3] = rl as u8;
        bytes[4..4 + rl].copy_from_slice(&rb[..rl]);
        let o = 4 + rl;
        bytes[o] = 0x02;
        bytes[o + 1] = sl as u8;
        bytes[o + 2..o + 2 + sl].copy_from_slice(&sb[..sl]);

        DerSignature {
            bytes,
            len: o + 2 + sl,
        }
    }
}

/// Decodes an INTEGER body as an unsigned value in [1, n), stripping any
/// leading zero padding.
fn scalar_from_int_body(bytes: &[u8]) -> Result<Scalar> {
    let mut b = bytes;
    while !b.is_empty() && b[0] == 0 {
        b = &b[1..];
    }
    if b.len() > 32 {
        return Err(Error::InvalidSignature);
    }
    let mut buf = [0u8; 32];
    buf[32 - b.len()..].copy_from_slice(b);
    let (v, overflow) = Scalar::from_bytes(&buf);
    if bool::from(overflow) {
        return Err(Error::InvalidSignature);
    }
    Ok(v)
}

/// Minimal unsigned INTEGER body of a scalar: leading zeros stripped, one
/// zero byte restored when the top bit would read as a sign.
fn int_body(s: &Scalar) -> ([u8; 33], usize) {
    let b = s.to_bytes();
    let mut start = 0;
    while start < 31 && b[start] == 0 {
        start += 1;
    }
    let mut out = [0u8; 33];
    let mut len = 0;
    if b[start] & 0x80 != 0 {
        len = 1;
    }
    out[len..len + 32 - start].copy_from_slice(&b[start..]);
    (out, len + 32 - start)
}

const BEGIN_COMPRESSED: [u8; 8] = [0x30, 0x81, 0xD3, 0x02, 0x01, 0x01, 0x04, 0x20];

const MIDDLE_COMPRESSED: [u8; 141] = [
    0xA0, 0x81, 0x85, 0x30, 0x81, 0x82, 0x02, 0x01, 0x01, 0x30, 0x2C, 0x06,
    0x07, 0x2A, 0x86, 0x48, 0xCE, 0x3D, 0x01, 0x01, 0x02, 0x21, 0x00, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFE, 0xFF, 0xFF, 0xFC, 0x2F, 0x30, 0x06, 0x04, 0x01, 0x00,
    0x04, 0x01, 0x07, 0x04, 0x21, 0x02, 0x79, 0xBE, 0x66, 0x7E, 0xF9, 0xDC,
    0xBB, 0xAC, 0x55, 0xA0, 0x62, 0x95, 0xCE, 0x87, 0x0B, 0x07, 0x02, 0x9B,
    0xFC, 0xDB, 0x2D, 0xCE, 0x28, 0xD9, 0x59, 0xF2, 0x81, 0x5B, 0x16, 0xF8,
    0x17, 0x98, 0x02, 0x21, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE, 0xBA, 0xAE, 0xDC,
    0xE6, 0xAF, 0x48, 0xA0, 0x3B, 0xBF, 0xD2, 0x5E, 0x8C, 0xD0, 0x36, 0x41,
    0x41, 0x02, 0x01, 0x01, 0xA1, 0x24, 0x03, 0x22, 0x00,
];

const BEGIN_UNCOMPRESSED: [u8; 9] = [0x30, 0x82, 0x01, 0x13, 0x02, 0x01, 0x01, 0x04, 0x20];

const MIDDLE_UNCOMPRESSED: [u8; 173] = [
    0xA0, 0x81, 0xA5, 0x30, 0x81, 0xA2, 0x02, 0x01, 0x01, 0x30, 0x2C, 0x06,
    0x07, 0x2A, 0x86, 0x48, 0xCE, 0x3D, 0x01, 0x01, 0x02, 0x21, 0x00, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFE, 0xFF, 0xFF, 0xFC, 0x2F, 0x30, 0x06, 0x04, 0x01, 0x00,
    0x04, 0x01, 0x07, 0x04, 0x41, 0x04, 0x79, 0xBE, 0x66, 0x7E, 0xF9, 0xDC,
    0xBB, 0xAC, 0x55, 0xA0, 0x62, 0x95, 0xCE, 0x87, 0x0B, 0x07, 0x02, 0x9B,
    0xFC, 0xDB, 0x2D, 0xCE, 0x28, 0xD9, 0x59, 0xF2, 0x81, 0x5B, 0x16, 0xF8,
    0x17, 0x98, 0x48, 0x3A, 0xDA, 0x77, 0x26, 0xA3, 0xC4, 0x65, 0x5D, 0xA4,
    0xFB, 0xFC, 0x0E, 0x11, 0x08, 0xA8, 0xFD, 0x17, 0xB4, 0x48, 0xA6, 0x85,
    0x54, 0x19, 0x9C, 0x47, 0xD0, 0x8F, 0xFB, 0x10, 0xD4, 0xB8, 0x02, 0x21,
    0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFE, 0xBA, 0xAE, 0xDC, 0xE6, 0xAF, 0x48, 0xA0,
    0x3B, 0xBF, 0xD2, 0x5E, 0x8C, 0xD0, 0x36, 0x41, 0x41, 0x02, 0x01, 0x01,
    0xA1, 0x44, 0x03, 0x42, 0x00,
];

/// Maximum length of a private key envelope (the uncompressed form).
pub(crate) const MAX_PRIVKEY_LEN: usize = 279;

/// A DER-encoded legacy EC private key envelope.
#[derive(Clone)]
pub struct DerPrivateKey {
    bytes: [u8; MAX_PRIVKEY_LEN],
    len: usize,
}

impl DerPrivateKey {
    pub(crate) fn new(bytes: [u8; MAX_PRIVKEY_LEN], len: usize) -> Self {
        Self { bytes, len }
    }

    /// Borrows the encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// The encoded length in bytes.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.len
    }
}

impl AsRef<[u8]> for DerPrivateKey {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl Drop for DerPrivateKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl fmt::Debug for DerPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DerPrivateKey(...)")
    }
}

/// Writes the legacy EC private key envelope for a secret key and its
/// serialized public key (33 or 65 bytes). Returns the written length.
pub(crate) fn privkey_to_der(
    out: &mut [u8; MAX_PRIVKEY_LEN],
    seckey: &[u8; 32],
    pubkey: &[u8],
) -> usize {
    let compressed = pubkey.len() == 33;
    let (begin, middle): (&[u8], &[u8]) = if compressed {
        (&BEGIN_COMPRESSED, &MIDDLE_COMPRESSED)
    } else {
        (&BEGIN_UNCOMPRESSED, &MIDDLE_UNCOMPRESSED)
    };
    let mut o = 0;
    out[o..o + begin.len()].copy_from_slice(begin);
    o += begin.len();
    out[o..o + 32].copy_from_slice(seckey);
    o += 32;
    out[o..o + middle.len()].copy_from_slice(middle);
    o += middle.len();
    out[o..o + pubkey.len()].copy_from_slice(pubkey);
    o + pubkey.len()
}

/// Extracts the secret scalar from a legacy EC private key envelope.
///
/// Only the outer framing is inspected: sequence header, version, and the
/// key octet string; the trailing curve parameters are not validated.
pub(crate) fn privkey_from_der(input: &[u8]) -> Result<Scalar> {
    let err = Err(Error::InvalidSecretKey);

    // sequence header with a long-form length of one or two bytes
    if input.len() < 2 || input[0] != 0x30 || input[1] & 0x80 == 0 {
        return err;
    }
    let lenb = (input[1] & 0x7F) as usize;
    if !(1..=2).contains(&lenb) || input.len() < 2 + lenb {
        return err;
    }
    let len = if lenb == 1 {
        input[2] as usize
    } else {
        ((input[2] as usize) << 8) | input[3] as usize
    };
    let body = &input[2 + lenb..];
    if body.len() < len {
        return err;
    }

    // version INTEGER 1
    if body.len() < 3 || body[0] != 0x02 || body[1] != 0x01 || body[2] != 0x01 {
        return err;
    }
    let body = &body[3..];

    // key OCTET STRING of at most 32 bytes
    if body.len() < 2 || body[0] != 0x04 {
        return err;
    }
    let keylen = body[1] as usize;
    if keylen > 32 || body.len() < 2 + keylen {
        return err;
    }

    let mut buf = [0u8; 32];
    buf[32 - keylen..].copy_from_slice(&body[2..2 + keylen]);
    let (key, overflow) = Scalar::from_bytes(&buf);
    buf.zeroize();
    if bool::from(overflow | key.is_zero()) {
        return err;
    }
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::{privkey_from_der, privkey_to_der, MAX_PRIVKEY_LEN};
    use crate::ecdsa::Signature;
    use crate::scalar::Scalar;
    use hex_literal::hex;

    fn sig(r: &[u8; 32], s: &[u8; 32]) -> Signature {
        let (r, ro) = Scalar::from_bytes(r);
        let (s, so) = Scalar::from_bytes(s);
        assert!(!bool::from(ro | so));
        Signature::from_scalars(r, s).unwrap()
    }

    #[test]
    fn serialize_is_minimal() {
        // small values shrink to one byte
        let mut r = [0u8; 32];
        r[31] = 0x7F;
        let mut s = [0u8; 32];
        s[31] = 0x80;
        let encoded = sig(&r, &s).to_der();
        // s needs a sign byte, r does not
        assert_eq!(encoded.as_bytes(), hex!("3007" "02017F" "02020080"));
    }

    #[test]
    fn roundtrip() {
        let r = hex!("F9308A019258C31049344F85F89D5229B531C845836F99B08601F113BCE036F9");
        let s = hex!("A676070161E62D0B31233559A613E1C6CE76DB2EAD4ABC20AF01A10D7E407A51");
        let original = sig(&r, &s);
        let encoded = original.to_der();
        // r < 2^255 with top bit of first byte set -> padded to 33 bytes
        assert_eq!(encoded.len(), 6 + 33 + 33);
        assert_eq!(Signature::from_der(encoded.as_bytes()).unwrap(), original);
    }

    #[test]
    fn lenient_parse_accepts_padding() {
        // r and s both encoded with gratuitous leading zeros
        let padded = hex!("300A" "0203000001" "0203000002");
        let parsed = Signature::from_der(&padded).unwrap();
        let mut one = [0u8; 32];
        one[31] = 1;
        let mut two = [0u8; 32];
        two[31] = 2;
        assert_eq!(parsed, sig(&one, &two));
    }

    #[test]
    fn parse_rejects_malformed() {
        // not a sequence
        assert!(Signature::from_der(&hex!("310602010102" "0101")).is_err());
        // inner tag not INTEGER
        assert!(Signature::from_der(&hex!("300603010102" "0101")).is_err());
        // truncated
        assert!(Signature::from_der(&hex!("3006020101")).is_err());
        // zero r
        assert!(Signature::from_der(&hex!("300602010002" "0101")).is_err());
        // r = n (out of range)
        assert!(Signature::from_der(&hex!(
            "3026"
            "0221" "00FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141"
            "0201" "01"
        ))
        .is_err());
    }

    #[test]
    fn privkey_envelope_roundtrip() {
        let seckey = hex!("0000000000000000000000000000000000000000000000000000000000000001");
        // compressed pubkey of d = 1 is the generator
        let pubkey = hex!("0279BE667EF9DCBBAC55A06295CE870B07029BFCDB2DCE28D959F2815B16F81798");
        let mut buf = [0u8; MAX_PRIVKEY_LEN];
        let len = privkey_to_der(&mut buf, &seckey, &pubkey);
        assert_eq!(len, 214);
        assert_eq!(&buf[..8], &hex!("3081D30201010420"));

        let recovered = privkey_from_der(&buf[..len]).unwrap();
        assert_eq!(recovered.to_bytes(), seckey);
    }

    #[test]
    fn privkey_envelope_uncompressed_length() {
        let seckey = hex!("00000000000000000000000000000000000000000000000000000000DEADBEEF");
        let pubkey = [0x04u8; 65];
        let mut buf = [0u8; MAX_PRIVKEY_LEN];
        let len = privkey_to_der(&mut buf, &seckey, &pubkey);
        assert_eq!(len, 279);
        assert_eq!(privkey_from_der(&buf[..len]).unwrap().to_bytes(), seckey);
    }

    #[test]
    fn privkey_parse_rejects_zero_and_overflow() {
        let mut buf = [0u8; MAX_PRIVKEY_LEN];
        let pubkey = [0x04u8; 65];

        let len = privkey_to_der(&mut buf, &[0u8; 32], &pubkey);
        assert!(privkey_from_der(&buf[..len]).is_err());

        let n = hex!("FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141");
        let len = privkey_to_der(&mut buf, &n, &pubkey);
        assert!(privkey_from_der(&buf[..len]).is_err());
    }
}
