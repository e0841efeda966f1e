//! Key serialization and tweak properties through the public API.

use hex_literal::hex;
use k256::{PublicKey, Secp256k1, SecretKey};
use std::sync::OnceLock;

fn ctx() -> &'static Secp256k1 {
    static CTX: OnceLock<Secp256k1> = OnceLock::new();
    CTX.get_or_init(Secp256k1::new)
}

fn scalar_bytes(v: u64) -> [u8; 32] {
    let mut b = [0u8; 32];
    b[24..].copy_from_slice(&v.to_be_bytes());
    b
}

#[test]
fn seckey_range_boundaries() {
    assert!(SecretKey::from_bytes(&[0u8; 32]).is_err());
    let n = hex!("FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141");
    assert!(SecretKey::from_bytes(&n).is_err());
    let mut n_minus_1 = n;
    n_minus_1[31] -= 1;
    assert!(SecretKey::from_bytes(&n_minus_1).is_ok());
}

#[test]
fn pubkey_serialization_roundtrips_preserve_the_point() {
    let sk = SecretKey::from_bytes(&scalar_bytes(0xC0FFEE)).unwrap();
    let pk = ctx().public_key(&sk);

    let compressed = pk.serialize_compressed();
    let uncompressed = pk.serialize_uncompressed();
    assert_eq!(PublicKey::parse(&compressed).unwrap(), pk);
    assert_eq!(PublicKey::parse(&uncompressed).unwrap(), pk);
    assert_eq!(PublicKey::decompress(&compressed).unwrap(), uncompressed);
}

#[test]
fn tweak_add_homomorphism() {
    // pubkey(d + t) == pubkey(d) + t·G
    let d = scalar_bytes(1);
    let t = scalar_bytes(1);
    let sk = SecretKey::from_bytes(&d).unwrap();

    let lhs = ctx().public_key(&sk.tweak_add(&t).unwrap());
    let rhs = ctx()
        .tweak_add_public_key(&ctx().public_key(&sk), &t)
        .unwrap();
    assert_eq!(lhs, rhs);
    assert_eq!(
        lhs,
        ctx().public_key(&SecretKey::from_bytes(&scalar_bytes(2)).unwrap())
    );
}

#[test]
fn tweak_mul_homomorphism() {
    let sk = SecretKey::from_bytes(&scalar_bytes(0x1234_5678)).unwrap();
    let t = scalar_bytes(0x9ABC_DEF0);

    let lhs = ctx().public_key(&sk.tweak_mul(&t).unwrap());
    let rhs = ctx()
        .tweak_mul_public_key(&ctx().public_key(&sk), &t)
        .unwrap();
    assert_eq!(lhs, rhs);
}

#[test]
fn tweak_failure_cases() {
    let sk = SecretKey::from_bytes(&scalar_bytes(1)).unwrap();
    let pk = ctx().public_key(&sk);

    let n = hex!("FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141");
    assert!(sk.tweak_add(&n).is_err());
    assert!(sk.tweak_mul(&n).is_err());
    assert!(sk.tweak_mul(&[0u8; 32]).is_err());
    assert!(ctx().tweak_add_public_key(&pk, &n).is_err());
    assert!(ctx().tweak_mul_public_key(&pk, &[0u8; 32]).is_err());

    // P + (n - d)·G = ∞ for P = d·G
    let mut n_minus_1 = n;
    n_minus_1[31] -= 1;
    assert!(ctx().tweak_add_public_key(&pk, &n_minus_1).is_err());
}

#[test]
fn private_key_der_is_byte_exact() {
    let sk = SecretKey::from_bytes(&scalar_bytes(1)).unwrap();
    let der = ctx().export_secret_key_der(&sk, true);
    assert_eq!(
        der.as_bytes(),
        &hex!(
            "3081D30201010420000000000000000000000000000000000000000000000000"
            "0000000000000001A08185308182020101302C06072A8648CE3D0101022100FF"
            "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEFFFFFC2F30"
            "0604010004010704210279BE667EF9DCBBAC55A06295CE870B07029BFCDB2DCE"
            "28D959F2815B16F81798022100FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDC"
            "E6AF48A03BBFD25E8CD0364141020101A1240322000279BE667EF9DCBBAC55A0"
            "6295CE870B07029BFCDB2DCE28D959F2815B16F81798"
        )[..]
    );

    let uncompressed = ctx().export_secret_key_der(&sk, false);
    assert_eq!(uncompressed.len(), 279);
    assert_eq!(&uncompressed.as_bytes()[..9], &hex!("308201130201010420"));
}

#[test]
fn private_key_der_import_export_roundtrip() {
    for d in [1u64, 0xDEAD_BEEF, u64::MAX] {
        let sk = SecretKey::from_bytes(&scalar_bytes(d)).unwrap();
        for compressed in [true, false] {
            let der = ctx().export_secret_key_der(&sk, compressed);
            assert_eq!(SecretKey::from_der(der.as_bytes()).unwrap(), sk);
        }
    }
}

#[test]
fn hybrid_keys_parse_but_are_never_emitted() {
    let sk = SecretKey::from_bytes(&scalar_bytes(5)).unwrap();
    let pk = ctx().public_key(&sk);
    let mut hybrid = pk.serialize_uncompressed();
    let odd = hybrid[64] & 1 == 1;
    hybrid[0] = if odd { 0x07 } else { 0x06 };
    assert_eq!(PublicKey::parse(&hybrid).unwrap(), pk);

    // mismatched hybrid parity is rejected
    hybrid[0] = if odd { 0x06 } else { 0x07 };
    assert!(PublicKey::parse(&hybrid).is_err());
}
