//! Constant-time fixed-base multiplication k·G for the signing path.
//!
//! The secret scalar is consumed in 64 windows of 4 bits. For every window
//! the table row holding the 16 candidate points is scanned in full, with
//! the wanted entry extracted through arithmetic masking, so the memory
//! access pattern is independent of the scalar. Accumulation uses the
//! complete addition formula throughout.

use crate::field::FieldElement;
use crate::group::{AffinePoint, AffineStorage, JacobianPoint};
use crate::scalar::Scalar;
use alloc::boxed::Box;
use alloc::vec::Vec;
use rand_core::{CryptoRng, RngCore};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

/// A point whose discrete logarithm is not known to anyone: the x-coordinate
/// is an ASCII string, the y-coordinate its even square root.
///
/// Its shares pad every table row so that no window addition degenerates,
/// and they telescope to zero over the 64 windows.
const NUMS: AffinePoint = AffinePoint {
    x: FieldElement::from_raw([
        0x56E6B6E6F776E,
        0x2078206973207,
        0xF722074686973,
        0x616C617220666,
        0x0546865207363,
    ]),
    y: FieldElement::from_raw([
        0x299348FF7F20E,
        0x90856930E67E5,
        0xE09C33305D508,
        0xA12E1C0FAAF47,
        0x028EBB7E4E1F6,
    ]),
    infinity: false,
};

/// Precomputed table and blinding state for k·G.
pub(crate) struct EcMultGenContext {
    /// prec[j][i] = i·16^j·G plus window j's share of the padding point.
    prec: Box<[[AffineStorage; 16]; 64]>,
    /// Scalar blind folded into every multiplication.
    blind: Scalar,
    /// −blind·G in a re-randomized representation; the accumulator start.
    initial: JacobianPoint,
}

impl EcMultGenContext {
    /// Builds the 64×16 window table (64 KiB). The fresh context is
    /// unblinded; [`randomize`][Self::randomize] installs a blinding.
    pub fn new() -> Self {
        let g = AffinePoint::GENERATOR;
        let nums_gej = JacobianPoint::from_affine(&NUMS).add_ge_var(&g, None);

        let mut precj: Vec<JacobianPoint> = Vec::with_capacity(1024);
        let mut gbase = JacobianPoint::from_affine(&g);
        let mut numsbase = nums_gej;
        for j in 0..64 {
            // row j: [u_j·U', 16^j·G + u_j·U', 2·16^j·G + u_j·U', ...]
            precj.push(numsbase);
            for i in 1..16 {
                let next = precj[j * 16 + i - 1].add_var(&gbase);
                precj.push(next);
            }
            for _ in 0..4 {
                gbase = gbase.double_var(None);
            }
            numsbase = numsbase.double_var(None);
            if j == 62 {
                // the shares 2^0·U', …, 2^62·U' plus this last one sum to zero
                numsbase = numsbase.neg().add_var(&nums_gej);
            }
        }

        let affine = AffinePoint::batch_from_jacobian_var(&precj);
        let mut prec = Box::new([[AffineStorage::default(); 16]; 64]);
        for j in 0..64 {
            for i in 0..16 {
                prec[j][i] = affine[j * 16 + i].to_storage();
            }
        }

        Self {
            prec,
            blind: Scalar::ZERO,
            initial: JacobianPoint::INFINITY,
        }
    }

    /// Computes gn·G in constant time.
    pub fn mul_base(&self, gn: &Scalar) -> JacobianPoint {
        let mut r = self.initial;
        let mut gnb = gn.add(&self.blind);
        let mut adds = AffineStorage::default();

        for j in 0..64 {
            let bits = gnb.bits(j * 4, 4);
            for i in 0..16u32 {
                adds.cmov(&self.prec[j][i as usize], i.ct_eq(&bits));
            }
            let mut add = AffinePoint::from(&adds);
            r = r.add_ge(&add);
            add.zeroize();
        }

        adds.zeroize();
        gnb.zeroize();
        r
    }

    /// Installs a fresh scalar blind and re-randomizes the accumulator
    /// origin, so that neither the table offsets nor the starting point
    /// correlate with any prior use of this context.
    pub fn randomize<R: CryptoRng + RngCore>(&mut self, rng: &mut R) {
        let b = Scalar::random(rng);
        let mut gb = self.mul_base(&b);

        let mut initial = JacobianPoint::from_affine(&gb.to_affine().neg());
        let f = random_nonzero_field_element(rng);
        initial.rescale(&f);

        self.blind = b;
        self.initial = initial;
        gb.zeroize();
    }
}

fn random_nonzero_field_element<R: CryptoRng + RngCore>(rng: &mut R) -> FieldElement {
    let mut bytes = [0u8; 32];
    loop {
        rng.fill_bytes(&mut bytes);
        let f = FieldElement::from_bytes(&bytes);
        if bool::from(f.is_some()) {
            let f = f.unwrap_or(FieldElement::ZERO);
            if !bool::from(f.is_zero()) {
                bytes.zeroize();
                return f;
            }
        }
    }
}
