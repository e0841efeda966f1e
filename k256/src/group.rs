//! Group arithmetic: affine and Jacobian points on y² = x³ + 7.
//!
//! Jacobian triples (X, Y, Z) represent the affine point (X/Z², Y/Z³) and
//! carry all intermediate arithmetic so that only final results pay for a
//! field inversion. The `_var` operations may branch on operand structure
//! and are reserved for public data; [`JacobianPoint::add_ge`] is complete
//! and constant-time for the signing path.

use crate::field::{FieldElement, FieldStorage};
use alloc::vec::Vec;
use subtle::{Choice, ConditionallySelectable};
use zeroize::Zeroize;

/// b = 7, the curve constant.
const CURVE_B: FieldElement = FieldElement::from_raw([7, 0, 0, 0, 0]);

/// A point in affine coordinates, or the point at infinity.
#[derive(Clone, Copy, Debug)]
pub struct AffinePoint {
    /// x-coordinate.
    pub(crate) x: FieldElement,
    /// y-coordinate.
    pub(crate) y: FieldElement,
    /// Marker for the point at infinity; coordinates are meaningless if set.
    pub(crate) infinity: bool,
}

/// A point in Jacobian coordinates, or the point at infinity.
#[derive(Clone, Copy, Debug)]
pub struct JacobianPoint {
    pub(crate) x: FieldElement,
    pub(crate) y: FieldElement,
    pub(crate) z: FieldElement,
    pub(crate) infinity: bool,
}

/// Packed affine form for precomputed tables.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct AffineStorage {
    pub(crate) x: FieldStorage,
    pub(crate) y: FieldStorage,
}

impl AffinePoint {
    /// The generator G of the secp256k1 group.
    pub const GENERATOR: Self = Self {
        x: FieldElement::from_raw([
            0x2815B16F81798,
            0xDB2DCE28D959F,
            0xE870B07029BFC,
            0xBBAC55A06295C,
            0x079BE667EF9DC,
        ]),
        y: FieldElement::from_raw([
            0x7D08FFB10D4B8,
            0x48A68554199C4,
            0xE1108A8FD17B4,
            0xC4655DA4FBFC0,
            0x0483ADA7726A3,
        ]),
        infinity: false,
    };

    /// The point at infinity.
    pub const INFINITY: Self = Self {
        x: FieldElement::ZERO,
        y: FieldElement::ZERO,
        infinity: true,
    };

    /// Constructs a point from coordinates without validating the curve
    /// equation.
    pub fn from_xy(x: FieldElement, y: FieldElement) -> Self {
        Self {
            x,
            y,
            infinity: false,
        }
    }

    /// Recovers the point with the given x-coordinate and y parity; fails if
    /// x³ + 7 is not a quadratic residue. Variable time.
    pub fn decompress_var(x: &FieldElement, odd: bool) -> Option<Self> {
        let c = x.square().mul(x).add(&CURVE_B);
        let (y, is_qr) = c.sqrt();
        if !bool::from(is_qr) {
            return None;
        }
        let y = if bool::from(y.is_odd()) != odd {
            y.negate(1).normalize()
        } else {
            y
        };
        Some(Self {
            x: x.normalize(),
            y,
            infinity: false,
        })
    }

    /// Whether the coordinates satisfy y² = x³ + 7. Variable time.
    pub fn is_valid_var(&self) -> bool {
        if self.infinity {
            return false;
        }
        let rhs = self.x.square().mul(&self.x).add(&CURVE_B);
        self.y.square().add(&rhs.negate(2)).normalizes_to_zero_var()
    }

    /// Whether this is the point at infinity.
    pub fn is_infinity(&self) -> bool {
        self.infinity
    }

    /// The x-coordinate.
    pub fn x(&self) -> &FieldElement {
        &self.x
    }

    /// The y-coordinate.
    pub fn y(&self) -> &FieldElement {
        &self.y
    }

    /// The additive inverse.
    pub fn neg(&self) -> Self {
        Self {
            x: self.x,
            y: self.y.negate(self.y.magnitude()),
            infinity: self.infinity,
        }
    }

    /// Converts a Jacobian point to affine with one field inversion
    /// (constant time in the coordinates).
    pub fn from_jacobian(p: &JacobianPoint) -> Self {
        let zi = p.z.invert();
        let zi2 = zi.square();
        let zi3 = zi2.mul(&zi);
        Self {
            x: p.x.mul(&zi2).normalize(),
            y: p.y.mul(&zi3).normalize(),
            infinity: p.infinity,
        }
    }

    /// Converts a batch of Jacobian points to affine using Montgomery's
    /// trick: one inversion plus three multiplications per point.
    /// Variable time.
    pub fn batch_from_jacobian_var(points: &[JacobianPoint]) -> Vec<Self> {
        let zs: Vec<FieldElement> = points
            .iter()
            .filter(|p| !p.infinity)
            .map(|p| p.z)
            .collect();
        let zis = invert_batch_var(&zs);

        let mut out = Vec::with_capacity(points.len());
        let mut k = 0;
        for p in points {
            if p.infinity {
                out.push(Self::INFINITY);
            } else {
                out.push(p.to_affine_zinv(&zis[k]));
                k += 1;
            }
        }
        out
    }

    pub(crate) fn to_storage(self) -> AffineStorage {
        debug_assert!(!self.infinity);
        AffineStorage {
            x: (&self.x.normalize()).into(),
            y: (&self.y.normalize()).into(),
        }
    }
}

impl From<&AffineStorage> for AffinePoint {
    fn from(v: &AffineStorage) -> Self {
        Self {
            x: (&v.x).into(),
            y: (&v.y).into(),
            infinity: false,
        }
    }
}

impl PartialEq for AffinePoint {
    fn eq(&self, other: &Self) -> bool {
        if self.infinity || other.infinity {
            return self.infinity == other.infinity;
        }
        self.x.normalize() == other.x.normalize() && self.y.normalize() == other.y.normalize()
    }
}

impl Eq for AffinePoint {}

impl AffineStorage {
    pub(crate) fn cmov(&mut self, other: &Self, choice: Choice) {
        self.x.cmov(&other.x, choice);
        self.y.cmov(&other.y, choice);
    }
}

impl Zeroize for AffinePoint {
    fn zeroize(&mut self) {
        self.x.zeroize();
        self.y.zeroize();
        self.infinity = true;
    }
}

impl Zeroize for JacobianPoint {
    fn zeroize(&mut self) {
        self.x.zeroize();
        self.y.zeroize();
        self.z.zeroize();
        self.infinity = true;
    }
}

impl Zeroize for AffineStorage {
    fn zeroize(&mut self) {
        self.x.zeroize();
        self.y.zeroize();
    }
}

impl JacobianPoint {
    /// The point at infinity.
    pub const INFINITY: Self = Self {
        x: FieldElement::ZERO,
        y: FieldElement::ZERO,
        z: FieldElement::ZERO,
        infinity: true,
    };

    /// Lifts an affine point into Jacobian coordinates (Z = 1).
    pub fn from_affine(p: &AffinePoint) -> Self {
        Self {
            x: p.x,
            y: p.y,
            z: FieldElement::ONE,
            infinity: p.infinity,
        }
    }

    /// Converts to affine with one field inversion.
    pub fn to_affine(&self) -> AffinePoint {
        AffinePoint::from_jacobian(self)
    }

    /// Whether this is the point at infinity.
    pub fn is_infinity(&self) -> bool {
        self.infinity
    }

    /// The additive inverse.
    pub fn neg(&self) -> Self {
        Self {
            x: self.x,
            y: self.y.negate(self.y.magnitude()),
            z: self.z,
            infinity: self.infinity,
        }
    }

    /// Scales the representation by `f` (the point is unchanged).
    pub(crate) fn rescale(&mut self, f: &FieldElement) {
        let f2 = f.square();
        self.x = self.x.mul(&f2);
        self.y = self.y.mul(&f2.mul(f));
        self.z = self.z.mul(f);
    }

    /// Point doubling, using the a = 0 shortcut. Variable time only in the
    /// infinity flag. If `zr` is requested it receives Z_out/Z_in = 2·Y_in.
    pub fn double_var(&self, zr: Option<&mut FieldElement>) -> Self {
        if self.infinity {
            if let Some(zr) = zr {
                *zr = FieldElement::ONE;
            }
            return Self::INFINITY;
        }
        if let Some(zr) = zr {
            *zr = self.y.normalize_weak().mul_int(2);
        }
        let rz = self.z.mul(&self.y).mul_int(2);
        let t1 = self.x.square().mul_int(3);
        let t2 = t1.square();
        let t3 = self.y.square().mul_int(2);
        let t4 = t3.square().mul_int(2);
        let t3 = t3.mul(&self.x);
        let rx = t3.mul_int(4).negate(4).add(&t2);
        let t3 = t3.mul_int(6).add(&t2.negate(1));
        let ry = t1.mul(&t3).add(&t4.negate(2));
        Self {
            x: rx,
            y: ry,
            z: rz,
            infinity: false,
        }
    }

    /// General Jacobian + Jacobian addition. Variable time.
    pub fn add_var(&self, b: &Self) -> Self {
        if self.infinity {
            return *b;
        }
        if b.infinity {
            return *self;
        }
        let z22 = b.z.square();
        let z12 = self.z.square();
        let u1 = self.x.mul(&z22);
        let u2 = b.x.mul(&z12);
        let s1 = self.y.mul(&z22).mul(&b.z);
        let s2 = b.y.mul(&z12).mul(&self.z);
        let h = u1.negate(1).add(&u2);
        let i = s1.negate(1).add(&s2);
        if h.normalizes_to_zero_var() {
            if i.normalizes_to_zero_var() {
                return self.double_var(None);
            }
            return Self::INFINITY;
        }
        let i2 = i.square();
        let h2 = h.square();
        let h3 = h.mul(&h2);
        let rz = self.z.mul(&b.z).mul(&h);
        let t = u1.mul(&h2);
        let rx = t.mul_int(2).add(&h3).negate(3).add(&i2);
        let ry = t.add(&rx.negate(5)).mul(&i).add(&s1.mul(&h3).negate(1));
        Self {
            x: rx,
            y: ry,
            z: rz,
            infinity: false,
        }
    }

    /// Mixed Jacobian + affine addition. Variable time. If `zr` is requested
    /// it receives Z_out/Z_in (except across the doubling/infinity cases,
    /// whose callers never request it).
    pub fn add_ge_var(&self, b: &AffinePoint, zr: Option<&mut FieldElement>) -> Self {
        if self.infinity {
            debug_assert!(zr.is_none());
            return Self::from_affine(b);
        }
        if b.infinity {
            debug_assert!(zr.is_none());
            return *self;
        }
        let z12 = self.z.square();
        let u1 = self.x.normalize_weak();
        let u2 = b.x.mul(&z12);
        let s1 = self.y.normalize_weak();
        let s2 = b.y.mul(&z12).mul(&self.z);
        let h = u1.negate(1).add(&u2);
        let i = s1.negate(1).add(&s2);
        if h.normalizes_to_zero_var() {
            if i.normalizes_to_zero_var() {
                return self.double_var(zr);
            }
            debug_assert!(zr.is_none());
            return Self::INFINITY;
        }
        if let Some(zr) = zr {
            *zr = h;
        }
        let i2 = i.square();
        let h2 = h.square();
        let h3 = h.mul(&h2);
        let rz = self.z.mul(&h);
        let t = u1.mul(&h2);
        let rx = t.mul_int(2).add(&h3).negate(3).add(&i2);
        let ry = t.add(&rx.negate(5)).mul(&i).add(&s1.mul(&h3).negate(1));
        Self {
            x: rx,
            y: ry,
            z: rz,
            infinity: false,
        }
    }

    /// Adds an affine point whose true Z coordinate is `1/bzinv`: the
    /// caller supplies coordinates scaled into a shared denominator plus the
    /// denominator's inverse. Variable time.
    pub fn add_zinv_var(&self, b: &AffinePoint, bzinv: &FieldElement) -> Self {
        if b.infinity {
            return *self;
        }
        if self.infinity {
            let bzinv2 = bzinv.square();
            let bzinv3 = bzinv2.mul(bzinv);
            return Self {
                x: b.x.mul(&bzinv2),
                y: b.y.mul(&bzinv3),
                z: FieldElement::ONE,
                infinity: false,
            };
        }
        // scale self by bzinv so that b's denominator becomes one; the
        // correction is withheld from the output z
        let az = self.z.mul(bzinv);
        let z12 = az.square();
        let u1 = self.x.normalize_weak();
        let u2 = b.x.mul(&z12);
        let s1 = self.y.normalize_weak();
        let s2 = b.y.mul(&z12).mul(&az);
        let h = u1.negate(1).add(&u2);
        let i = s1.negate(1).add(&s2);
        if h.normalizes_to_zero_var() {
            if i.normalizes_to_zero_var() {
                return self.double_var(None);
            }
            return Self::INFINITY;
        }
        let i2 = i.square();
        let h2 = h.square();
        let h3 = h.mul(&h2);
        let rz = self.z.mul(&h);
        let t = u1.mul(&h2);
        let rx = t.mul_int(2).add(&h3).negate(3).add(&i2);
        let ry = t.add(&rx.negate(5)).mul(&i).add(&s1.mul(&h3).negate(1));
        Self {
            x: rx,
            y: ry,
            z: rz,
            infinity: false,
        }
    }

    /// Complete constant-time mixed addition, correct for every input pair
    /// including doubling and inverse inputs. `b` must not be infinity.
    ///
    /// When the secant slope degenerates to 0/0 (the operands are related
    /// through the curve's nontrivial cube root of unity), the equivalent
    /// chord expression (y1 − y2)/(x1 − x2) is blended in instead.
    pub fn add_ge(&self, b: &AffinePoint) -> Self {
        debug_assert!(!b.infinity);
        let zz = self.z.square();
        let u1 = self.x.normalize_weak();
        let u2 = b.x.mul(&zz);
        let s1 = self.y.normalize_weak();
        let s2 = b.y.mul(&zz).mul(&self.z);
        let t = u1.add(&u2);
        let m = s1.add(&s2);
        let rr = t.square();
        let m_alt = u2.negate(1);
        let tt = u1.mul(&m_alt);
        let rr = rr.add(&tt);
        let degenerate = m.normalizes_to_zero();
        let rr_alt = FieldElement::conditional_select(&rr, &s1.mul_int(2), degenerate);
        let m_alt = FieldElement::conditional_select(&m, &m_alt.add(&u1), degenerate);

        let n = m_alt.square();
        let q = n.mul(&t);
        let n = FieldElement::conditional_select(&n.square(), &m, degenerate);
        let t = rr_alt.square();
        let rz = self.z.mul(&m_alt);
        let infinity = rz.normalizes_to_zero() & !Choice::from(self.infinity as u8);
        let rz = rz.mul_int(2);
        let q = q.negate(1);
        let t = t.add(&q).normalize_weak();
        let rx = t;
        let t = t.mul_int(2).add(&q).mul(&rr_alt).add(&n);
        let ry = t.negate(3).normalize_weak();
        let rx = rx.mul_int(4);
        let ry = ry.mul_int(4);

        let a_inf = Choice::from(self.infinity as u8);
        Self {
            x: FieldElement::conditional_select(&rx, &b.x, a_inf),
            y: FieldElement::conditional_select(&ry, &b.y, a_inf),
            z: FieldElement::conditional_select(&rz, &FieldElement::ONE, a_inf),
            infinity: infinity.into(),
        }
    }

    /// Whether the affine x-coordinate of this point equals `x`, without
    /// leaving Jacobian form. Variable time.
    pub fn eq_x_var(&self, x: &FieldElement) -> bool {
        debug_assert!(!self.infinity);
        let z2 = self.z.square();
        x.mul(&z2)
            .add(&self.x.negate(self.x.magnitude()))
            .normalizes_to_zero_var()
    }
}

impl From<&AffinePoint> for JacobianPoint {
    fn from(p: &AffinePoint) -> Self {
        Self::from_affine(p)
    }
}

impl JacobianPoint {
    /// Affine conversion with a precomputed inverse of this point's Z.
    fn to_affine_zinv(&self, zi: &FieldElement) -> AffinePoint {
        debug_assert!(!self.infinity);
        let zi2 = zi.square();
        let zi3 = zi2.mul(zi);
        AffinePoint {
            x: self.x.mul(&zi2).normalize(),
            y: self.y.mul(&zi3).normalize(),
            infinity: false,
        }
    }
}

impl AffinePoint {
    /// Affine form of a Jacobian point given the inverse of a denominator
    /// shared by a whole table.
    pub(crate) fn from_jacobian_zinv(p: &JacobianPoint, zi: &FieldElement) -> Self {
        p.to_affine_zinv(zi)
    }
}

/// Inverts every element of a batch with a single field inversion
/// (Montgomery's trick). Variable time; inputs must be non-zero.
fn invert_batch_var(fields: &[FieldElement]) -> Vec<FieldElement> {
    if fields.is_empty() {
        return Vec::new();
    }
    let mut ret = Vec::with_capacity(fields.len());
    ret.push(fields[0]);
    for f in &fields[1..] {
        let prev = *ret.last().unwrap_or(&FieldElement::ONE);
        ret.push(prev.mul(f));
    }
    let mut u = ret[fields.len() - 1].invert_var();
    for i in (1..fields.len()).rev() {
        ret[i] = ret[i - 1].mul(&u);
        u = u.mul(&fields[i]);
    }
    ret[0] = u;
    ret
}
