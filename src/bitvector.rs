use std::fmt;

/// A fixed-width bit pattern with width-modular arithmetic.
///
/// Widths up to 128 bits are supported, which covers every width the
/// architecture backends this crate pairs with can emit (general-purpose
/// registers, vector lanes, and `Value` cells up to 64 bits plus headroom
/// for 128-bit intermediate results). A wider request is rejected by the
/// caller with `Error::InvalidConfiguration` rather than silently
/// truncated.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct BitVector {
    width: u32,
    value: u128,
}

impl BitVector {
    pub const MAX_WIDTH: u32 = 128;

    #[must_use]
    pub fn new(width: u32, value: u128) -> Self {
        let width = width.clamp(1, Self::MAX_WIDTH);
        Self {
            width,
            value: value & mask(width),
        }
    }

    #[must_use]
    pub fn zero(width: u32) -> Self {
        Self::new(width, 0)
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn to_u128(&self) -> u128 {
        self.value
    }

    #[must_use]
    pub fn to_u64(&self) -> u64 {
        self.value as u64
    }

    /// Interprets the top bit as a sign bit and sign-extends into `i128`.
    #[must_use]
    pub fn to_i128(&self) -> i128 {
        let shift = 128 - self.width;
        ((self.value << shift) as i128) >> shift
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.value == 0
    }

    #[must_use]
    pub fn sign_bit(&self) -> bool {
        (self.value >> (self.width - 1)) & 1 == 1
    }

    #[must_use]
    pub fn add(&self, rhs: &Self) -> Self {
        Self::new(self.width, self.value.wrapping_add(rhs.value))
    }

    #[must_use]
    pub fn sub(&self, rhs: &Self) -> Self {
        Self::new(self.width, self.value.wrapping_sub(rhs.value))
    }

    #[must_use]
    pub fn mul(&self, rhs: &Self) -> Self {
        Self::new(self.width, self.value.wrapping_mul(rhs.value))
    }

    /// Unsigned division; `None` on division by zero.
    #[must_use]
    pub fn udiv(&self, rhs: &Self) -> Option<Self> {
        (!rhs.is_zero()).then(|| Self::new(self.width, self.value / rhs.value))
    }

    /// Signed division; `None` on division by zero.
    #[must_use]
    pub fn sdiv(&self, rhs: &Self) -> Option<Self> {
        (!rhs.is_zero())
            .then(|| Self::new(self.width, (self.to_i128() / rhs.to_i128()) as u128))
    }

    /// Unsigned remainder; `None` on division by zero.
    #[must_use]
    pub fn umod(&self, rhs: &Self) -> Option<Self> {
        (!rhs.is_zero()).then(|| Self::new(self.width, self.value % rhs.value))
    }

    /// Signed remainder; `None` on division by zero.
    #[must_use]
    pub fn smod(&self, rhs: &Self) -> Option<Self> {
        (!rhs.is_zero())
            .then(|| Self::new(self.width, (self.to_i128() % rhs.to_i128()) as u128))
    }

    #[must_use]
    pub fn and(&self, rhs: &Self) -> Self {
        Self::new(self.width, self.value & rhs.value)
    }

    #[must_use]
    pub fn or(&self, rhs: &Self) -> Self {
        Self::new(self.width, self.value | rhs.value)
    }

    #[must_use]
    pub fn xor(&self, rhs: &Self) -> Self {
        Self::new(self.width, self.value ^ rhs.value)
    }

    #[must_use]
    pub fn not(&self) -> Self {
        Self::new(self.width, !self.value)
    }

    #[must_use]
    pub fn neg(&self) -> Self {
        Self::new(self.width, self.value.wrapping_neg())
    }

    /// Logical (unsigned) left shift. The shift amount is taken as the
    /// unsigned value of `amount`, regardless of its own width.
    #[must_use]
    pub fn lls(&self, amount: &Self) -> Self {
        let sh = amount.to_u128();
        if sh >= u128::from(self.width) {
            Self::zero(self.width)
        } else {
            Self::new(self.width, self.value << sh)
        }
    }

    /// Logical (unsigned) right shift.
    #[must_use]
    pub fn lrs(&self, amount: &Self) -> Self {
        let sh = amount.to_u128();
        if sh >= u128::from(self.width) {
            Self::zero(self.width)
        } else {
            Self::new(self.width, self.value >> sh)
        }
    }

    /// Arithmetic (sign-preserving) right shift.
    #[must_use]
    pub fn ars(&self, amount: &Self) -> Self {
        let sh = amount.to_u128().min(u128::from(self.width) - 1) as u32;
        let shifted = self.to_i128() >> sh;
        Self::new(self.width, shifted as u128)
    }

    #[must_use]
    pub fn sign_extend(&self, new_width: u32) -> Self {
        Self::new(new_width, self.to_i128() as u128)
    }

    #[must_use]
    pub fn zero_extend(&self, new_width: u32) -> Self {
        Self::new(new_width, self.value)
    }

    /// Reinterprets the same raw bits at a new width (truncating or
    /// zero-padding as needed).
    #[must_use]
    pub fn bit_cast(&self, new_width: u32) -> Self {
        Self::new(new_width, self.value)
    }

    /// Extracts the inclusive bit range `[lo, hi]`, producing a value of
    /// width `hi - lo + 1`.
    #[must_use]
    pub fn extract_bits(&self, hi: u32, lo: u32) -> Self {
        let width = hi - lo + 1;
        Self::new(width, self.value >> lo)
    }

    /// Returns a copy of `self` with bits `[lo, hi]` replaced by the low
    /// bits of `src`.
    #[must_use]
    pub fn insert_bits(&self, src: &Self, hi: u32, lo: u32) -> Self {
        let field_width = hi - lo + 1;
        let field_mask = mask(field_width) << lo;
        let cleared = self.value & !field_mask;
        let inserted = (src.value << lo) & field_mask;
        Self::new(self.width, cleared | inserted)
    }

    /// Reverses byte order across the full width (width must be a multiple
    /// of 8).
    #[must_use]
    pub fn swap(&self) -> Self {
        let bytes = self.width / 8;
        let mut out: u128 = 0;
        for i in 0..bytes {
            let byte = (self.value >> (i * 8)) & 0xff;
            out |= byte << ((bytes - 1 - i) * 8);
        }
        Self::new(self.width, out)
    }

    /// Bit-scan forward: index of the lowest set bit, or `None` if zero.
    #[must_use]
    pub fn bsf(&self) -> Option<u32> {
        (!self.is_zero()).then(|| self.value.trailing_zeros())
    }

    /// Bit-scan reverse: index of the highest set bit, or `None` if zero.
    #[must_use]
    pub fn bsr(&self) -> Option<u32> {
        (!self.is_zero()).then(|| self.width - 1 - (self.value.leading_zeros() - (128 - self.width)))
    }
}

#[must_use]
fn mask(width: u32) -> u128 {
    if width >= 128 {
        u128::MAX
    } else {
        (1u128 << width) - 1
    }
}

impl fmt::Display for BitVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}:{}", self.value, self.width)
    }
}

#[test]
fn test_width_modular_add() {
    let a = BitVector::new(8, 0xff);
    let b = BitVector::new(8, 1);
    assert_eq!(a.add(&b).to_u128(), 0);
}

#[test]
fn test_signed_interpretation() {
    let v = BitVector::new(8, 0xff);
    assert_eq!(v.to_i128(), -1);
}

#[test]
fn test_div_by_zero_is_none() {
    let a = BitVector::new(32, 10);
    let z = BitVector::zero(32);
    assert!(a.udiv(&z).is_none());
    assert!(a.sdiv(&z).is_none());
    assert!(a.umod(&z).is_none());
    assert!(a.smod(&z).is_none());
}

#[test]
fn test_sign_extend() {
    let v = BitVector::new(8, 0xff);
    let sext = v.sign_extend(32);
    assert_eq!(sext.to_u128(), 0xffff_ffff);
}

#[test]
fn test_zero_extend() {
    let v = BitVector::new(8, 0xff);
    let zext = v.zero_extend(32);
    assert_eq!(zext.to_u128(), 0xff);
}

#[test]
fn test_shift_by_width_or_more_is_zero() {
    let v = BitVector::new(8, 0xff);
    let big = BitVector::new(8, 200);
    assert_eq!(v.lls(&big).to_u128(), 0);
    assert_eq!(v.lrs(&big).to_u128(), 0);
}

#[test]
fn test_arithmetic_right_shift_preserves_sign() {
    let v = BitVector::new(8, 0x80); // -128
    let one = BitVector::new(8, 1);
    assert_eq!(v.ars(&one).to_u128(), 0xc0);
}

#[test]
fn test_extract_and_insert_bits() {
    let v = BitVector::new(32, 0xdead_beef);
    let low_byte = v.extract_bits(7, 0);
    assert_eq!(low_byte.to_u128(), 0xef);
    let replaced = v.insert_bits(&BitVector::new(8, 0), 7, 0);
    assert_eq!(replaced.to_u128(), 0xdead_be00);
}

#[test]
fn test_byte_swap() {
    let v = BitVector::new(32, 0x1122_3344);
    assert_eq!(v.swap().to_u128(), 0x4433_2211);
}

#[test]
fn test_bit_scan() {
    let v = BitVector::new(8, 0b0010_1000);
    assert_eq!(v.bsf(), Some(3));
    assert_eq!(v.bsr(), Some(5));
    assert_eq!(BitVector::zero(8).bsf(), None);
}
