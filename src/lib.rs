#![cfg_attr(not(feature = "std"), no_std)]
#![doc = include_str!("../README.md")]

extern crate alloc;

use alloc::vec;
use alloc::vec::Vec;
use core::cmp::Ordering;
use core::hash::{BuildHasher, Hash};

mod bias;
mod bits;
mod constants;
mod encoding;
mod error;
mod hasher;
mod math;
#[cfg(feature = "serde")]
mod serialize;
mod sparse;

pub use error::Error;
pub use hasher::DefaultHasher;
#[cfg(feature = "std")]
pub use hasher::Murmur3Hasher;

use encoding::{decode, encode, sparse_index, SPARSE_PRECISION};
use sparse::{SparseList, TempSet};

const MIN_PRECISION: u8 = 4;
const MAX_PRECISION: u8 = 25;

/// Storage mode. The transition is one-way: once dense, never sparse again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Format {
    Sparse = 0,
    Dense = 1,
}

/// HyperLogLog++ distinct-count sketch.
///
/// A sketch with precision `p` spends `2^p` bytes once dense; until then it
/// holds hashes as 32-bit codewords in a sorted sparse list (at most `2^p/4`
/// entries, the dense footprint) staged through a small insertion buffer.
/// Counting in sparse mode is linear counting over `2^25` virtual registers
/// and stays near-exact; dense mode uses the bias-corrected raw estimator
/// with a linear-counting fallback at small cardinalities.
///
/// The sketch is single-owner: all mutation goes through `&mut self`, and
/// sharing across threads requires external synchronization.
#[derive(Debug, Clone)]
pub struct HyperLogLogPlus<S = DefaultHasher> {
    p: u8,
    m1: u64,
    m2: u64,
    alpha: f64,
    format: Format,
    temp_set: TempSet,
    sparse: SparseList,
    registers: Vec<u8>,
    hasher: S,
}

#[cfg(feature = "std")]
impl HyperLogLogPlus {
    /// Creates a sketch with `2^p` registers and the default MurmurHash3
    /// binding. Fails for `p` outside `4..=25`.
    pub fn new(p: u8) -> Result<Self, Error> {
        Self::with_hasher(p, DefaultHasher::new())
    }

    /// Creates a sketch whose dense-mode relative error is at most
    /// `error_rate`, picking the smallest adequate precision. Fails for
    /// rates outside `[0.00025390625, 0.26]`.
    pub fn with_error_rate(error_rate: f64) -> Result<Self, Error> {
        Self::with_error_rate_and_hasher(error_rate, DefaultHasher::new())
    }
}

impl<S: BuildHasher> HyperLogLogPlus<S> {
    /// Creates a sketch with `2^p` registers hashing through `hasher`.
    pub fn with_hasher(p: u8, hasher: S) -> Result<Self, Error> {
        if !(MIN_PRECISION..=MAX_PRECISION).contains(&p) {
            return Err(Error::InvalidPrecision(p));
        }
        let m1 = 1u64 << p;
        Ok(Self {
            p,
            m1,
            m2: 1u64 << SPARSE_PRECISION,
            alpha: bias::alpha(m1),
            format: Format::Sparse,
            temp_set: TempSet::new((m1 / 16) as usize),
            sparse: SparseList::new(p, (m1 / 4) as usize),
            registers: Vec::new(),
            hasher,
        })
    }

    /// Like [`HyperLogLogPlus::with_error_rate`], hashing through `hasher`.
    pub fn with_error_rate_and_hasher(error_rate: f64, hasher: S) -> Result<Self, Error> {
        if !(0.00025390625..=0.26).contains(&error_rate) {
            return Err(Error::ErrorRateOutOfBounds(error_rate));
        }
        let ratio = 1.04 / error_rate;
        let p = math::ceil(math::log2(ratio * ratio)) as u8;
        Self::with_hasher(p, hasher)
    }

    /// The configured precision.
    pub fn precision(&self) -> u8 {
        self.p
    }

    /// True while the sketch is still in its sparse representation.
    pub fn is_sparse(&self) -> bool {
        self.format == Format::Sparse
    }

    /// Adds `value` to the stream.
    #[inline]
    pub fn insert<T: Hash + ?Sized>(&mut self, value: &T) {
        self.insert_hash(self.hasher.hash_one(value));
    }

    /// Adds a precomputed 64-bit hash. The hash is expected to be uniformly
    /// distributed; feeding anything weaker degrades the estimate.
    #[inline]
    pub fn insert_hash(&mut self, hash: u64) {
        match self.format {
            Format::Dense => {
                let index = (hash >> (64 - self.p as u32)) as usize;
                let rho = (hash << self.p).leading_zeros() as u8 + 1;
                if self.registers[index] < rho {
                    self.registers[index] = rho;
                }
            }
            Format::Sparse => {
                self.temp_set.push(encode(hash, self.p));
                if self.temp_set.full() {
                    self.flush();
                    if self.sparse.full() {
                        self.to_dense();
                    }
                }
            }
        }
    }

    /// Estimated number of distinct items observed.
    #[inline]
    pub fn count(&mut self) -> usize {
        self.raw_count() as usize
    }

    /// Estimated cardinality before integer truncation.
    pub fn raw_count(&mut self) -> f64 {
        match self.format {
            Format::Sparse => {
                self.flush();
                bias::linear_count(self.m2, self.m2 - self.sparse.len() as u64)
            }
            Format::Dense => self.dense_count(),
        }
    }

    /// Merges `other` into `self`, as if `self` had also observed every item
    /// of `other`'s stream. Fails if the precisions differ.
    pub fn union(&mut self, other: &Self) -> Result<(), Error> {
        self.check_compatible(other)?;
        match (self.format, other.format) {
            (_, Format::Dense) => {
                self.to_dense();
                for (mine, theirs) in self.registers.iter_mut().zip(&other.registers) {
                    if *mine < *theirs {
                        *mine = *theirs;
                    }
                }
            }
            (Format::Dense, Format::Sparse) => {
                for code in other.sparse.iter().chain(other.temp_set.iter()) {
                    let (index, rho) = decode(code, self.p);
                    if self.registers[index as usize] < rho {
                        self.registers[index as usize] = rho;
                    }
                }
            }
            (Format::Sparse, Format::Sparse) => {
                self.flush();
                self.sparse.merge(other.sparse.as_slice());
                self.sparse.merge(other.temp_set.as_slice());
                if self.sparse.full() {
                    self.to_dense();
                }
            }
        }
        Ok(())
    }

    /// Estimated cardinality of the union of the two streams, without
    /// logically modifying either sketch. Fails if the precisions differ.
    pub fn count_union(&self, other: &Self) -> Result<usize, Error> {
        Ok(self.raw_count_union(other)? as usize)
    }

    /// [`HyperLogLogPlus::count_union`] before integer truncation.
    pub fn raw_count_union(&self, other: &Self) -> Result<f64, Error> {
        self.check_compatible(other)?;
        Ok(match (self.format, other.format) {
            (Format::Dense, Format::Dense) => {
                let combined = self
                    .registers
                    .iter()
                    .zip(&other.registers)
                    .map(|(&a, &b)| a.max(b));
                let (sum, zeros) = indicator(combined);
                self.estimate(sum, zeros)
            }
            (Format::Dense, Format::Sparse) => self.dense_sparse_union(other),
            (Format::Sparse, Format::Dense) => other.dense_sparse_union(self),
            (Format::Sparse, Format::Sparse) => {
                let v = self.distinct_union_indices(other);
                bias::linear_count(self.m2, self.m2 - v)
            }
        })
    }

    /// Inclusion-exclusion estimate of the intersection cardinality, clamped
    /// at zero. No error bound is guaranteed for intersections.
    pub fn count_intersection(&self, other: &Self) -> Result<usize, Error> {
        Ok(self.raw_count_intersection(other)?.max(0.0) as usize)
    }

    /// [`HyperLogLogPlus::count_intersection`] without the clamp; small or
    /// heavily skewed intersections can come out negative.
    pub fn raw_count_intersection(&self, other: &Self) -> Result<f64, Error> {
        let union = self.raw_count_union(other)?;
        Ok(self.current_count() + other.current_count() - union)
    }

    /// Promotes the sketch to its dense register array, folding in everything
    /// accumulated while sparse. Idempotent once dense.
    #[cold]
    pub fn to_dense(&mut self) {
        if self.format == Format::Dense {
            return;
        }
        self.registers = vec![0u8; self.m1 as usize];
        for code in self.sparse.iter().chain(self.temp_set.iter()) {
            let (index, rho) = decode(code, self.p);
            if self.registers[index as usize] < rho {
                self.registers[index as usize] = rho;
            }
        }
        self.sparse.clear();
        self.temp_set.clear();
        self.format = Format::Dense;
    }

    /// Drains the temp set into the sparse list.
    fn flush(&mut self) {
        if self.temp_set.is_empty() {
            return;
        }
        self.sparse.merge(self.temp_set.as_slice());
        self.temp_set.clear();
    }

    fn check_compatible(&self, other: &Self) -> Result<(), Error> {
        if self.p != other.p {
            return Err(Error::PrecisionMismatch {
                expected: self.p,
                actual: other.p,
            });
        }
        Ok(())
    }

    fn dense_count(&self) -> f64 {
        let (sum, zeros) = indicator(self.registers.iter().copied());
        self.estimate(sum, zeros)
    }

    /// Cardinality as seen right now, without flushing. Equal to what
    /// `raw_count` would return, since flushing only deduplicates.
    fn current_count(&self) -> f64 {
        match self.format {
            Format::Sparse => {
                let v = self.sorted_indices().len() as u64;
                bias::linear_count(self.m2, self.m2 - v)
            }
            Format::Dense => self.dense_count(),
        }
    }

    /// Dense estimate from the indicator sum and the zero-register count:
    /// raw estimate, bias-corrected below `5 * m1`, with linear counting
    /// preferred below the precision's threshold while zero registers remain.
    fn estimate(&self, sum: f64, zeros: u64) -> f64 {
        let e = self.alpha * (self.m1 * self.m1) as f64 / sum;
        let corrected = if e < 5.0 * self.m1 as f64 {
            e - bias::estimate_bias(e, self.p)
        } else {
            e
        };
        let h = if zeros != 0 {
            bias::linear_count(self.m1, zeros)
        } else {
            corrected
        };
        if h <= bias::threshold(self.p) {
            h
        } else {
            corrected
        }
    }

    /// Union of the dense `self` with the sparse `other` over a transient
    /// register array; neither operand is modified.
    fn dense_sparse_union(&self, other: &Self) -> f64 {
        let mut registers = self.registers.clone();
        for code in other.sparse.iter().chain(other.temp_set.iter()) {
            let (index, rho) = decode(code, self.p);
            if registers[index as usize] < rho {
                registers[index as usize] = rho;
            }
        }
        let (sum, zeros) = indicator(registers.iter().copied());
        self.estimate(sum, zeros)
    }

    /// Distinct sparse indices in this sketch's list and temp set combined.
    fn sorted_indices(&self) -> Vec<u32> {
        let mut indices: Vec<u32> = self
            .sparse
            .iter()
            .chain(self.temp_set.iter())
            .map(sparse_index)
            .collect();
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    /// Distinct sparse indices across both sketches, via a merge-order walk.
    fn distinct_union_indices(&self, other: &Self) -> u64 {
        let a = self.sorted_indices();
        let b = other.sorted_indices();
        let (mut i, mut j) = (0, 0);
        let mut distinct = 0u64;
        while i < a.len() && j < b.len() {
            match a[i].cmp(&b[j]) {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => {
                    i += 1;
                    j += 1;
                }
            }
            distinct += 1;
        }
        distinct + (a.len() - i) as u64 + (b.len() - j) as u64
    }
}

/// Indicator sum `sum(2^-reg)` and zero-register count over a register
/// stream.
fn indicator(registers: impl Iterator<Item = u8>) -> (f64, u64) {
    let mut sum = 0.0;
    let mut zeros = 0u64;
    for r in registers {
        // Ranks can reach 65 (a hash whose suffix is all zero), past the u64
        // width.
        sum += 1.0 / (1u128 << r) as f64;
        zeros += (r == 0) as u64;
    }
    (sum, zeros)
}

impl<T: Hash, S: BuildHasher> Extend<T> for HyperLogLogPlus<S> {
    #[inline]
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.insert(&value);
        }
    }
}

impl<S: BuildHasher> PartialEq for HyperLogLogPlus<S> {
    fn eq(&self, other: &Self) -> bool {
        self.p == other.p
            && self.format == other.format
            && self.temp_set == other.temp_set
            && self.sparse == other.sparse
            && self.registers == other.registers
    }
}

impl<S: BuildHasher> Eq for HyperLogLogPlus<S> {}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    #[test]
    fn empty_sketch_counts_zero() {
        let mut sketch = HyperLogLogPlus::new(14).unwrap();
        assert!(sketch.is_sparse());
        assert_eq!(sketch.count(), 0);
    }

    #[test]
    fn repeats_count_once() {
        let mut sketch = HyperLogLogPlus::new(16).unwrap();
        for _ in 0..10_000 {
            sketch.insert("repeated");
        }
        assert_eq!(sketch.count(), 1);
    }

    #[test]
    fn precision_bounds() {
        assert_eq!(
            HyperLogLogPlus::new(3).unwrap_err(),
            Error::InvalidPrecision(3)
        );
        assert_eq!(
            HyperLogLogPlus::new(26).unwrap_err(),
            Error::InvalidPrecision(26)
        );
        assert!(HyperLogLogPlus::new(4).is_ok());
        assert!(HyperLogLogPlus::new(25).is_ok());
    }

    #[test]
    fn error_rate_bounds() {
        assert_eq!(
            HyperLogLogPlus::with_error_rate(0.3).unwrap_err(),
            Error::ErrorRateOutOfBounds(0.3)
        );
        assert_eq!(
            HyperLogLogPlus::with_error_rate(0.0001).unwrap_err(),
            Error::ErrorRateOutOfBounds(0.0001)
        );
        assert_eq!(HyperLogLogPlus::with_error_rate(0.26).unwrap().precision(), 4);
        assert_eq!(HyperLogLogPlus::with_error_rate(0.01).unwrap().precision(), 14);
    }

    #[test]
    fn precision_mismatch_is_rejected() {
        let mut a = HyperLogLogPlus::new(12).unwrap();
        let b = HyperLogLogPlus::new(14).unwrap();
        let expected = Error::PrecisionMismatch {
            expected: 12,
            actual: 14,
        };
        assert_eq!(a.union(&b).unwrap_err(), expected);
        assert_eq!(a.count_union(&b).unwrap_err(), expected);
        assert_eq!(a.count_intersection(&b).unwrap_err(), expected);
    }

    #[test]
    fn promotion_is_one_way_and_idempotent() {
        let mut sketch = HyperLogLogPlus::new(4).unwrap();
        // capacity m1/4 = 4 codewords at p = 4
        for i in 0..64u64 {
            sketch.insert(&i);
        }
        assert!(!sketch.is_sparse());
        let registers = sketch.registers.clone();
        sketch.to_dense();
        assert_eq!(sketch.registers, registers);
        for i in 64..128u64 {
            sketch.insert(&i);
        }
        assert!(!sketch.is_sparse());
    }

    #[test]
    fn extend_matches_insert() {
        let mut a = HyperLogLogPlus::new(12).unwrap();
        let mut b = HyperLogLogPlus::new(12).unwrap();
        a.extend(0..500u64);
        for i in 0..500u64 {
            b.insert(&i);
        }
        assert_eq!(a, b);
    }

    #[test]
    fn hasher_can_be_swapped() {
        let mut sketch =
            HyperLogLogPlus::with_hasher(12, foldhash::fast::RandomState::default()).unwrap();
        let n = 10_000u64;
        for i in 0..n {
            sketch.insert(&i);
        }
        let estimate = sketch.count() as f64;
        assert!((estimate / n as f64 - 1.0).abs() < 0.1);
    }
}
