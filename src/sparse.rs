//! Sparse-mode storage: a sorted codeword list plus its insertion buffer.

use alloc::vec::Vec;
use core::cmp::Ordering;

use crate::encoding::sparse_index;

/// Ordering shared by the sparse list and the temp set: sparse index
/// ascending, ties broken by raw codeword descending so that the entry
/// carrying the largest rank sorts first within an index.
#[inline]
fn cmp_codewords(a: u32, b: u32) -> Ordering {
    sparse_index(a).cmp(&sparse_index(b)).then(b.cmp(&a))
}

/// Sorted array of sparse codewords, at most one per sparse index.
///
/// The configured maximum length is `m1 / 4`, which caps the sparse form at
/// the memory footprint of the dense register array it will be promoted into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SparseList {
    data: Vec<u32>,
    p: u8,
    max_size: usize,
}

impl SparseList {
    pub fn new(p: u8, max_size: usize) -> Self {
        Self {
            data: Vec::new(),
            p,
            max_size,
        }
    }

    pub fn from_parts(data: Vec<u32>, p: u8, max_size: usize) -> Self {
        Self { data, p, max_size }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn full(&self) -> bool {
        self.data.len() >= self.max_size
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.data
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.data.iter().copied()
    }

    pub fn p(&self) -> u8 {
        self.p
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Folds a batch of codewords into the list.
    ///
    /// `codes` may be unsorted and may repeat indices already present. The
    /// list itself is assumed sorted and deduplicated on entry and is sorted
    /// and deduplicated again on exit, keeping the largest-rank codeword for
    /// every index.
    pub fn merge(&mut self, codes: &[u32]) {
        if codes.is_empty() {
            return;
        }
        let mut incoming = codes.to_vec();
        incoming.sort_unstable_by(|&a, &b| cmp_codewords(a, b));

        let original_len = self.data.len();
        let mut cursor = 0;
        let mut last_index = None;
        let mut dirty = false;
        for &code in &incoming {
            let index = sparse_index(code);
            if last_index == Some(index) {
                // Repeats of an index sort after its largest codeword.
                continue;
            }
            last_index = Some(index);
            while cursor < original_len && sparse_index(self.data[cursor]) < index {
                cursor += 1;
            }
            if cursor == original_len || index < sparse_index(self.data[cursor]) {
                self.data.push(code);
                dirty = true;
            } else if code > self.data[cursor] {
                self.data[cursor] = code;
                dirty = true;
            }
        }
        if dirty {
            self.data.sort_unstable_by(|&a, &b| cmp_codewords(a, b));
        }
    }
}

/// Bounded staging buffer batching inserts ahead of a sorted merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TempSet {
    data: Vec<u32>,
    capacity: usize,
}

impl TempSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: Vec::new(),
            capacity,
        }
    }

    pub fn from_parts(data: Vec<u32>, capacity: usize) -> Self {
        Self { data, capacity }
    }

    #[inline]
    pub fn push(&mut self, code: u32) {
        self.data.push(code);
    }

    #[inline]
    pub fn full(&self) -> bool {
        self.data.len() >= self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.data
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.data.iter().copied()
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }
}
