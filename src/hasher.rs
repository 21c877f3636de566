//! Default hash binding: 128-bit MurmurHash3 (x64 variant), of which the
//! first 64-bit word is used.
//!
//! The binding is a capability, not part of the sketch state: serialization
//! omits it, and any [`core::hash::BuildHasher`] can replace it at
//! construction time.

/// Builds [`Murmur3Hasher`]s. The default seed is 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefaultHasher {
    seed: u32,
}

impl DefaultHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A hasher family keyed by `seed`. Sketches that should be comparable
    /// must share the seed; like the binding itself, it is not serialized.
    pub fn with_seed(seed: u32) -> Self {
        Self { seed }
    }
}

#[cfg(feature = "std")]
pub use imp::Murmur3Hasher;

#[cfg(feature = "std")]
mod imp {
    use super::DefaultHasher;
    use std::hash::{BuildHasher, Hasher};
    use std::io::Cursor;

    /// Streaming adapter over `murmur3::murmur3_x64_128`. `finish` returns
    /// the first (low) 64-bit word of the 128-bit digest.
    #[derive(Debug, Default, Clone)]
    pub struct Murmur3Hasher {
        seed: u32,
        buf: Vec<u8>,
    }

    impl BuildHasher for DefaultHasher {
        type Hasher = Murmur3Hasher;

        fn build_hasher(&self) -> Murmur3Hasher {
            Murmur3Hasher {
                seed: self.seed,
                buf: Vec::new(),
            }
        }
    }

    impl Hasher for Murmur3Hasher {
        #[inline]
        fn write(&mut self, bytes: &[u8]) {
            self.buf.extend_from_slice(bytes);
        }

        fn finish(&self) -> u64 {
            let digest = murmur3::murmur3_x64_128(&mut Cursor::new(&self.buf), self.seed)
                .expect("reading from an in-memory buffer cannot fail");
            digest as u64
        }
    }

}
