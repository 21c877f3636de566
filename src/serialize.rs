//! Serde envelope for the sketch state.
//!
//! The record carries everything derived from hash outputs and nothing else:
//! the hash binding is not serialized, and a deserialized sketch hashes with
//! the host's default binding (or whatever `S::default()` yields).

use alloc::vec::Vec;
use core::hash::BuildHasher;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::sparse::{SparseList, TempSet};
use crate::{Format, HyperLogLogPlus, MAX_PRECISION, MIN_PRECISION};

#[derive(Serialize, Deserialize)]
struct Envelope {
    p: u8,
    m1: u64,
    m2: u64,
    alpha: f64,
    format: u8,
    temp_set: Vec<u32>,
    sparse_list: SparseListEnvelope,
    registers: Vec<u8>,
}

#[derive(Serialize, Deserialize)]
struct SparseListEnvelope {
    data: Vec<u32>,
    p: u8,
    max_size: i64,
}

impl<S: BuildHasher> Serialize for HyperLogLogPlus<S> {
    fn serialize<Ser: Serializer>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error> {
        Envelope {
            p: self.p,
            m1: self.m1,
            m2: self.m2,
            alpha: self.alpha,
            format: self.format as u8,
            temp_set: self.temp_set.as_slice().to_vec(),
            sparse_list: SparseListEnvelope {
                data: self.sparse.as_slice().to_vec(),
                p: self.sparse.p(),
                max_size: self.sparse.max_size() as i64,
            },
            registers: self.registers.clone(),
        }
        .serialize(serializer)
    }
}

impl<'de, S: BuildHasher + Default> Deserialize<'de> for HyperLogLogPlus<S> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let env = Envelope::deserialize(deserializer)?;
        if !(MIN_PRECISION..=MAX_PRECISION).contains(&env.p) {
            return Err(D::Error::custom("precision out of range"));
        }
        let format = match env.format {
            0 => Format::Sparse,
            1 => Format::Dense,
            _ => return Err(D::Error::custom("unknown sketch format")),
        };
        let max_size = usize::try_from(env.sparse_list.max_size)
            .map_err(|_| D::Error::custom("negative sparse list size"))?;
        Ok(HyperLogLogPlus {
            p: env.p,
            m1: env.m1,
            m2: env.m2,
            alpha: env.alpha,
            format,
            temp_set: TempSet::from_parts(env.temp_set, (env.m1 / 16) as usize),
            sparse: SparseList::from_parts(env.sparse_list.data, env.sparse_list.p, max_size),
            registers: env.registers,
            hasher: S::default(),
        })
    }
}
