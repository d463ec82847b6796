//! A stable, fixed-seed hash used wherever the engine needs "the same key
//! always maps to the same value within one process run", most notably
//! `FieldGrouping`'s key-to-instance mapping (§4.3 of the design).
//!
//! The default `std` hasher is randomized per-process (a DoS mitigation for
//! hash maps), so it is deliberately avoided here in favor of a fixed-seed
//! `WyHash`, the same tool this codebase reaches for anywhere it hashes a
//! user key for routing rather than for a `HashMap`.

use std::hash::{Hash, Hasher};

pub fn stable_hash<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = wyhash::WyHash::with_seed(0x0123_4567_89ab_cdef);
    value.hash(&mut hasher);
    hasher.finish()
}
