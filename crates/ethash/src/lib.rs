//! Proof-of-work hashing primitives for the consensus engine: an epoch
//! cache abstraction, hashimoto-light over the Keccak-256 family, and the
//! Argon2id seal used from HF5 onward.
//!
//! This crate deliberately knows nothing about header validation, PoW
//! modes, or difficulty — it exposes the two seal families as pure
//! functions over `(cache, hash_no_nonce, nonce)` and leaves dispatch
//! between them to the caller, which holds the header's version byte.

mod argon2id;
mod cache;
mod hashimoto;

pub use argon2id::argon2id_seal;
pub use cache::{
	Cache, EpochCacheProvider, MemoryCacheProvider, TestCacheProvider, EPOCH_LENGTH, MAX_BLOCK_NUMBER,
	TEST_DATASET_SIZE,
};
pub use hashimoto::hashimoto_light;
