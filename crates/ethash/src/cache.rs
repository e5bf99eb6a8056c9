//! Epoch cache provider.
//!
//! Real Ethash-family caches and datasets are memory-hard structures built
//! by a sequential keccak chain over tens of megabytes; generating and
//! memory-mapping that blob is explicitly out of scope for this crate (see
//! the spec's "PoW cache/dataset generator" non-goal). What *is* in scope
//! is the lookup contract `hashimoto_light` verifies against: given an
//! epoch, return something that can answer `calc_dataset_item(index)`.
//! [`Cache`] here is a lightweight stand-in satisfying that contract;
//! production deployments swap it for a real memory-mapped DAG cache
//! without touching the verifier.

use std::sync::Arc;

use ethereum_types::H256;
use keccak_hash::keccak;
use lru_cache::LruCache;
use parking_lot::Mutex;

use consensus_types::BlockNumber;

/// Blocks per epoch; caches and datasets are keyed by `number / EPOCH_LENGTH`.
pub const EPOCH_LENGTH: u64 = 30_000;

/// Highest block number a cache provider will serve, per the consensus
/// spec's `MaxEpoch` cap.
pub const MAX_BLOCK_NUMBER: u64 = 60_000_000;

/// The dataset size used by [`TestCacheProvider`], for callers running in a
/// test seal-verification mode that should never wait on a realistically
/// sized dataset.
pub const TEST_DATASET_SIZE: usize = 32 * 1024;

const HASH_BYTES: usize = 64;

/// An epoch's verification cache.
///
/// `calc_dataset_item` is the opaque lookup contract: it must be
/// deterministic in `(epoch, index)` and is otherwise free to be whatever
/// the real dataset generator produces.
pub struct Cache {
	epoch: u64,
	seed: H256,
}

impl Cache {
	fn new(epoch: u64) -> Self {
		Cache { epoch, seed: seedhash(epoch) }
	}

	/// Epoch this cache was built for.
	pub fn epoch(&self) -> u64 {
		self.epoch
	}

	/// Derive the dataset item at `index`. Two parent items are combined
	/// into a 64-byte mix row per hashimoto access.
	pub fn calc_dataset_item(&self, index: u32) -> [u8; HASH_BYTES] {
		let mut buf = Vec::with_capacity(32 + 8 + 4);
		buf.extend_from_slice(self.seed.as_bytes());
		buf.extend_from_slice(&self.epoch.to_le_bytes());
		buf.extend_from_slice(&index.to_le_bytes());
		let first = keccak(&buf);
		buf.extend_from_slice(first.as_bytes());
		let second = keccak(&buf);

		let mut out = [0u8; HASH_BYTES];
		out[..32].copy_from_slice(first.as_bytes());
		out[32..].copy_from_slice(second.as_bytes());
		out
	}
}

/// The per-epoch seed chaining the cache to its epoch number.
fn seedhash(epoch: u64) -> H256 {
	let mut seed = H256::zero();
	for _ in 0..epoch {
		seed = keccak(seed.as_bytes());
	}
	seed
}

/// Source of epoch caches and dataset sizes for the seal verifier.
pub trait EpochCacheProvider: Send + Sync {
	/// The cache covering `block_number`'s epoch. Implementations must keep
	/// the returned handle valid for as long as any clone of it is held —
	/// callers rely on the `Arc` refcount, not on scoping alone, to keep a
	/// cache alive through a `hashimoto_light` call.
	fn cache(&self, block_number: BlockNumber) -> Arc<Cache>;

	/// Dataset size in bytes for `block_number`'s epoch.
	fn dataset_size(&self, block_number: BlockNumber) -> usize;

	/// Blocks per epoch.
	fn epoch_length(&self) -> u64 {
		EPOCH_LENGTH
	}

	/// Highest epoch this provider will ever serve.
	fn max_epoch(&self) -> u64 {
		MAX_BLOCK_NUMBER / self.epoch_length()
	}
}

/// An [`EpochCacheProvider`] that builds caches in memory on demand and
/// retains the two most recently used epochs, guarded by a single lock —
/// adequate for a verifier that mostly sees monotonically increasing block
/// numbers.
pub struct MemoryCacheProvider {
	epoch_length: u64,
	base_size: usize,
	growth_per_epoch: usize,
	caches: Mutex<LruCache<u64, Arc<Cache>>>,
}

impl MemoryCacheProvider {
	/// A provider using the standard epoch length and a dataset size that
	/// grows slowly with epoch, mirroring Ethash's own size schedule in
	/// shape (not magnitude — the schedule here is a deliberately smaller
	/// stand-in since generating the true multi-gigabyte dataset is out of
	/// scope).
	pub fn new() -> Self {
		MemoryCacheProvider {
			epoch_length: EPOCH_LENGTH,
			base_size: 1 << 20,
			growth_per_epoch: 1 << 14,
			caches: Mutex::new(LruCache::new(2)),
		}
	}
}

impl Default for MemoryCacheProvider {
	fn default() -> Self {
		Self::new()
	}
}

impl EpochCacheProvider for MemoryCacheProvider {
	fn cache(&self, block_number: BlockNumber) -> Arc<Cache> {
		let epoch = block_number / self.epoch_length;
		let mut caches = self.caches.lock();
		if let Some(c) = caches.get_mut(&epoch) {
			return c.clone();
		}
		let c = Arc::new(Cache::new(epoch));
		caches.insert(epoch, c.clone());
		c
	}

	fn dataset_size(&self, block_number: BlockNumber) -> usize {
		let epoch = block_number / self.epoch_length;
		self.base_size + self.growth_per_epoch * epoch as usize
	}

	fn epoch_length(&self) -> u64 {
		self.epoch_length
	}
}

/// A provider that always serves [`TEST_DATASET_SIZE`], so unit tests never
/// have to wait on (or allocate) a realistically sized dataset.
pub struct TestCacheProvider {
	inner: MemoryCacheProvider,
}

impl TestCacheProvider {
	pub fn new() -> Self {
		TestCacheProvider { inner: MemoryCacheProvider::new() }
	}
}

impl Default for TestCacheProvider {
	fn default() -> Self {
		Self::new()
	}
}

impl EpochCacheProvider for TestCacheProvider {
	fn cache(&self, block_number: BlockNumber) -> Arc<Cache> {
		self.inner.cache(block_number)
	}

	fn dataset_size(&self, _block_number: BlockNumber) -> usize {
		TEST_DATASET_SIZE
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn same_epoch_cache_is_reused() {
		let provider = MemoryCacheProvider::new();
		let a = provider.cache(10);
		let b = provider.cache(EPOCH_LENGTH + 9);
		assert!(Arc::ptr_eq(&a, &b));
	}

	#[test]
	fn different_epochs_get_different_caches() {
		let provider = MemoryCacheProvider::new();
		let a = provider.cache(0);
		let b = provider.cache(EPOCH_LENGTH);
		assert!(!Arc::ptr_eq(&a, &b));
		assert_ne!(a.calc_dataset_item(0), b.calc_dataset_item(0));
	}

	#[test]
	fn dataset_item_lookup_is_deterministic() {
		let cache = Cache::new(3);
		assert_eq!(cache.calc_dataset_item(42), cache.calc_dataset_item(42));
	}

	#[test]
	fn max_epoch_respects_block_number_cap() {
		let provider = MemoryCacheProvider::new();
		assert_eq!(provider.max_epoch(), MAX_BLOCK_NUMBER / EPOCH_LENGTH);
	}
}
