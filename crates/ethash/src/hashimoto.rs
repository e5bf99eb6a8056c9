//! The Keccak-256-family hashimoto-light verification routine: recomputes
//! `(mix_digest, result)` from a header's pre-nonce hash, a nonce, and an
//! epoch cache, without needing the full mining dataset.

use ethereum_types::H256;
use keccak_hash::keccak;
use tiny_keccak::{Hasher, Keccak};

use crate::cache::Cache;

const MIX_BYTES: usize = 128;
const HASH_BYTES: usize = 64;
const WORD_BYTES: usize = 4;
const MIX_WORDS: usize = MIX_BYTES / WORD_BYTES;
const ACCESSES: usize = 64;
const FNV_PRIME: u32 = 0x0100_0193;

fn fnv(a: u32, b: u32) -> u32 {
	a.wrapping_mul(FNV_PRIME) ^ b
}

fn keccak512(data: &[u8]) -> [u8; 64] {
	let mut hasher = Keccak::v512();
	hasher.update(data);
	let mut out = [0u8; 64];
	hasher.finalize(&mut out);
	out
}

fn words_le(bytes: &[u8]) -> Vec<u32> {
	bytes.chunks_exact(4).map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]])).collect()
}

/// Recompute the mix digest and PoW result for `(hash_no_nonce, nonce)`
/// against `cache`, whose dataset spans `dataset_size` bytes.
pub fn hashimoto_light(dataset_size: usize, cache: &Cache, hash_no_nonce: H256, nonce: u64) -> (H256, H256) {
	let mut seed_input = Vec::with_capacity(40);
	seed_input.extend_from_slice(hash_no_nonce.as_bytes());
	seed_input.extend_from_slice(&nonce.to_le_bytes());
	let seed = keccak512(&seed_input);

	let seed_head = u32::from_le_bytes([seed[0], seed[1], seed[2], seed[3]]);
	let seed_words = words_le(&seed);

	let mut mix = vec![0u32; MIX_WORDS];
	for (i, word) in mix.iter_mut().enumerate() {
		*word = seed_words[i % seed_words.len()];
	}

	let num_full_pages = ((dataset_size / MIX_BYTES).max(1)) as u32;
	let parents_per_access = MIX_BYTES / HASH_BYTES;

	for i in 0..ACCESSES {
		let p = fnv(seed_head ^ i as u32, mix[i % MIX_WORDS]) % num_full_pages;

		let mut newdata = Vec::with_capacity(MIX_WORDS);
		for j in 0..parents_per_access {
			let item = cache.calc_dataset_item((p as u64 * parents_per_access as u64 + j as u64) as u32);
			newdata.extend(words_le(&item));
		}

		for (m, n) in mix.iter_mut().zip(newdata.iter()) {
			*m = fnv(*m, *n);
		}
	}

	let mut cmix = [0u32; MIX_WORDS / 4];
	for (i, out) in cmix.iter_mut().enumerate() {
		let base = i * 4;
		*out = fnv(fnv(fnv(mix[base], mix[base + 1]), mix[base + 2]), mix[base + 3]);
	}

	let mut mix_digest = [0u8; 32];
	for (i, word) in cmix.iter().enumerate() {
		mix_digest[i * 4..i * 4 + 4].copy_from_slice(&word.to_le_bytes());
	}

	let mut result_input = Vec::with_capacity(64 + 32);
	result_input.extend_from_slice(&seed);
	result_input.extend_from_slice(&mix_digest);
	let result = keccak(&result_input);

	(H256::from(mix_digest), result)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::cache::MemoryCacheProvider;
	use crate::EpochCacheProvider;

	#[test]
	fn deterministic_for_fixed_inputs() {
		let provider = MemoryCacheProvider::new();
		let cache = provider.cache(0);
		let size = provider.dataset_size(0);
		let hash = H256::repeat_byte(0x11);
		let a = hashimoto_light(size, &cache, hash, 7);
		let b = hashimoto_light(size, &cache, hash, 7);
		assert_eq!(a, b);
	}

	#[test]
	fn nonce_changes_the_digest() {
		let provider = MemoryCacheProvider::new();
		let cache = provider.cache(0);
		let size = provider.dataset_size(0);
		let hash = H256::repeat_byte(0x22);
		let (mix_a, result_a) = hashimoto_light(size, &cache, hash, 1);
		let (mix_b, result_b) = hashimoto_light(size, &cache, hash, 2);
		assert!(mix_a != mix_b || result_a != result_b);
	}
}
