//! The Argon2id-family seal, used from HF5 onward in place of
//! hashimoto-light. Argon2id's memory hardness comes from the algorithm
//! itself rather than an external cache/dataset, so this module needs
//! nothing from [`crate::cache`].

use argon2::{Algorithm, Argon2, Params, Version};
use ethereum_types::H256;

/// Output length of the seal digest, in bytes.
const OUTPUT_LEN: usize = 32;
/// Memory cost in KiB, time cost, and parallelism baked into the seal —
/// fixed rather than configurable so every verifier derives the same
/// result for the same header.
const M_COST: u32 = 16 * 1024;
const T_COST: u32 = 2;
const P_COST: u32 = 1;

/// Derive the `(mix_digest, result)` pair for `(hash_no_nonce, nonce)` under
/// the Argon2id family. Unlike hashimoto-light, this family has no separate
/// mix digest to recompute — the mix digest is always the zero hash, and a
/// header's declared `mix_digest` must also be zero for the seal to verify.
/// Only `result`, the real Argon2id output, carries the proof-of-work.
pub fn argon2id_seal(hash_no_nonce: H256, nonce: u64) -> (H256, H256) {
	let mut password = Vec::with_capacity(40);
	password.extend_from_slice(hash_no_nonce.as_bytes());
	password.extend_from_slice(&nonce.to_le_bytes());

	let salt = hash_no_nonce.as_bytes();
	let params =
		Params::new(M_COST, T_COST, P_COST, Some(OUTPUT_LEN)).expect("fixed Argon2id parameters are valid");
	let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

	let mut out = [0u8; OUTPUT_LEN];
	argon2
		.hash_password_into(&password, salt, &mut out)
		.expect("fixed-length output buffer matches the configured params");

	(H256::zero(), H256::from(out))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn mix_digest_is_always_zero() {
		let (mix_digest, _) = argon2id_seal(H256::repeat_byte(0x33), 5);
		assert_eq!(mix_digest, H256::zero());
	}

	#[test]
	fn deterministic_for_fixed_inputs() {
		let hash = H256::repeat_byte(0x33);
		assert_eq!(argon2id_seal(hash, 5), argon2id_seal(hash, 5));
	}

	#[test]
	fn nonce_changes_the_result() {
		let hash = H256::repeat_byte(0x44);
		let (_, a) = argon2id_seal(hash, 1);
		let (_, b) = argon2id_seal(hash, 2);
		assert_ne!(a, b);
	}

	#[test]
	fn hash_changes_the_result() {
		let (_, a) = argon2id_seal(H256::repeat_byte(0x01), 9);
		let (_, b) = argon2id_seal(H256::repeat_byte(0x02), 9);
		assert_ne!(a, b);
	}
}
