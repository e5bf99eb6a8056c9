//! Proof-of-work seal verification.

use std::sync::Arc;
use std::time::Duration;

use ethash::{argon2id_seal, hashimoto_light, EpochCacheProvider};
use ethereum_types::{H256, U256};
use unexpected::Mismatch;

use consensus_types::{BlockNumber, ChainConfig, Header, HeaderVersion};

use crate::error::{BlockError, Error, ErrorKind};

/// A seal verifier a `Shared` mode can delegate to: a process-wide instance
/// other `ConsensusEngine`s hand their seal checks off to, rather than each
/// running its own.
pub trait SharedSealVerifier: Send + Sync {
	fn verify_seal(&self, header: &Header) -> Result<(), Error>;
}

/// Controls how strictly a seal is checked, mirroring the range of modes a
/// node needs beyond full verification: generating test fixtures,
/// benchmarking without real mining, and so on.
#[derive(Clone)]
pub enum PowMode {
	/// Full verification against a real epoch cache.
	Normal,
	/// Sleeps `fake_delay`, then succeeds — unless `fake_fail` names the
	/// header's own block number, in which case it fails with `InvalidPoW`.
	/// Used by single-node dev chains that still want to see mining latency
	/// and the odd rejected block.
	Fake { fake_delay: Duration, fake_fail: Option<BlockNumber> },
	/// Same sleep/pinned-failure behaviour as `Fake` for a single seal check;
	/// a batch verification additionally fast-paths every header in the
	/// batch to unconditional success without even running structural
	/// header checks (see `batch::verify_headers`).
	FullFake { fake_delay: Duration, fake_fail: Option<BlockNumber> },
	/// Verification is delegated to a process-wide shared instance (e.g. a
	/// remote mining pool bridge) rather than performed locally.
	Shared(Arc<dyn SharedSealVerifier>),
	/// Full verification against the small fixed-size test dataset.
	Test,
}

impl PowMode {
	/// `Fake` mode with no delay and no pinned failure — the common case in
	/// tests that just want seal checks out of the way.
	pub fn fake() -> Self {
		PowMode::Fake { fake_delay: Duration::from_secs(0), fake_fail: None }
	}

	/// `FullFake` mode with no delay and no pinned failure.
	pub fn full_fake() -> Self {
		PowMode::FullFake { fake_delay: Duration::from_secs(0), fake_fail: None }
	}
}

/// Highest epoch a seal verifier will serve a cache for.
pub fn max_epoch(config: &ChainConfig, provider: &dyn EpochCacheProvider) -> u64 {
	let _ = config;
	provider.max_epoch()
}

/// Verify `header`'s seal under `mode`, using `provider` for epoch caches
/// when the PoW family requires one.
pub fn verify_seal(header: &Header, mode: &PowMode, provider: &dyn EpochCacheProvider) -> Result<(), Error> {
	match mode {
		PowMode::Fake { fake_delay, fake_fail } | PowMode::FullFake { fake_delay, fake_fail } => {
			if !fake_delay.is_zero() {
				std::thread::sleep(*fake_delay);
			}
			if *fake_fail == Some(header.number()) {
				log::debug!("rejected seal for header #{}: pinned fake failure", header.number());
				return Err(ErrorKind::Block(BlockError::InvalidPoW).into());
			}
			return Ok(());
		}
		PowMode::Shared(shared) => return shared.verify_seal(header),
		PowMode::Normal | PowMode::Test => {}
	}

	if header.version() == HeaderVersion::Unset {
		log::debug!("rejected seal for header #{}: version byte unset", header.number());
		return Err(ErrorKind::Block(BlockError::UnsetHeaderVersion).into());
	}

	if header.difficulty().is_zero() {
		log::debug!("rejected seal for header #{}: zero difficulty", header.number());
		return Err(ErrorKind::Block(BlockError::InvalidDifficulty(Mismatch { expected: U256::from(1), found: U256::zero() })).into());
	}

	let epoch = header.number() / provider.epoch_length();
	if epoch >= provider.max_epoch() {
		log::debug!("rejected seal for header #{}: epoch {} at or beyond max {}", header.number(), epoch, provider.max_epoch());
		return Err(ErrorKind::Block(BlockError::NonceOutOfRange(unexpected::OutOfBounds {
			min: None,
			max: Some(provider.max_epoch()),
			found: epoch,
		}))
		.into());
	}

	let hash_no_nonce = header.hash_no_nonce();
	let (mix_digest, result) = match header.version() {
		HeaderVersion::Keccak256 => {
			let cache: Arc<ethash::Cache> = provider.cache(header.number());
			let dataset_size = provider.dataset_size(header.number());
			hashimoto_light(dataset_size, &cache, hash_no_nonce, header.nonce())
		}
		HeaderVersion::Argon2id => argon2id_seal(hash_no_nonce, header.nonce()),
		HeaderVersion::Unset => unreachable!("checked above"),
	};
	log::trace!(
		target: "miner",
		"num={} non={} h={} mix={} res={}",
		header.number(),
		header.nonce(),
		hash_no_nonce,
		mix_digest,
		result,
	);

	if &mix_digest != header.mix_digest() {
		log::debug!("rejected seal for header #{}: mix digest mismatch", header.number());
		return Err(ErrorKind::Block(BlockError::InvalidMixDigest(Mismatch {
			expected: mix_digest,
			found: *header.mix_digest(),
		}))
		.into());
	}

	if !below_target(&result, header.difficulty()) {
		log::debug!("rejected seal for header #{}: result above difficulty target", header.number());
		return Err(ErrorKind::Block(BlockError::InvalidPoW).into());
	}

	Ok(())
}

/// Whether `result`, read as a big-endian integer, lands under
/// `2^256 / difficulty` — the standard PoW target comparison.
fn below_target(result: &H256, difficulty: U256) -> bool {
	if difficulty.is_zero() {
		return false;
	}
	let target = U256::max_value() / difficulty;
	U256::from_big_endian(result.as_bytes()) <= target
}

#[cfg(test)]
mod tests {
	use super::*;
	use ethash::MemoryCacheProvider;

	#[test]
	fn fake_mode_accepts_anything() {
		let header = Header::new();
		let provider = MemoryCacheProvider::new();
		assert!(verify_seal(&header, &PowMode::fake(), &provider).is_ok());
	}

	#[test]
	fn fake_mode_fails_only_at_the_pinned_block() {
		let mut header = Header::new();
		header.set_number(7);
		let provider = MemoryCacheProvider::new();
		let mode = PowMode::Fake { fake_delay: Duration::from_secs(0), fake_fail: Some(7) };
		let result = verify_seal(&header, &mode, &provider);
		assert!(matches!(result, Err(Error(ErrorKind::Block(BlockError::InvalidPoW), _))));

		header.set_number(8);
		assert!(verify_seal(&header, &mode, &provider).is_ok());
	}

	#[test]
	fn shared_mode_delegates_to_the_shared_verifier() {
		struct AlwaysFails;
		impl SharedSealVerifier for AlwaysFails {
			fn verify_seal(&self, _header: &Header) -> Result<(), Error> {
				Err(ErrorKind::Block(BlockError::InvalidPoW).into())
			}
		}
		let header = Header::new();
		let provider = MemoryCacheProvider::new();
		let mode = PowMode::Shared(Arc::new(AlwaysFails));
		let result = verify_seal(&header, &mode, &provider);
		assert!(matches!(result, Err(Error(ErrorKind::Block(BlockError::InvalidPoW), _))));
	}

	#[test]
	fn rejects_zero_difficulty() {
		let mut header = Header::new();
		header.set_version(HeaderVersion::Keccak256);
		let provider = MemoryCacheProvider::new();
		let result = verify_seal(&header, &PowMode::Normal, &provider);
		assert!(result.is_err());
	}

	#[test]
	fn rejects_unset_version() {
		let mut header = Header::new();
		header.set_difficulty(U256::from(1));
		let provider = MemoryCacheProvider::new();
		let result = verify_seal(&header, &PowMode::Normal, &provider);
		assert!(matches!(
			result,
			Err(Error(ErrorKind::Block(BlockError::UnsetHeaderVersion), _))
		));
	}

	#[test]
	fn below_target_matches_difficulty_one_always() {
		let result = H256::repeat_byte(0xff);
		assert!(below_target(&result, U256::from(1)));
	}
}
