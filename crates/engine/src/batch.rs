//! Concurrent, order-preserving batch header verification.
//!
//! Headers usually arrive as a contiguous run during sync, each one's
//! parent being the header immediately before it in the batch. Verifying
//! them one at a time wastes the machine; verifying them out of order
//! loses the index a caller needs to find out exactly which header in a
//! rejected batch was bad. This runs a bounded worker pool over a
//! work-stealing cursor and collects results into a slot per input index,
//! so the emitted `Vec` always matches the input order regardless of which
//! worker finished which header first.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_channel::bounded;
use ethash::EpochCacheProvider;
use parking_lot::Mutex;

use consensus_types::Header;

use crate::chain::ChainReader;
use crate::error::{Error, ErrorKind};
use crate::header_validator::{self, ValidationContext};
use crate::seal::{self, PowMode};

/// Shared cancellation flag for an in-flight batch. Cloning shares the same
/// underlying flag; calling [`BatchHandle::cancel`] on any clone stops
/// every worker at its next index fetch.
#[derive(Clone)]
pub struct BatchHandle {
	cancelled: Arc<AtomicBool>,
}

impl BatchHandle {
	fn new() -> Self {
		BatchHandle { cancelled: Arc::new(AtomicBool::new(false)) }
	}

	/// Request that the batch stop dispatching new work. Headers already
	/// being verified by a worker still finish; headers not yet picked up
	/// are reported as [`ErrorKind::Cancelled`].
	pub fn cancel(&self) {
		self.cancelled.store(true, Ordering::SeqCst);
	}

	fn is_cancelled(&self) -> bool {
		self.cancelled.load(Ordering::SeqCst)
	}
}

/// Verify `headers` as a contiguous run extending `parent`, returning one
/// result per header in input order. `now` applies to every header in the
/// batch uniformly.
pub fn verify_headers(
	headers: &[Header],
	parent: &Header,
	chain: &dyn ChainReader,
	pow_provider: &dyn EpochCacheProvider,
	mode: &PowMode,
	check_seal: bool,
	now: u64,
) -> (Vec<Result<(), Error>>, BatchHandle) {
	let handle = BatchHandle::new();

	if headers.is_empty() {
		return (Vec::new(), handle);
	}

	if matches!(mode, PowMode::FullFake { .. }) {
		let results = headers.iter().map(|_| Ok(())).collect();
		return (results, handle);
	}

	let worker_count = headers.len().min(num_cpus::get()).max(1);
	let cursor = AtomicUsize::new(0);
	let results: Mutex<Vec<Option<Result<(), Error>>>> = Mutex::new((0..headers.len()).map(|_| None).collect());
	let (done_tx, done_rx) = bounded::<()>(headers.len());

	std::thread::scope(|scope| {
		for _ in 0..worker_count {
			let cursor = &cursor;
			let results = &results;
			let handle = &handle;
			let done_tx = done_tx.clone();
			scope.spawn(move || loop {
				let index = cursor.fetch_add(1, Ordering::SeqCst);
				if index >= headers.len() {
					break;
				}

				let outcome = if handle.is_cancelled() {
					Err(ErrorKind::Cancelled.into())
				} else {
					let item_parent = if index == 0 { parent } else { &headers[index - 1] };
					verify_one(&headers[index], item_parent, chain, pow_provider, mode, check_seal, now)
				};

				results.lock()[index] = Some(outcome);
				let _ = done_tx.send(());
			});
		}
		drop(done_tx);
		for _ in 0..headers.len() {
			let _ = done_rx.recv();
		}
	});

	let ordered = results.into_inner().into_iter().map(|slot| slot.expect("every index was written exactly once")).collect();
	(ordered, handle)
}

fn verify_one(
	header: &Header,
	parent: &Header,
	chain: &dyn ChainReader,
	pow_provider: &dyn EpochCacheProvider,
	mode: &PowMode,
	check_seal: bool,
	now: u64,
) -> Result<(), Error> {
	let config = chain.config();

	if header.parent_hash() != &parent.hash() {
		return Err(crate::error::ErrorKind::Block(crate::error::BlockError::UnknownAncestor(*header.parent_hash())).into());
	}

	let expected_version = config.block_version(header.number()).to_byte();
	if let Some(known) = chain.header(&header.hash_with_version(expected_version)) {
		if &known == header {
			return Ok(());
		}
	}

	let ctx = ValidationContext { config, now, is_uncle: false };
	header_validator::verify_header(header, parent, &ctx)?;

	if check_seal {
		seal::verify_seal(header, mode, pow_provider)?;
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use consensus_types::{BlockNumber, ChainConfig, HeaderVersion};
	use ethash::MemoryCacheProvider;
	use ethereum_types::{H256, U256};
	use std::collections::HashMap;
	use std::sync::Mutex as StdMutex;

	struct FakeChain {
		config: ChainConfig,
		by_hash: StdMutex<HashMap<H256, Header>>,
	}

	impl ChainReader for FakeChain {
		fn config(&self) -> &ChainConfig {
			&self.config
		}
		fn header(&self, hash: &H256) -> Option<Header> {
			self.by_hash.lock().unwrap().get(hash).cloned()
		}
		fn header_by_number(&self, _number: BlockNumber) -> Option<Header> {
			None
		}
		fn uncle_hashes(&self, _block_hash: &H256) -> Vec<H256> {
			Vec::new()
		}
	}

	fn chained(number: BlockNumber, parent: &Header) -> Header {
		let mut h = Header::new();
		h.set_number(number);
		h.set_parent_hash(parent.hash());
		h.set_time(U256::from(number * 100));
		h.set_difficulty(parent.difficulty());
		h.set_gas_limit(parent.gas_limit().max(5_000));
		h.set_version(HeaderVersion::Keccak256);
		h
	}

	#[test]
	fn empty_batch_returns_no_results() {
		let chain = FakeChain { config: ChainConfig::default(), by_hash: StdMutex::new(HashMap::new()) };
		let provider = MemoryCacheProvider::new();
		let parent = Header::new();
		let (results, _) = verify_headers(&[], &parent, &chain, &provider, &PowMode::fake(), false, 0);
		assert!(results.is_empty());
	}

	#[test]
	fn results_preserve_input_order_on_success() {
		let chain = FakeChain { config: ChainConfig::default(), by_hash: StdMutex::new(HashMap::new()) };
		let provider = MemoryCacheProvider::new();
		let mut genesis = Header::new();
		genesis.set_difficulty(U256::from(crate::difficulty::MINIMUM_DIFFICULTY));
		genesis.set_gas_limit(8_000_000);

		let mut headers = Vec::new();
		let mut prev = genesis.clone();
		for n in 1..=5u64 {
			let mut h = chained(n, &prev);
			h.set_difficulty(U256::from(crate::difficulty::MINIMUM_DIFFICULTY));
			h.set_gas_limit(8_000_000);
			headers.push(h.clone());
			prev = h;
		}

		let (results, _) = verify_headers(&headers, &genesis, &chain, &provider, &PowMode::fake(), false, 10_000);
		assert_eq!(results.len(), 5);
		for r in results {
			assert!(r.is_ok());
		}
	}

	#[test]
	fn a_broken_link_reports_unknown_ancestor_at_its_index() {
		let chain = FakeChain { config: ChainConfig::default(), by_hash: StdMutex::new(HashMap::new()) };
		let provider = MemoryCacheProvider::new();
		let genesis = Header::new();
		let h1 = chained(1, &genesis);
		let mut stray = Header::new();
		stray.set_number(2);
		stray.set_parent_hash(H256::repeat_byte(0xee));

		let (results, _) = verify_headers(&[h1, stray], &genesis, &chain, &provider, &PowMode::fake(), false, 10_000);
		assert!(results[0].is_ok());
		assert!(matches!(
			results[1],
			Err(Error(ErrorKind::Block(crate::error::BlockError::UnknownAncestor(_)), _))
		));
	}

	#[test]
	fn full_fake_mode_accepts_every_header_unconditionally() {
		let chain = FakeChain { config: ChainConfig::default(), by_hash: StdMutex::new(HashMap::new()) };
		let provider = MemoryCacheProvider::new();
		let genesis = Header::new();
		let mut broken = Header::new();
		broken.set_number(1);
		broken.set_parent_hash(H256::repeat_byte(0xee));
		broken.set_gas_used(u64::MAX);

		let (results, _) = verify_headers(&[broken], &genesis, &chain, &provider, &PowMode::full_fake(), true, 10_000);
		assert_eq!(results.len(), 1);
		assert!(results[0].is_ok());
	}

	#[test]
	fn cancel_is_observed_through_every_clone() {
		let handle = BatchHandle::new();
		let clone = handle.clone();
		clone.cancel();
		assert!(handle.is_cancelled());
	}
}
