//! The consensus engine façade: the single entry point a node wires into
//! its block-import pipeline. Every other module in this crate exists to
//! back one of this struct's methods.

use std::sync::Arc;

use ethash::EpochCacheProvider;
use ethereum_types::{Address, H256, U256};

use consensus_types::{Block, BlockNumber, ChainConfig, Header};

use crate::batch::{self, BatchHandle};
use crate::chain::{ChainReader, StateMutator};
use crate::difficulty::calculate_difficulty;
use crate::error::Error;
use crate::finalize::finalize_block;
use crate::header_validator::{self, ValidationContext};
use crate::seal::{self, PowMode};
use crate::uncles::verify_uncles as verify_uncles_impl;

/// A proof-of-work consensus engine covering both the Keccak-256 and
/// Argon2id seal families, switching between them at the chain's HF5
/// activation height.
pub struct ConsensusEngine {
	config: ChainConfig,
	mode: PowMode,
	cache_provider: Arc<dyn EpochCacheProvider>,
}

impl ConsensusEngine {
	pub fn new(config: ChainConfig, mode: PowMode, cache_provider: Arc<dyn EpochCacheProvider>) -> Self {
		ConsensusEngine { config, mode, cache_provider }
	}

	pub fn config(&self) -> &ChainConfig {
		&self.config
	}

	/// The address credited with a block's reward, were it accepted.
	pub fn author(&self, header: &Header) -> Address {
		*header.coinbase()
	}

	/// Full verification of a single header against its parent, optionally
	/// including the seal.
	///
	/// If `chain` already holds a header with the same hash, it is taken as
	/// proof this exact header was verified and imported before; verification
	/// short-circuits to success without re-running any check.
	pub fn verify_header(&self, header: &Header, parent: &Header, chain: &dyn ChainReader, now: u64, check_seal: bool) -> Result<(), Error> {
		let expected_version = self.config.block_version(header.number()).to_byte();
		if let Some(known) = chain.header(&header.hash_with_version(expected_version)) {
			if &known == header {
				return Ok(());
			}
		}

		let ctx = ValidationContext { config: &self.config, now, is_uncle: false };
		header_validator::verify_header(header, parent, &ctx)?;
		if check_seal {
			self.verify_seal(header)?;
		}
		Ok(())
	}

	/// Verify a contiguous run of headers concurrently, preserving input
	/// order in the returned results.
	pub fn verify_headers(
		&self,
		headers: &[Header],
		parent: &Header,
		chain: &dyn ChainReader,
		now: u64,
		check_seal: bool,
	) -> (Vec<Result<(), Error>>, BatchHandle) {
		batch::verify_headers(headers, parent, chain, self.cache_provider.as_ref(), &self.mode, check_seal, now)
	}

	/// Verify the uncles a block declares.
	pub fn verify_uncles(&self, block_header: &Header, uncles: &[Header], chain: &dyn ChainReader, now: u64) -> Result<(), Error> {
		verify_uncles_impl(block_header, uncles, chain, &self.mode, self.cache_provider.as_ref(), now)
	}

	/// Verify only a header's proof-of-work seal.
	pub fn verify_seal(&self, header: &Header) -> Result<(), Error> {
		seal::verify_seal(header, &self.mode, self.cache_provider.as_ref())
	}

	/// The difficulty a header extending `parent` must declare.
	pub fn calc_difficulty(&self, header_number: BlockNumber, header_time: u64, parent: &Header) -> U256 {
		calculate_difficulty(&self.config, header_number, header_time, parent.number(), parent.time().as_u64(), parent.difficulty(), parent.has_uncles())
	}

	/// Populate the fields of a new header a miner is about to seal:
	/// number, difficulty, and seal version.
	pub fn prepare(&self, header: &mut Header, parent: &Header) {
		header.set_number(parent.number() + 1);
		let difficulty = self.calc_difficulty(header.number(), header.time().as_u64(), parent);
		header.set_difficulty(difficulty);
		header.set_version(self.config.block_version(header.number()));
	}

	/// Credit mining rewards, assemble the finalized block around `txs` and
	/// `receipts`, and return it alongside the resulting state root.
	pub fn finalize<Tx, Receipt>(
		&self,
		header: &mut Header,
		uncles: &mut [Header],
		txs: Vec<Tx>,
		receipts: Vec<Receipt>,
		state: &mut dyn StateMutator,
	) -> (Block<Tx, Receipt>, H256) {
		finalize_block(&self.config, header, uncles, txs, receipts, state)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use consensus_types::HeaderVersion;
	use ethash::MemoryCacheProvider;
	use ethereum_types::H256;
	use std::collections::HashMap;
	use std::sync::Mutex;

	struct FakeChain {
		config: ChainConfig,
		by_hash: Mutex<HashMap<H256, Header>>,
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

	#[test]
	fn prepare_then_verify_round_trips() {
		let engine = ConsensusEngine::new(ChainConfig::default(), PowMode::fake(), Arc::new(MemoryCacheProvider::new()));
		let mut parent = Header::new();
		parent.set_number(0);
		parent.set_difficulty(U256::from(crate::difficulty::MINIMUM_DIFFICULTY));
		parent.set_gas_limit(8_000_000);
		parent.set_version(HeaderVersion::Keccak256);

		let mut header = Header::new();
		header.set_time(U256::from(parent.time().as_u64() + 100));
		header.set_gas_limit(8_000_000);
		engine.prepare(&mut header, &parent);

		let chain = FakeChain { config: ChainConfig::default(), by_hash: Mutex::new(HashMap::new()) };
		assert!(engine.verify_header(&header, &parent, &chain, 10_000, true).is_ok());
	}

	#[test]
	fn author_is_the_header_coinbase() {
		let engine = ConsensusEngine::new(ChainConfig::default(), PowMode::fake(), Arc::new(MemoryCacheProvider::new()));
		let mut header = Header::new();
		header.set_coinbase(Address::repeat_byte(0x5));
		assert_eq!(engine.author(&header), Address::repeat_byte(0x5));
	}

	#[test]
	fn a_known_header_short_circuits_verification() {
		let engine = ConsensusEngine::new(ChainConfig::default(), PowMode::fake(), Arc::new(MemoryCacheProvider::new()));
		let parent = Header::new();
		let mut header = Header::new();
		header.set_number(1);
		header.set_parent_hash(H256::repeat_byte(0xee));

		let expected_version = engine.config().block_version(header.number()).to_byte();
		let known_hash = header.hash_with_version(expected_version);
		let mut by_hash = HashMap::new();
		by_hash.insert(known_hash, header.clone());
		let chain = FakeChain { config: ChainConfig::default(), by_hash: Mutex::new(by_hash) };

		assert!(engine.verify_header(&header, &parent, &chain, 10_000, true).is_ok());
	}

	#[test]
	fn finalize_assembles_a_block_with_its_transactions() {
		struct FakeState;
		impl StateMutator for FakeState {
			fn add_balance(&mut self, _address: &Address, _amount: U256) {}
			fn intermediate_root(&mut self) -> H256 {
				H256::repeat_byte(0x7)
			}
		}

		let engine = ConsensusEngine::new(ChainConfig::default(), PowMode::fake(), Arc::new(MemoryCacheProvider::new()));
		let mut header = Header::new();
		header.set_number(1);
		let mut state = FakeState;

		let (block, root) = engine.finalize(&mut header, &mut [], vec!["tx"], vec![1u8], &mut state);
		assert_eq!(block.transactions, vec!["tx"]);
		assert_eq!(root, H256::repeat_byte(0x7));
	}
}
