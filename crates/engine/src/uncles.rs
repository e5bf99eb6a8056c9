//! Uncle (ommer) validation.
//!
//! A handful of historical blocks were mined and accepted before today's
//! stricter uncle rules existed; rejecting them retroactively would split
//! the historical chain. The `LEGACY_*` hash sets below name exactly those
//! blocks so the modern rules can stay strict everywhere else.

use std::collections::{HashMap, HashSet};

use ethereum_types::H256;

use consensus_types::{ChainConfig, Hardfork, Header};

use crate::chain::ChainReader;
use crate::error::{BlockError, Error, ErrorKind};
use crate::header_validator::{self, ValidationContext};
use crate::seal::{self, PowMode};

/// Uncles a block may declare before HF5.
pub const MAX_UNCLES: usize = 2;
/// Uncles a block may declare from HF5 onward — halved alongside the seal
/// family switch, since the new PoW's intended block time leaves less room
/// for honest forks to occur.
pub const MAX_UNCLES_POST_HF5: usize = 1;
/// An uncle more than this many generations removed from the block that
/// includes it can no longer be considered a recent fork of the same
/// chain; it is rejected as dangling.
pub const UNCLE_GENERATION_LIMIT: u64 = 7;

lazy_static::lazy_static! {
	/// Uncle hashes grandfathered past the duplicate-uncle check: early
	/// miners occasionally resubmitted the same uncle across sibling
	/// blocks before clients agreed on de-duplication.
	static ref LEGACY_DUPLICATE_UNCLE_EXEMPTIONS: HashSet<H256> = [
		"496ece6b92d11b7ab75af813e0617ea207ee841064fe75c2667cf99caf15270c",
		"64dea6ce587eb07f28db0c871f67dae9778a4227418d67372c32e9c9403b17a3",
		"0f8b1fd13cc5c070c3ddfcf364609e6e89b38c370fbf56323aaf4cce5cb04d16",
		"b2d505c33433392cb80dc81f83ee3250bb1d85691edac91ac67aa60221d6b59e",
	]
	.iter()
	.map(|s| s.parse().expect("well-formed legacy hash constant"))
	.collect();

	/// Uncle hashes grandfathered past the ancestor-uncle check: these
	/// blocks named an uncle that was later discovered to sit on their own
	/// ancestor chain.
	static ref LEGACY_ANCESTOR_UNCLE_EXEMPTIONS: HashSet<H256> = [
		"7dc3196e5bd44e62ccbd05bed50c7b1aa1961ea90f303db530a542282bdbe9c3",
	]
	.iter()
	.map(|s| s.parse().expect("well-formed legacy hash constant"))
	.collect();

	/// Uncle *parent* hashes grandfathered past the dangling-uncle check.
	/// When a dangling uncle's parent hash matches one of these, the
	/// entire `verify_uncles` call succeeds immediately, reproducing a
	/// historical client quirk where one grandfathered uncle accidentally
	/// bypassed every other check run for the same block.
	static ref LEGACY_DANGLING_UNCLE_EXEMPTIONS: HashSet<H256> = [
		"c897a0f3c70f751fb01d7419ac64ea8982a0e4d03892065f0b8ca5d510b8342a",
		"44080dc8c39d355850ae05aed18715427935bb25edb903ad9b74396bc98e87de",
	]
	.iter()
	.map(|s| s.parse().expect("well-formed legacy hash constant"))
	.collect();
}

fn max_uncles(config: &ChainConfig, number: u64) -> usize {
	if config.is_hf(Hardfork::Hf5, number) {
		MAX_UNCLES_POST_HF5
	} else {
		MAX_UNCLES
	}
}

/// Validate `uncles` as declared by `block_header`, using `chain` to walk
/// back through already-imported ancestors. Each accepted uncle also has
/// its header fully re-verified (including its seal) against the ancestor
/// it claims as parent.
pub fn verify_uncles(
	block_header: &Header,
	uncles: &[Header],
	chain: &dyn ChainReader,
	mode: &PowMode,
	pow_provider: &dyn ethash::EpochCacheProvider,
	now: u64,
) -> Result<(), Error> {
	let config = chain.config();

	if uncles.len() > MAX_UNCLES {
		log::debug!("rejected block #{}: {} uncles exceeds absolute cap {}", block_header.number(), uncles.len(), MAX_UNCLES);
		return Err(too_many_uncles(MAX_UNCLES, uncles.len()));
	}
	let max = max_uncles(config, block_header.number());
	if uncles.len() > max {
		log::debug!("rejected block #{}: {} uncles exceeds cap {}", block_header.number(), uncles.len(), max);
		return Err(too_many_uncles(max, uncles.len()));
	}

	let (ancestors, mut uncles_seen) = build_ancestor_window(block_header, chain);

	for uncle in uncles {
		let hash = uncle.hash();

		if LEGACY_DUPLICATE_UNCLE_EXEMPTIONS.contains(&hash) {
			log::warn!("uncle {} reused a hash grandfathered past the duplicate-uncle check", hash);
		} else if uncles_seen.contains(&hash) {
			log::debug!("rejected uncle {} for block #{}: duplicate", hash, block_header.number());
			return Err(ErrorKind::Block(BlockError::DuplicateUncle(hash)).into());
		}
		uncles_seen.insert(hash);

		if ancestors.contains_key(&hash) {
			if LEGACY_ANCESTOR_UNCLE_EXEMPTIONS.contains(&hash) {
				log::warn!("uncle {} reused a hash grandfathered past the ancestor-uncle check", hash);
			} else {
				log::debug!("rejected uncle {} for block #{}: is an ancestor", hash, block_header.number());
				return Err(ErrorKind::Block(BlockError::UncleIsAncestor(hash)).into());
			}
		}

		let uncle_parent = *uncle.parent_hash();
		let known_parent = ancestors.get(&uncle_parent);
		if known_parent.is_none() || &uncle_parent == block_header.parent_hash() {
			if LEGACY_DANGLING_UNCLE_EXEMPTIONS.contains(&uncle_parent) {
				log::warn!(
					"uncle {} parented by {}, grandfathered past the dangling-uncle check for block #{}",
					hash,
					uncle_parent,
					block_header.number()
				);
				return Ok(());
			}
			log::debug!("rejected uncle {} for block #{}: dangling", hash, block_header.number());
			return Err(ErrorKind::Block(BlockError::DanglingUncle(hash)).into());
		}

		let uncle_parent_header = known_parent.expect("checked above");
		let ctx = ValidationContext { config, now, is_uncle: true };
		header_validator::verify_header(uncle, uncle_parent_header, &ctx)?;
		seal::verify_seal(uncle, mode, pow_provider)?;
	}

	Ok(())
}

fn too_many_uncles(max: usize, found: usize) -> Error {
	ErrorKind::Block(BlockError::TooManyUncles(unexpected::OutOfBounds { min: None, max: Some(max), found })).into()
}

/// Walk back at most [`UNCLE_GENERATION_LIMIT`] generations from `block_header`'s
/// parent, collecting every visited header (keyed by its own hash) and every
/// hash that has already been claimed as an uncle by one of them.
/// `block_header` itself is inserted into both collections, which blocks a
/// block from naming itself as its own uncle.
fn build_ancestor_window(block_header: &Header, chain: &dyn ChainReader) -> (HashMap<H256, Header>, HashSet<H256>) {
	let mut ancestors = HashMap::new();
	let mut uncles_seen = HashSet::new();

	ancestors.insert(block_header.hash(), block_header.clone());
	uncles_seen.insert(block_header.hash());

	let mut cursor = chain.header(block_header.parent_hash());
	let mut generation = 0;
	while let Some(ancestor) = cursor {
		let ancestor_hash = ancestor.hash();
		for u in chain.uncle_hashes(&ancestor_hash) {
			uncles_seen.insert(u);
		}
		let next_parent = *ancestor.parent_hash();
		ancestors.insert(ancestor_hash, ancestor);

		generation += 1;
		if generation >= UNCLE_GENERATION_LIMIT {
			break;
		}
		cursor = chain.header(&next_parent);
	}

	(ancestors, uncles_seen)
}

#[cfg(test)]
mod tests {
	use super::*;
	use consensus_types::{BlockNumber, HeaderVersion};
	use ethash::MemoryCacheProvider;
	use ethereum_types::U256;
	use std::collections::HashMap as StdHashMap;
	use std::sync::Mutex;

	struct FakeChain {
		config: ChainConfig,
		by_hash: Mutex<StdHashMap<H256, Header>>,
		uncles_by_hash: Mutex<StdHashMap<H256, Vec<H256>>>,
	}

	impl FakeChain {
		fn new() -> Self {
			FakeChain { config: ChainConfig::default(), by_hash: Mutex::new(StdHashMap::new()), uncles_by_hash: Mutex::new(StdHashMap::new()) }
		}

		fn insert(&self, header: Header) {
			self.by_hash.lock().unwrap().insert(header.hash(), header);
		}

		fn insert_with_uncles(&self, header: Header, uncles: Vec<H256>) {
			self.uncles_by_hash.lock().unwrap().insert(header.hash(), uncles);
			self.insert(header);
		}
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
		fn uncle_hashes(&self, block_hash: &H256) -> Vec<H256> {
			self.uncles_by_hash.lock().unwrap().get(block_hash).cloned().unwrap_or_default()
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

	fn base_headers() -> (FakeChain, Header, Header) {
		let chain = FakeChain::new();
		let mut genesis = Header::new();
		genesis.set_difficulty(U256::from(crate::difficulty::MINIMUM_DIFFICULTY));
		genesis.set_gas_limit(8_000_000);
		genesis.set_version(HeaderVersion::Keccak256);
		chain.insert(genesis.clone());
		let mut p1 = chained(1, &genesis);
		p1.set_difficulty(U256::from(crate::difficulty::MINIMUM_DIFFICULTY));
		chain.insert(p1.clone());
		(chain, genesis, p1)
	}

	#[test]
	fn accepts_an_uncle_within_the_generation_window() {
		let (chain, genesis, p1) = base_headers();
		let provider = MemoryCacheProvider::new();
		let mut uncle = chained(1, &genesis);
		uncle.set_difficulty(U256::from(crate::difficulty::MINIMUM_DIFFICULTY));
		uncle.set_extra(vec![1]);
		let block = chained(2, &p1);
		let result = verify_uncles(&block, &[uncle], &chain, &PowMode::fake(), &provider, 100_000);
		assert!(result.is_ok());
	}

	#[test]
	fn rejects_too_many_uncles() {
		let (chain, genesis, p1) = base_headers();
		let provider = MemoryCacheProvider::new();
		let block = chained(2, &p1);
		let mut u1 = chained(1, &genesis);
		u1.set_difficulty(U256::from(crate::difficulty::MINIMUM_DIFFICULTY));
		u1.set_extra(vec![1]);
		let mut u2 = chained(1, &genesis);
		u2.set_difficulty(U256::from(crate::difficulty::MINIMUM_DIFFICULTY));
		u2.set_extra(vec![2]);
		let mut u3 = chained(1, &genesis);
		u3.set_difficulty(U256::from(crate::difficulty::MINIMUM_DIFFICULTY));
		u3.set_extra(vec![3]);
		let result = verify_uncles(&block, &[u1, u2, u3], &chain, &PowMode::fake(), &provider, 100_000);
		assert!(matches!(result, Err(Error(ErrorKind::Block(BlockError::TooManyUncles(_)), _))));
	}

	#[test]
	fn rejects_a_duplicate_uncle() {
		let (chain, genesis, p1) = base_headers();
		let provider = MemoryCacheProvider::new();
		let block = chained(2, &p1);
		let mut uncle = chained(1, &genesis);
		uncle.set_difficulty(U256::from(crate::difficulty::MINIMUM_DIFFICULTY));
		uncle.set_extra(vec![9]);
		let result = verify_uncles(&block, &[uncle.clone(), uncle], &chain, &PowMode::fake(), &provider, 100_000);
		assert!(matches!(result, Err(Error(ErrorKind::Block(BlockError::DuplicateUncle(_)), _))));
	}

	#[test]
	fn rejects_an_uncle_already_claimed_by_an_ancestor() {
		let (chain, genesis, p1) = base_headers();
		let provider = MemoryCacheProvider::new();
		let mut uncle = chained(1, &genesis);
		uncle.set_difficulty(U256::from(crate::difficulty::MINIMUM_DIFFICULTY));
		uncle.set_extra(vec![1]);
		let mut p2 = chained(2, &p1);
		p2.set_difficulty(U256::from(crate::difficulty::MINIMUM_DIFFICULTY));
		chain.insert_with_uncles(p2.clone(), vec![uncle.hash()]);
		let block = chained(3, &p2);
		let result = verify_uncles(&block, &[uncle], &chain, &PowMode::fake(), &provider, 100_000);
		assert!(matches!(result, Err(Error(ErrorKind::Block(BlockError::DuplicateUncle(_)), _))));
	}

	#[test]
	fn rejects_an_uncle_that_is_an_ancestor() {
		let (chain, _genesis, p1) = base_headers();
		let provider = MemoryCacheProvider::new();
		let block = chained(2, &p1);
		let result = verify_uncles(&block, &[p1], &chain, &PowMode::fake(), &provider, 100_000);
		assert!(matches!(result, Err(Error(ErrorKind::Block(BlockError::UncleIsAncestor(_)), _))));
	}

	#[test]
	fn rejects_a_dangling_uncle_with_no_known_parent() {
		let (chain, _genesis, p1) = base_headers();
		let provider = MemoryCacheProvider::new();
		let block = chained(2, &p1);
		let mut orphan = Header::new();
		orphan.set_number(1);
		orphan.set_parent_hash(H256::repeat_byte(0xaa));
		let result = verify_uncles(&block, &[orphan], &chain, &PowMode::fake(), &provider, 100_000);
		assert!(matches!(result, Err(Error(ErrorKind::Block(BlockError::DanglingUncle(_)), _))));
	}

	#[test]
	fn a_legacy_dangling_exemption_accepts_the_whole_uncle_set() {
		let (chain, _genesis, p1) = base_headers();
		let provider = MemoryCacheProvider::new();
		let block = chained(2, &p1);
		let exempt_parent: H256 = "c897a0f3c70f751fb01d7419ac64ea8982a0e4d03892065f0b8ca5d510b8342a".parse().unwrap();
		let mut dangling = Header::new();
		dangling.set_number(1);
		dangling.set_parent_hash(exempt_parent);
		let result = verify_uncles(&block, &[dangling], &chain, &PowMode::fake(), &provider, 100_000);
		assert!(result.is_ok());
	}
}
