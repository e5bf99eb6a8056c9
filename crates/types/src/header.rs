//! Block header.

use ethereum_types::{Address, H256, U256};
use keccak_hash::keccak;
use rlp::RlpStream;

/// Height of a block in the chain.
pub type BlockNumber = u64;

/// Maximum permitted length of the header's `extra` field, in bytes.
pub const MAX_EXTRA_DATA_SIZE: usize = 32;

/// Keccak-256 of the RLP encoding of an empty list (`0xc0`) — the
/// `uncles_hash` a header with no uncles must declare.
pub fn empty_uncles_hash() -> H256 {
	keccak(&[0xc0u8][..])
}

/// Selects the seal algorithm family a header was sealed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HeaderVersion {
	/// No version has been assigned yet; must never reach seal verification.
	Unset,
	/// Ethash-lineage Keccak-256 hashimoto.
	Keccak256,
	/// Argon2id memory-hard seal.
	Argon2id,
}

impl HeaderVersion {
	/// Decode the single-byte wire representation.
	pub fn from_byte(b: u8) -> Self {
		match b {
			1 => HeaderVersion::Keccak256,
			2 => HeaderVersion::Argon2id,
			_ => HeaderVersion::Unset,
		}
	}

	/// Encode back to the single-byte wire representation.
	pub fn to_byte(self) -> u8 {
		match self {
			HeaderVersion::Unset => 0,
			HeaderVersion::Keccak256 => 1,
			HeaderVersion::Argon2id => 2,
		}
	}
}

/// Semantic flag for whether the seal fields are included in an encoding.
#[derive(Debug, Clone, Copy)]
enum Seal {
	With,
	Without,
}

/// A block header.
///
/// Carries only the fields the consensus engine reasons about. Transaction
/// and state roots are deliberately absent: the engine never touches them.
#[derive(Debug, Clone, Eq)]
pub struct Header {
	parent_hash: H256,
	number: BlockNumber,
	time: U256,
	difficulty: U256,
	gas_limit: u64,
	gas_used: u64,
	extra: Vec<u8>,
	coinbase: Address,
	mix_digest: H256,
	nonce: u64,
	version: u8,
	/// Keccak-256 of the RLP-encoded uncle list this header commits to.
	/// Needed by the difficulty calculator, which factors in whether the
	/// parent included any uncles.
	uncles_hash: H256,

	/// Memoized hash of the header including seal and version.
	hash: Option<H256>,
}

impl PartialEq for Header {
	fn eq(&self, other: &Self) -> bool {
		self.parent_hash == other.parent_hash
			&& self.number == other.number
			&& self.time == other.time
			&& self.difficulty == other.difficulty
			&& self.gas_limit == other.gas_limit
			&& self.gas_used == other.gas_used
			&& self.extra == other.extra
			&& self.coinbase == other.coinbase
			&& self.mix_digest == other.mix_digest
			&& self.nonce == other.nonce
			&& self.version == other.version
			&& self.uncles_hash == other.uncles_hash
	}
}

impl Default for Header {
	fn default() -> Self {
		Header {
			parent_hash: H256::zero(),
			number: 0,
			time: U256::zero(),
			difficulty: U256::zero(),
			gas_limit: 0,
			gas_used: 0,
			extra: Vec::new(),
			coinbase: Address::zero(),
			mix_digest: H256::zero(),
			nonce: 0,
			version: 0,
			uncles_hash: empty_uncles_hash(),
			hash: None,
		}
	}
}

/// Alter a field, invalidating the memoized hash if the new value differs.
fn change_field<T: PartialEq>(hash: &mut Option<H256>, field: &mut T, value: T) {
	if *field != value {
		*field = value;
		*hash = None;
	}
}

impl Header {
	/// A new, default-valued header.
	pub fn new() -> Self {
		Self::default()
	}

	pub fn parent_hash(&self) -> &H256 {
		&self.parent_hash
	}
	pub fn number(&self) -> BlockNumber {
		self.number
	}
	pub fn time(&self) -> U256 {
		self.time
	}
	pub fn difficulty(&self) -> U256 {
		self.difficulty
	}
	pub fn gas_limit(&self) -> u64 {
		self.gas_limit
	}
	pub fn gas_used(&self) -> u64 {
		self.gas_used
	}
	pub fn extra(&self) -> &[u8] {
		&self.extra
	}
	pub fn coinbase(&self) -> &Address {
		&self.coinbase
	}
	pub fn mix_digest(&self) -> &H256 {
		&self.mix_digest
	}
	pub fn nonce(&self) -> u64 {
		self.nonce
	}
	pub fn version(&self) -> HeaderVersion {
		HeaderVersion::from_byte(self.version)
	}
	pub fn uncles_hash(&self) -> &H256 {
		&self.uncles_hash
	}
	/// Whether this header commits to a non-empty uncle list.
	pub fn has_uncles(&self) -> bool {
		self.uncles_hash != empty_uncles_hash()
	}

	pub fn set_parent_hash(&mut self, v: H256) {
		change_field(&mut self.hash, &mut self.parent_hash, v);
	}
	pub fn set_number(&mut self, v: BlockNumber) {
		change_field(&mut self.hash, &mut self.number, v);
	}
	pub fn set_time(&mut self, v: U256) {
		change_field(&mut self.hash, &mut self.time, v);
	}
	pub fn set_difficulty(&mut self, v: U256) {
		change_field(&mut self.hash, &mut self.difficulty, v);
	}
	pub fn set_gas_limit(&mut self, v: u64) {
		change_field(&mut self.hash, &mut self.gas_limit, v);
	}
	pub fn set_gas_used(&mut self, v: u64) {
		change_field(&mut self.hash, &mut self.gas_used, v);
	}
	pub fn set_extra(&mut self, v: Vec<u8>) {
		change_field(&mut self.hash, &mut self.extra, v);
	}
	pub fn set_coinbase(&mut self, v: Address) {
		change_field(&mut self.hash, &mut self.coinbase, v);
	}
	pub fn set_mix_digest(&mut self, v: H256) {
		change_field(&mut self.hash, &mut self.mix_digest, v);
	}
	pub fn set_nonce(&mut self, v: u64) {
		change_field(&mut self.hash, &mut self.nonce, v);
	}
	pub fn set_uncles_hash(&mut self, v: H256) {
		change_field(&mut self.hash, &mut self.uncles_hash, v);
	}

	/// Set the seal version. Idempotent: setting the same version twice in a
	/// row does not recompute the memoized hash.
	pub fn set_version(&mut self, v: HeaderVersion) {
		change_field(&mut self.hash, &mut self.version, v.to_byte());
	}

	/// Hash of the header including the seal and the version byte, memoized.
	pub fn hash(&self) -> H256 {
		self.hash.unwrap_or_else(|| self.compute_hash(Seal::With, None))
	}

	/// Recompute and memoize the hash.
	pub fn rehash(&mut self) -> H256 {
		let h = self.compute_hash(Seal::With, None);
		self.hash = Some(h);
		h
	}

	/// Hash of the header excluding `mix_digest`/`nonce` but including the
	/// version byte — the PoW challenge fed to the seal verifier.
	pub fn hash_no_nonce(&self) -> H256 {
		self.compute_hash(Seal::Without, None)
	}

	/// The hash this header would have if its version were `version`,
	/// without mutating the header. Used by the batch verifier's
	/// known-header short-circuit, which looks a header up by the hash it
	/// would take on once the chain's configured version is applied.
	pub fn hash_with_version(&self, version: u8) -> H256 {
		self.compute_hash(Seal::With, Some(version))
	}

	fn compute_hash(&self, with_seal: Seal, version_override: Option<u8>) -> H256 {
		let mut s = RlpStream::new();
		let version = version_override.unwrap_or(self.version);
		match with_seal {
			Seal::With => s.begin_list(10),
			Seal::Without => s.begin_list(8),
		};
		s.append(&self.parent_hash);
		s.append(&self.uncles_hash);
		s.append(&self.coinbase);
		s.append(&self.difficulty);
		s.append(&self.number);
		s.append(&self.gas_limit);
		s.append(&self.gas_used);
		s.append(&self.time);
		s.append(&self.extra);
		s.append(&version);
		if let Seal::With = with_seal {
			s.append(&self.mix_digest);
			s.append(&self.nonce);
		}
		keccak(s.out())
	}
}
