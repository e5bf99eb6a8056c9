//! Chain configuration: the read-only record that gates fork-dependent
//! consensus behaviour.

use crate::header::{BlockNumber, HeaderVersion};
use serde::{Deserialize, Serialize};

/// Index of a hard fork in activation order. `Hf5` also marks the seal
/// algorithm switch from Keccak-256 to Argon2id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Hardfork {
	Hf1,
	Hf2,
	Hf3,
	Hf5,
}

/// Read-only chain parameters. Deserializable from a chain-spec JSON file,
/// mirroring `ethjson::spec::Spec`/`CommonParams` in the teacher codebase —
/// loading that file is a caller concern; this crate only holds the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
	/// Homestead activation height.
	pub homestead_block: BlockNumber,
	/// EIP-158 (state-clearing) activation height.
	pub eip158_block: BlockNumber,
	/// HF1 activation height, if scheduled.
	pub hf1_block: Option<BlockNumber>,
	/// HF2 activation height, if scheduled.
	pub hf2_block: Option<BlockNumber>,
	/// HF3 activation height, if scheduled.
	pub hf3_block: Option<BlockNumber>,
	/// HF5 activation height, if scheduled. Also the Argon2id cut-over.
	pub hf5_block: Option<BlockNumber>,
}

impl ChainConfig {
	/// Whether `number` is at or after the given hardfork's activation
	/// height. A hardfork with no configured height never activates.
	pub fn is_hf(&self, fork: Hardfork, number: BlockNumber) -> bool {
		self.get_hf(fork).map_or(false, |height| number >= height)
	}

	/// The activation height of `fork`, if scheduled.
	pub fn get_hf(&self, fork: Hardfork) -> Option<BlockNumber> {
		match fork {
			Hardfork::Hf1 => self.hf1_block,
			Hardfork::Hf2 => self.hf2_block,
			Hardfork::Hf3 => self.hf3_block,
			Hardfork::Hf5 => self.hf5_block,
		}
	}

	/// Whether EIP-158 state clearing applies at `number`.
	pub fn is_eip158(&self, number: BlockNumber) -> bool {
		number >= self.eip158_block
	}

	/// The seal algorithm a header at `number` must use. HF5 is a PoW
	/// algorithm switch: blocks before it seal with Keccak-256, blocks at
	/// or after it seal with Argon2id.
	pub fn block_version(&self, number: BlockNumber) -> HeaderVersion {
		match self.hf5_block {
			Some(height) if number >= height => HeaderVersion::Argon2id,
			_ => HeaderVersion::Keccak256,
		}
	}
}

impl Default for ChainConfig {
	/// A permissive mainnet-shaped config with no forks scheduled beyond
	/// Homestead/EIP-158 at genesis. Intended for tests and as a starting
	/// point for a real deployment's chain spec.
	fn default() -> Self {
		ChainConfig {
			homestead_block: 0,
			eip158_block: 0,
			hf1_block: None,
			hf2_block: None,
			hf3_block: None,
			hf5_block: None,
		}
	}
}
