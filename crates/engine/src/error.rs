//! Consensus error taxonomy, in the `error_chain`-generated shape the
//! surrounding node stack already expects: a `BlockError` enum carrying the
//! offending values, wrapped by a crate-wide `ErrorKind::Block` variant.

use ethereum_types::H256;
use unexpected::{Mismatch, OutOfBounds};

use consensus_types::BlockNumber;

error_chain::error_chain! {
	types {
		Error, ErrorKind, ResultExt, EngineResult;
	}

	errors {
		/// A header was rejected by a specific consensus rule.
		Block(err: BlockError) {
			description("block verification failed")
			display("block verification failed: {}", err)
		}
		/// A batch verification job was cancelled before it finished.
		Cancelled {
			description("verification job was cancelled")
			display("verification job was cancelled")
		}
	}
}

/// Reasons a header or block can be rejected by the consensus rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockError {
	/// No known block with the header's `parent_hash`.
	UnknownAncestor(H256),
	/// The header's number does not immediately follow its parent's.
	InvalidNumber(Mismatch<BlockNumber>),
	/// The header's timestamp is further in the future than tolerated.
	FutureBlock(Mismatch<u64>),
	/// An uncle's timestamp exceeds the representable maximum. In practice
	/// this can never trigger — the bound it checks is the type's own
	/// ceiling — but it is part of the historical rule set being preserved.
	LargeBlockTime(Mismatch<u64>),
	/// The header's timestamp does not exceed its parent's.
	ZeroBlockTime(Mismatch<u64>),
	/// The header's extra-data field exceeds the maximum allowed length.
	ExtraDataTooLong(OutOfBounds<usize>),
	/// The header's difficulty does not match the calculated value.
	InvalidDifficulty(Mismatch<ethereum_types::U256>),
	/// The header's gas limit falls outside the protocol bound.
	InvalidGasLimit(OutOfBounds<u64>),
	/// The header declares more gas used than its gas limit allows.
	InvalidGasUsed(OutOfBounds<u64>),
	/// A header declared an unset version byte.
	UnsetHeaderVersion,
	/// A block declares more uncles than the protocol allows.
	TooManyUncles(OutOfBounds<usize>),
	/// The same uncle hash appears more than once in a block.
	DuplicateUncle(H256),
	/// An uncle is also an ancestor of the block that includes it.
	UncleIsAncestor(H256),
	/// An uncle falls outside the window of generations eligible for
	/// inclusion, or cannot be traced back to a recent ancestor.
	DanglingUncle(H256),
	/// The seal's nonce does not land under the difficulty target.
	InvalidPoW,
	/// The seal's mix digest does not match the one the PoW function
	/// recomputed.
	InvalidMixDigest(Mismatch<H256>),
	/// The header's epoch is at or beyond the highest one the configured
	/// PoW mode will serve a cache for.
	NonceOutOfRange(OutOfBounds<u64>),
}

impl std::fmt::Display for BlockError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		use BlockError::*;
		match self {
			UnknownAncestor(hash) => write!(f, "unknown parent: {}", hash),
			InvalidNumber(mis) => write!(f, "invalid block number: {}", mis),
			FutureBlock(mis) => write!(f, "block timestamp is in the future: {}", mis),
			LargeBlockTime(mis) => write!(f, "block timestamp too far ahead of parent: {}", mis),
			ZeroBlockTime(mis) => write!(f, "block timestamp does not exceed parent's: {}", mis),
			ExtraDataTooLong(oob) => write!(f, "extra data too long: {}", oob),
			InvalidDifficulty(mis) => write!(f, "invalid difficulty: {}", mis),
			InvalidGasLimit(oob) => write!(f, "invalid gas limit: {}", oob),
			InvalidGasUsed(oob) => write!(f, "invalid gas used: {}", oob),
			UnsetHeaderVersion => write!(f, "header version byte is unset"),
			TooManyUncles(oob) => write!(f, "too many uncles: {}", oob),
			DuplicateUncle(hash) => write!(f, "duplicate uncle: {}", hash),
			UncleIsAncestor(hash) => write!(f, "uncle is an ancestor of the block: {}", hash),
			DanglingUncle(hash) => write!(f, "uncle is not a recognised ancestor's uncle: {}", hash),
			InvalidPoW => write!(f, "proof-of-work result exceeds the difficulty target"),
			InvalidMixDigest(mis) => write!(f, "mix digest mismatch: {}", mis),
			NonceOutOfRange(oob) => write!(f, "nonce out of allowed range: {}", oob),
		}
	}
}

impl std::error::Error for BlockError {}
