//! Collaborator traits the engine calls out to. The engine itself never
//! stores chain state or account balances — it is handed a view onto both
//! by whatever embeds it.

use ethereum_types::{Address, H256, U256};

use consensus_types::{BlockNumber, ChainConfig, Header};

/// Read access to already-imported chain data, as much as header and uncle
/// validation ever need.
pub trait ChainReader: Send + Sync {
	/// The chain's fork schedule.
	fn config(&self) -> &ChainConfig;

	/// Look up a previously imported header by its hash.
	fn header(&self, hash: &H256) -> Option<Header>;

	/// Look up a previously imported header by number, following the
	/// canonical chain. Used to find `header`'s ancestors during uncle
	/// validation without walking hash-by-hash from an arbitrary tip.
	fn header_by_number(&self, number: BlockNumber) -> Option<Header>;

	/// The (version-adjusted) hashes of the uncles a previously imported
	/// block declared. Uncle validation needs this to keep a block from
	/// reusing an uncle one of its own ancestors already claimed, not just
	/// one that appears as an ancestor header itself.
	fn uncle_hashes(&self, block_hash: &H256) -> Vec<H256>;
}

/// Write access to account state, used only by the finalizer to credit
/// mining rewards.
pub trait StateMutator {
	/// Credit `amount` to `address`'s balance.
	fn add_balance(&mut self, address: &Address, amount: U256);

	/// Recompute and return the state root after all pending balance
	/// changes, to be written into the block's header by the caller.
	fn intermediate_root(&mut self) -> H256;
}
