//! Block finalization: crediting mining rewards once a block's
//! transactions have executed, and writing the resulting state root.

use ethereum_types::{H256, U256};

use consensus_types::{Block, BlockNumber, ChainConfig, Header};

use crate::chain::StateMutator;

/// Reward paid to the miner of a block with no uncles, before any uncle
/// bonus.
pub fn block_reward() -> U256 {
	U256::from(10).pow(U256::from(18))
}

/// Height at which the total money supply is considered exhausted and no
/// further rewards are minted. `BlockNumber::MAX` in practice until a
/// chain actually schedules a cutover.
pub fn max_money_height(config: &ChainConfig) -> BlockNumber {
	config.hf5_block.map(|h| h.saturating_add(u64::MAX / 2)).unwrap_or(u64::MAX)
}

/// Credit `header`'s miner (and each uncle's miner) with their share of the
/// block reward, then assemble the finalized block around `txs` and
/// `receipts`, alongside the resulting state root.
///
/// `header` and `uncles` have their version byte set to `config`'s
/// current version before any hashing happens downstream, since a
/// finalized block's hash must reflect the seal family it was actually
/// mined under.
pub fn finalize_block<Tx, Receipt>(
	config: &ChainConfig,
	header: &mut Header,
	uncles: &mut [Header],
	txs: Vec<Tx>,
	receipts: Vec<Receipt>,
	state: &mut dyn StateMutator,
) -> (Block<Tx, Receipt>, H256) {
	let version = config.block_version(header.number());
	header.set_version(version);
	for uncle in uncles.iter_mut() {
		uncle.set_version(version);
	}

	if header.number() < max_money_height(config) {
		let reward = block_reward();
		let mut miner_reward = reward;

		for uncle in uncles.iter() {
			let uncle_reward = uncle_reward(reward, header.number(), uncle.number());
			state.add_balance(uncle.coinbase(), uncle_reward);
			miner_reward += reward / U256::from(32);
		}

		state.add_balance(header.coinbase(), miner_reward);
	}

	let root = state.intermediate_root();
	let block = Block::new(header.clone(), txs, uncles.to_vec(), receipts);
	(block, root)
}

/// `R * (uncle.number + 8 - block.number) / 8`, the fraction of the base
/// reward an uncle's own miner receives, scaled by how recent the uncle is.
fn uncle_reward(reward: U256, block_number: BlockNumber, uncle_number: BlockNumber) -> U256 {
	let numerator = U256::from(uncle_number + 8).saturating_sub(U256::from(block_number));
	reward * numerator / U256::from(8)
}
