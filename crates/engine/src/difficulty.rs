//! Multi-era difficulty calculation.
//!
//! Each hard fork tightened the target-adjustment formula; the dispatch
//! below walks eras newest-first so a block past several forks picks up
//! the correct (latest-applicable) curve without re-deriving which forks
//! are active more than once.

use ethereum_types::U256;

use consensus_types::{BlockNumber, ChainConfig, Hardfork};

/// Floor below which difficulty never drops, regardless of era.
pub const MINIMUM_DIFFICULTY: u64 = 131_072;
/// `target = parent ± parent / DIFFICULTY_BOUND_DIVISOR` per adjustment step.
pub const DIFFICULTY_BOUND_DIVISOR: u64 = 2_048;
/// Block-time target used by the pre-Homestead linear adjustment, in seconds.
pub const FRONTIER_DURATION_LIMIT: u64 = 13;
/// Bomb period: difficulty gains `2^(period-2)` extra once `period > 1`.
pub const EXP_DIFF_PERIOD: u64 = 100_000;
/// Difficulty assigned to the first block sealed under HF5's PoW family.
/// The new seal algorithm has no relationship to the old difficulty scale,
/// so continuing the Keccak-256-era curve into it would be meaningless;
/// the chain restarts retargeting from a fixed floor instead.
pub const HF5_RESET_DIFFICULTY: u64 = MINIMUM_DIFFICULTY;

/// Calculate the difficulty `header_number` must declare, given its
/// timestamp and its parent's timestamp/difficulty/uncle status.
pub fn calculate_difficulty(
	config: &ChainConfig,
	header_number: BlockNumber,
	header_time: u64,
	parent_number: BlockNumber,
	parent_time: u64,
	parent_difficulty: U256,
	parent_has_uncles: bool,
) -> U256 {
	assert!(header_number > 0, "difficulty is only calculated for non-genesis headers");

	let min_difficulty = U256::from(MINIMUM_DIFFICULTY);
	let bound_divisor = U256::from(DIFFICULTY_BOUND_DIVISOR);

	if config.is_hf(Hardfork::Hf5, header_number) && !config.is_hf(Hardfork::Hf5, parent_number) {
		return U256::from(HF5_RESET_DIFFICULTY);
	}

	if config.is_hf(Hardfork::Hf5, header_number) {
		return hf5_difficulty(header_time, parent_time, parent_difficulty, parent_has_uncles, min_difficulty, bound_divisor);
	}
	if config.is_hf(Hardfork::Hf3, header_number) {
		return bomb(
			header_number,
			metropolis_difficulty(header_time, parent_time, parent_difficulty, parent_has_uncles, min_difficulty, bound_divisor),
			min_difficulty,
		);
	}
	if config.is_hf(Hardfork::Hf2, header_number) {
		return bomb(
			header_number,
			metropolis_difficulty(header_time, parent_time, parent_difficulty, parent_has_uncles, min_difficulty, bound_divisor),
			min_difficulty,
		);
	}
	if config.is_hf(Hardfork::Hf1, header_number) {
		return bomb(
			header_number,
			homestead_difficulty(header_time, parent_time, parent_difficulty, min_difficulty, bound_divisor),
			min_difficulty,
		);
	}
	if header_number >= config.homestead_block {
		return bomb(
			header_number,
			homestead_difficulty(header_time, parent_time, parent_difficulty, min_difficulty, bound_divisor),
			min_difficulty,
		);
	}

	bomb(header_number, frontier_difficulty(header_time, parent_time, parent_difficulty, min_difficulty, bound_divisor), min_difficulty)
}

/// Pre-Homestead: a flat increment or decrement keyed only on whether the
/// block landed inside the target duration.
fn frontier_difficulty(header_time: u64, parent_time: u64, parent_difficulty: U256, min_difficulty: U256, bound_divisor: U256) -> U256 {
	let step = parent_difficulty / bound_divisor;
	let target = if header_time >= parent_time + FRONTIER_DURATION_LIMIT {
		parent_difficulty.saturating_sub(step)
	} else {
		parent_difficulty + step
	};
	target.max(min_difficulty)
}

/// Homestead: adjustment scales with how far the block missed a 10-second
/// target, clamped to a swing of at most 99 steps either way.
fn homestead_difficulty(header_time: u64, parent_time: u64, parent_difficulty: U256, min_difficulty: U256, bound_divisor: U256) -> U256 {
	let elapsed = header_time.saturating_sub(parent_time);
	let swing = 1i64 - (elapsed / 10) as i64;
	let swing = swing.max(-99);
	apply_swing(parent_difficulty, bound_divisor, swing, min_difficulty)
}

/// HF1 onward (EIP-100b-style): uncles count toward the target block time,
/// so a parent with uncles gets a stricter threshold before difficulty
/// starts dropping.
fn metropolis_difficulty(
	header_time: u64,
	parent_time: u64,
	parent_difficulty: U256,
	parent_has_uncles: bool,
	min_difficulty: U256,
	bound_divisor: U256,
) -> U256 {
	let elapsed = header_time.saturating_sub(parent_time);
	let threshold = if parent_has_uncles { 2 } else { 1 };
	let swing = threshold - (elapsed / 9) as i64;
	let swing = swing.max(-99);
	apply_swing(parent_difficulty, bound_divisor, swing, min_difficulty)
}

/// HF5: the Argon2id era drops the uncle-aware threshold in favour of a
/// flat target, since reward sharing with uncles no longer skews block
/// timing the same way under the new seal.
fn hf5_difficulty(
	header_time: u64,
	parent_time: u64,
	parent_difficulty: U256,
	_parent_has_uncles: bool,
	min_difficulty: U256,
	bound_divisor: U256,
) -> U256 {
	let elapsed = header_time.saturating_sub(parent_time);
	let swing = 1i64 - (elapsed / 10) as i64;
	let swing = swing.max(-99);
	apply_swing(parent_difficulty, bound_divisor, swing, min_difficulty)
}

fn apply_swing(parent_difficulty: U256, bound_divisor: U256, swing: i64, min_difficulty: U256) -> U256 {
	let step = parent_difficulty / bound_divisor;
	let target = if swing >= 0 {
		parent_difficulty + step * U256::from(swing as u64)
	} else {
		parent_difficulty.saturating_sub(step * U256::from((-swing) as u64))
	};
	target.max(min_difficulty)
}

/// The difficulty bomb: every `EXP_DIFF_PERIOD` blocks past period 1 adds
/// `2^(period-2)` on top of the era's target-adjustment curve.
fn bomb(header_number: BlockNumber, target: U256, min_difficulty: U256) -> U256 {
	let period = (header_number / EXP_DIFF_PERIOD) as u32;
	if period > 1 {
		(target + (U256::from(1) << (period - 2))).max(min_difficulty)
	} else {
		target
	}
}
