//! Stateless header verification: the checks that depend only on a header
//! and its already-verified parent, run before a header's seal is trusted
//! enough to extend the chain.

use ethereum_types::U256;
use unexpected::{Mismatch, OutOfBounds};

use consensus_types::{ChainConfig, Header, MAX_EXTRA_DATA_SIZE};

use crate::difficulty::calculate_difficulty;
use crate::error::{BlockError, Error, ErrorKind};

/// How far into the future (seconds) a non-uncle block's timestamp may sit
/// relative to the verifier's clock before it is rejected outright.
pub const ALLOWED_FUTURE_TIME: u64 = 15;
/// Hard ceiling on gas limit, independent of the parent-relative bound.
pub const GAS_LIMIT_CAP: u64 = i64::MAX as u64;
/// Minimum a block's gas limit may ever be configured to.
pub const MIN_GAS_LIMIT: u64 = 5_000;
/// Parent-relative gas limit may move by at most `parent / GAS_LIMIT_BOUND_DIVISOR`.
pub const GAS_LIMIT_BOUND_DIVISOR: u64 = 1_024;

/// What the verifier needs to know about the header's place in the chain
/// beyond the header and parent themselves.
pub struct ValidationContext<'a> {
	pub config: &'a ChainConfig,
	/// Verifier's current wall-clock time, for the future-block check.
	pub now: u64,
	/// Whether `header` is being validated as an uncle. Uncles skip the
	/// future-block check entirely (they can legitimately reach the
	/// verifier well after being mined) in favour of a bound so wide it
	/// never actually rejects anything, preserved for the error taxonomy.
	pub is_uncle: bool,
}

/// Run every stateless check against `header` given its `parent`. Seal
/// verification is the caller's responsibility — this only validates the
/// fields a seal check would otherwise take on faith.
pub fn verify_header(header: &Header, parent: &Header, ctx: &ValidationContext) -> Result<(), Error> {
	let result = verify_extra_data(header)
		.and_then(|_| verify_timestamp(header, parent, ctx))
		.and_then(|_| verify_difficulty(header, parent, ctx))
		.and_then(|_| verify_gas(header, parent))
		.and_then(|_| verify_number(header, parent));

	if let Err(ref err) = result {
		log::debug!("rejected header #{}: {}", header.number(), err);
	}
	result
}

fn verify_extra_data(header: &Header) -> Result<(), Error> {
	if header.extra().len() > MAX_EXTRA_DATA_SIZE {
		return Err(ErrorKind::Block(BlockError::ExtraDataTooLong(OutOfBounds {
			min: None,
			max: Some(MAX_EXTRA_DATA_SIZE),
			found: header.extra().len(),
		}))
		.into());
	}
	Ok(())
}

fn verify_timestamp(header: &Header, parent: &Header, ctx: &ValidationContext) -> Result<(), Error> {
	let header_time = header.time();
	let parent_time = parent.time();

	if ctx.is_uncle {
		if header_time > U256::max_value() {
			return Err(ErrorKind::Block(BlockError::LargeBlockTime(Mismatch {
				expected: U256::max_value().as_u64(),
				found: header_time.as_u64(),
			}))
			.into());
		}
	} else {
		let limit = U256::from(ctx.now + ALLOWED_FUTURE_TIME);
		if header_time > limit {
			return Err(ErrorKind::Block(BlockError::FutureBlock(Mismatch {
				expected: limit.as_u64(),
				found: header_time.as_u64(),
			}))
			.into());
		}
	}

	if header_time <= parent_time {
		return Err(ErrorKind::Block(BlockError::ZeroBlockTime(Mismatch {
			expected: parent_time.as_u64() + 1,
			found: header_time.as_u64(),
		}))
		.into());
	}

	Ok(())
}

fn verify_difficulty(header: &Header, parent: &Header, ctx: &ValidationContext) -> Result<(), Error> {
	let expected = calculate_difficulty(
		ctx.config,
		header.number(),
		header.time().as_u64(),
		parent.number(),
		parent.time().as_u64(),
		parent.difficulty(),
		parent.has_uncles(),
	);
	if header.difficulty() != expected {
		return Err(ErrorKind::Block(BlockError::InvalidDifficulty(Mismatch {
			expected,
			found: header.difficulty(),
		}))
		.into());
	}
	Ok(())
}

fn verify_gas(header: &Header, parent: &Header) -> Result<(), Error> {
	if header.gas_limit() > GAS_LIMIT_CAP {
		return Err(ErrorKind::Block(BlockError::InvalidGasLimit(OutOfBounds {
			min: None,
			max: Some(GAS_LIMIT_CAP),
			found: header.gas_limit(),
		}))
		.into());
	}

	if header.gas_used() > header.gas_limit() {
		return Err(ErrorKind::Block(BlockError::InvalidGasUsed(OutOfBounds {
			min: None,
			max: Some(header.gas_limit()),
			found: header.gas_used(),
		}))
		.into());
	}

	if header.gas_limit() < MIN_GAS_LIMIT {
		return Err(ErrorKind::Block(BlockError::InvalidGasLimit(OutOfBounds {
			min: Some(MIN_GAS_LIMIT),
			max: None,
			found: header.gas_limit(),
		}))
		.into());
	}

	let bound = parent.gas_limit() / GAS_LIMIT_BOUND_DIVISOR;
	let lower = parent.gas_limit().saturating_sub(bound);
	let upper = parent.gas_limit() + bound;
	if header.gas_limit() <= lower || header.gas_limit() >= upper {
		return Err(ErrorKind::Block(BlockError::InvalidGasLimit(OutOfBounds {
			min: Some(lower),
			max: Some(upper),
			found: header.gas_limit(),
		}))
		.into());
	}

	Ok(())
}

fn verify_number(header: &Header, parent: &Header) -> Result<(), Error> {
	if header.number() != parent.number() + 1 {
		return Err(ErrorKind::Block(BlockError::InvalidNumber(Mismatch {
			expected: parent.number() + 1,
			found: header.number(),
		}))
		.into());
	}
	Ok(())
}
