//! Header, block, and chain-configuration types shared by the consensus
//! engine and its callers.

mod block;
mod config;
mod header;

pub use block::Block;
pub use config::{ChainConfig, Hardfork};
pub use header::{empty_uncles_hash, BlockNumber, Header, HeaderVersion, MAX_EXTRA_DATA_SIZE};

pub use ethereum_types::{Address, H256, U256};
