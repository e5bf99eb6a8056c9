//! Header, uncle and seal verification, difficulty calculation, and block
//! finalization for a proof-of-work chain with a mid-life seal-algorithm
//! switch (Keccak-256 hashimoto-light before HF5, Argon2id from HF5 on).

pub mod batch;
pub mod chain;
pub mod difficulty;
pub mod engine;
pub mod error;
pub mod finalize;
pub mod header_validator;
pub mod seal;
pub mod uncles;

pub use batch::BatchHandle;
pub use chain::{ChainReader, StateMutator};
pub use engine::ConsensusEngine;
pub use error::{BlockError, Error, ErrorKind};
pub use seal::PowMode;
