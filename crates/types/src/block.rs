//! Block assembly types.

use crate::header::Header;

/// A block: a header plus the transactions, uncle headers, and receipts
/// that were sealed alongside it.
///
/// The consensus engine only ever reads `header` and `uncles`; `Tx` and
/// `Receipt` are left generic because transaction execution and receipt
/// shape are owned by the state-transition layer, not by consensus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block<Tx, Receipt> {
	/// The block header.
	pub header: Header,
	/// Ordered transactions included in the block.
	pub transactions: Vec<Tx>,
	/// Uncle (stale ancestor) headers referenced by this block.
	pub uncles: Vec<Header>,
	/// Transaction receipts, one per transaction, in order.
	pub receipts: Vec<Receipt>,
}

impl<Tx, Receipt> Block<Tx, Receipt> {
	/// Assemble a block from its parts.
	pub fn new(header: Header, transactions: Vec<Tx>, uncles: Vec<Header>, receipts: Vec<Receipt>) -> Self {
		Block { header, transactions, uncles, receipts }
	}
}
