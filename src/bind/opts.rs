use alloy::eips::{BlockId, BlockNumberOrTag};
use alloy::primitives::{Address, U256};
use alloy::rpc::types::TransactionRequest;

/// Options for a read-only contract call.
#[derive(Debug, Clone, Default)]
pub struct CallOpts {
    /// Run the call against the pending state.
    pub pending: bool,
    pub from: Option<Address>,
    /// Historical point to execute at; latest when unset.
    pub block: Option<BlockId>,
}

impl CallOpts {
    pub fn at_block(number: u64) -> Self {
        Self {
            block: Some(BlockId::number(number)),
            ..Default::default()
        }
    }

    pub(crate) fn block_id(&self) -> BlockId {
        if self.pending {
            BlockId::Number(BlockNumberOrTag::Pending)
        } else {
            self.block.unwrap_or(BlockId::Number(BlockNumberOrTag::Latest))
        }
    }
}

/// Options for a state-mutating call. Unset fields are left for the
/// transactor to fill in.
#[derive(Debug, Clone, Default)]
pub struct TransactOpts {
    pub from: Option<Address>,
    pub nonce: Option<u64>,
    pub value: Option<U256>,
    pub gas_limit: Option<u64>,
    pub gas_price: Option<u128>,
    pub max_fee_per_gas: Option<u128>,
    pub max_priority_fee_per_gas: Option<u128>,
}

impl TransactOpts {
    pub fn from(sender: Address) -> Self {
        Self {
            from: Some(sender),
            ..Default::default()
        }
    }

    pub(crate) fn apply(&self, mut tx: TransactionRequest) -> TransactionRequest {
        tx.from = self.from;
        tx.nonce = self.nonce;
        tx.value = self.value;
        tx.gas = self.gas_limit;
        tx.gas_price = self.gas_price;
        tx.max_fee_per_gas = self.max_fee_per_gas;
        tx.max_priority_fee_per_gas = self.max_priority_fee_per_gas;
        tx
    }
}

/// Block range for historical log queries. `end: None` means up to the
/// latest block.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterOpts {
    pub start: u64,
    pub end: Option<u64>,
}

impl FilterOpts {
    pub fn range(start: u64, end: u64) -> Self {
        Self {
            start,
            end: Some(end),
        }
    }
}

/// Options for live log subscriptions.
#[derive(Debug, Clone, Copy, Default)]
pub struct WatchOpts {
    /// First block to deliver logs from; the chain head when unset.
    pub start: Option<u64>,
}
