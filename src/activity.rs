use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One classified piece of on-chain activity involving a tracked address.
///
/// Every variant carries the hash of the transaction it came from; that hash
/// is the identity key used for idempotent persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActivityEvent {
    Native {
        tx_hash: B256,
        from: Address,
        to: Option<Address>,
        value_wei: U256,
        block: u64,
        gas_used: u64,
    },
    Erc20Transfer {
        tx_hash: B256,
        token: Address,
        from: Address,
        to: Address,
        amount_raw: U256,
        decimals: u8,
        symbol: String,
        name: String,
        block: u64,
    },
    Erc721Transfer {
        tx_hash: B256,
        token: Address,
        from: Address,
        to: Address,
        token_id: U256,
        symbol: String,
        name: String,
        block: u64,
    },
    Erc1155Batch {
        tx_hash: B256,
        token: Address,
        operator: Address,
        from: Address,
        to: Address,
        ids: Vec<U256>,
        values: Vec<U256>,
        block: u64,
    },
    ContractInteraction {
        tx_hash: B256,
        contract: Address,
        function: String,
        value_wei: U256,
        block: u64,
        gas_used: u64,
    },
    ContractDeployment {
        tx_hash: B256,
        new_contract: Address,
        deployer: Address,
        block: u64,
        gas_used: u64,
    },
}

impl ActivityEvent {
    pub fn tx_hash(&self) -> B256 {
        match self {
            ActivityEvent::Native { tx_hash, .. }
            | ActivityEvent::Erc20Transfer { tx_hash, .. }
            | ActivityEvent::Erc721Transfer { tx_hash, .. }
            | ActivityEvent::Erc1155Batch { tx_hash, .. }
            | ActivityEvent::ContractInteraction { tx_hash, .. }
            | ActivityEvent::ContractDeployment { tx_hash, .. } => *tx_hash,
        }
    }

    pub fn block(&self) -> u64 {
        match self {
            ActivityEvent::Native { block, .. }
            | ActivityEvent::Erc20Transfer { block, .. }
            | ActivityEvent::Erc721Transfer { block, .. }
            | ActivityEvent::Erc1155Batch { block, .. }
            | ActivityEvent::ContractInteraction { block, .. }
            | ActivityEvent::ContractDeployment { block, .. } => *block,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ActivityEvent::Native { .. } => "native",
            ActivityEvent::Erc20Transfer { .. } => "erc20",
            ActivityEvent::Erc721Transfer { .. } => "erc721",
            ActivityEvent::Erc1155Batch { .. } => "erc1155",
            ActivityEvent::ContractInteraction { .. } => "contract_interaction",
            ActivityEvent::ContractDeployment { .. } => "contract_deployment",
        }
    }

    /// Counterparty columns used by the history views: (from, to).
    pub fn parties(&self) -> (Option<Address>, Option<Address>) {
        match self {
            ActivityEvent::Native { from, to, .. } => (Some(*from), *to),
            ActivityEvent::Erc20Transfer { from, to, .. }
            | ActivityEvent::Erc721Transfer { from, to, .. }
            | ActivityEvent::Erc1155Batch { from, to, .. } => (Some(*from), Some(*to)),
            ActivityEvent::ContractInteraction { contract, .. } => (None, Some(*contract)),
            ActivityEvent::ContractDeployment {
                deployer,
                new_contract,
                ..
            } => (Some(*deployer), Some(*new_contract)),
        }
    }
}

impl fmt::Display for ActivityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivityEvent::Native { value_wei, .. } => write!(f, "native transfer of {value_wei} wei"),
            ActivityEvent::Erc20Transfer {
                amount_raw, symbol, ..
            } => write!(f, "{symbol} transfer of {amount_raw} raw units"),
            ActivityEvent::Erc721Transfer {
                token_id, symbol, ..
            } => write!(f, "{symbol} #{token_id} transfer"),
            ActivityEvent::Erc1155Batch { token, ids, .. } => {
                write!(f, "{} multi-token id(s) from {token:#}", ids.len())
            }
            ActivityEvent::ContractInteraction {
                contract, function, ..
            } => write!(f, "call {function} on {contract:#}"),
            ActivityEvent::ContractDeployment { new_contract, .. } => {
                write!(f, "deployed {new_contract:#}")
            }
        }?;
        write!(f, " (block {}, tx {:#})", self.block(), self.tx_hash())
    }
}
