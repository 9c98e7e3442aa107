//! ABI fragments for the token standards the tracker understands.
//!
//! ERC-20 and ERC-721 both declare `Transfer(address,address,uint256)`, so
//! they share a signature hash and live in separate modules.

use alloy::sol;
use alloy::sol_types::SolEvent;
use alloy_primitives::B256;

pub mod erc20 {
    use super::sol;

    sol! {
        event Transfer(address indexed from, address indexed to, uint256 value);

        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
    }
}

pub mod erc721 {
    use super::sol;

    sol! {
        event Transfer(address indexed from, address indexed to, uint256 indexed tokenId);
    }
}

pub mod erc1155 {
    use super::sol;

    sol! {
        event TransferSingle(
            address indexed operator,
            address indexed from,
            address indexed to,
            uint256 id,
            uint256 value
        );

        event TransferBatch(
            address indexed operator,
            address indexed from,
            address indexed to,
            uint256[] ids,
            uint256[] values
        );
    }
}

pub const TRANSFER_TOPIC: B256 = erc20::Transfer::SIGNATURE_HASH;
pub const TRANSFER_SINGLE_TOPIC: B256 = erc1155::TransferSingle::SIGNATURE_HASH;
pub const TRANSFER_BATCH_TOPIC: B256 = erc1155::TransferBatch::SIGNATURE_HASH;

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{b256, keccak256};

    #[test]
    fn erc20_and_erc721_share_the_transfer_signature() {
        assert_eq!(
            erc20::Transfer::SIGNATURE_HASH,
            erc721::Transfer::SIGNATURE_HASH
        );
        assert_eq!(
            TRANSFER_TOPIC,
            b256!("ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef")
        );
    }

    #[test]
    fn multi_token_topics_match_their_signatures() {
        assert_eq!(
            TRANSFER_SINGLE_TOPIC,
            keccak256("TransferSingle(address,address,address,uint256,uint256)")
        );
        assert_eq!(
            TRANSFER_BATCH_TOPIC,
            keccak256("TransferBatch(address,address,address,uint256[],uint256[])")
        );
    }
}
