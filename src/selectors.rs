use alloy_primitives::hex;

/// Well-known 4-byte function selectors, matched against transaction input.
const KNOWN_SELECTORS: &[([u8; 4], &str)] = &[
    ([0xa9, 0x05, 0x9c, 0xbb], "transfer(address,uint256)"),
    ([0x23, 0xb8, 0x72, 0xdd], "transferFrom(address,address,uint256)"),
    ([0x09, 0x5e, 0xa7, 0xb3], "approve(address,uint256)"),
    ([0xa2, 0x2c, 0xb4, 0x65], "setApprovalForAll(address,bool)"),
    ([0x42, 0x84, 0x2e, 0x0e], "safeTransferFrom(address,address,uint256)"),
    ([0xb8, 0x8d, 0x4f, 0xde], "safeTransferFrom(address,address,uint256,bytes)"),
    (
        [0xf2, 0x42, 0x43, 0x2a],
        "safeTransferFrom(address,address,uint256,uint256,bytes)",
    ),
    (
        [0x2e, 0xb2, 0xc2, 0xd6],
        "safeBatchTransferFrom(address,address,uint256[],uint256[],bytes)",
    ),
    (
        [0x7f, 0xf3, 0x6a, 0xb5],
        "swapExactETHForTokens(uint256,address[],address,uint256)",
    ),
    (
        [0x18, 0xcb, 0xaf, 0xe5],
        "swapExactTokensForETH(uint256,uint256,address[],address,uint256)",
    ),
    (
        [0x38, 0xed, 0x17, 0x39],
        "swapExactTokensForTokens(uint256,uint256,address[],address,uint256)",
    ),
    (
        [0x88, 0x03, 0xdb, 0xee],
        "swapTokensForExactTokens(uint256,uint256,address[],address,uint256)",
    ),
    (
        [0xfb, 0x3b, 0xdb, 0x41],
        "swapETHForExactTokens(uint256,address[],address,uint256)",
    ),
    (
        [0x41, 0x4b, 0xf3, 0x89],
        "exactInputSingle((address,address,uint24,address,uint256,uint256,uint256,uint160))",
    ),
    (
        [0xc0, 0x4b, 0x8d, 0x59],
        "exactInput((bytes,address,uint256,uint256,uint256))",
    ),
    (
        [0xe8, 0xe3, 0x37, 0x00],
        "addLiquidity(address,address,uint256,uint256,uint256,uint256,address,uint256)",
    ),
    (
        [0xf3, 0x05, 0xd7, 0x19],
        "addLiquidityETH(address,uint256,uint256,uint256,address,uint256)",
    ),
    (
        [0xba, 0xa2, 0xab, 0xde],
        "removeLiquidity(address,address,uint256,uint256,uint256,address,uint256)",
    ),
    (
        [0x02, 0x75, 0x1c, 0xec],
        "removeLiquidityETH(address,uint256,uint256,uint256,address,uint256)",
    ),
    ([0xac, 0x96, 0x50, 0xd8], "multicall(bytes[])"),
    ([0x5a, 0xe4, 0x01, 0xdc], "multicall(uint256,bytes[])"),
    ([0x35, 0x93, 0x56, 0x4c], "execute(bytes,bytes[],uint256)"),
    ([0xd0, 0xe3, 0x0d, 0xb0], "deposit()"),
    ([0x2e, 0x1a, 0x7d, 0x4d], "withdraw(uint256)"),
    ([0xa6, 0x94, 0xfc, 0x3a], "stake(uint256)"),
    ([0x3d, 0x18, 0xb9, 0x12], "getReward()"),
    ([0x4e, 0x71, 0xd9, 0x2d], "claim()"),
    ([0x12, 0x49, 0xc5, 0x8b], "mint()"),
];

/// Selectors whose calls are reported through the token-transfer path.
const TRANSFER_SELECTORS: &[[u8; 4]] = &[[0xa9, 0x05, 0x9c, 0xbb], [0x23, 0xb8, 0x72, 0xdd]];

/// Resolves a selector to its signature, or the literal `0x…` selector when
/// it is not in the table.
pub fn function_name(selector: [u8; 4]) -> String {
    KNOWN_SELECTORS
        .iter()
        .find(|(known, _)| *known == selector)
        .map(|(_, name)| (*name).to_string())
        .unwrap_or_else(|| hex::encode_prefixed(selector))
}

pub fn is_plain_transfer(selector: [u8; 4]) -> bool {
    TRANSFER_SELECTORS.contains(&selector)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::keccak256;

    #[test]
    fn table_entries_match_their_signatures() {
        for (selector, signature) in KNOWN_SELECTORS {
            assert_eq!(
                &keccak256(signature.as_bytes())[..4],
                selector,
                "selector mismatch for {signature}"
            );
        }
    }

    #[test]
    fn unknown_selector_is_reported_literally() {
        assert_eq!(function_name([0xde, 0xad, 0xbe, 0xef]), "0xdeadbeef");
    }

    #[test]
    fn transfer_and_transfer_from_are_plain_transfers() {
        assert!(is_plain_transfer([0xa9, 0x05, 0x9c, 0xbb]));
        assert!(is_plain_transfer([0x23, 0xb8, 0x72, 0xdd]));
        assert!(!is_plain_transfer([0x09, 0x5e, 0xa7, 0xb3]));
        assert_eq!(function_name([0x09, 0x5e, 0xa7, 0xb3]), "approve(address,uint256)");
    }
}
