use crate::chain::ChainReader;
use crate::error::ChainError;
use crate::events::erc20::{decimalsCall, nameCall, symbolCall};
use alloy::sol_types::SolCall;
use alloy_primitives::Address;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Fungible,
    Nft,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMetadata {
    pub address: Address,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub kind: TokenKind,
}

impl TokenMetadata {
    pub fn unknown(address: Address) -> Self {
        TokenMetadata {
            address,
            name: "Unknown".to_string(),
            symbol: "UNK".to_string(),
            decimals: 18,
            kind: TokenKind::Unknown,
        }
    }
}

/// Interfaces tried, in order, before falling back to [`TokenMetadata::unknown`].
const PROBE_ORDER: [TokenKind; 2] = [TokenKind::Fungible, TokenKind::Nft];

/// Resolves token name/symbol/decimals by probing the contract, caching the
/// outcome for the life of the process.
pub struct TokenMetadataResolver {
    chain: Arc<dyn ChainReader>,
    cache: RwLock<HashMap<Address, TokenMetadata>>,
}

impl TokenMetadataResolver {
    pub fn new(chain: Arc<dyn ChainReader>) -> Self {
        Self {
            chain,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn cached(&self, token: &Address) -> Option<TokenMetadata> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(token)
            .cloned()
    }

    /// Drops a cached entry so the next lookup probes again. Never called by
    /// the scan loop itself.
    pub fn invalidate(&self, token: &Address) -> bool {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(token)
            .is_some()
    }

    /// Cached metadata for `token`, probing on first sight. Transport
    /// failures are returned and nothing is cached, so the next cycle retries.
    pub async fn resolve(&self, token: Address) -> Result<TokenMetadata, ChainError> {
        if let Some(metadata) = self.cached(&token) {
            return Ok(metadata);
        }

        let metadata = self.probe(token).await?;
        info!(
            "Resolved token {:?} as {:?} ({} / {})",
            token, metadata.kind, metadata.name, metadata.symbol
        );

        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token, metadata.clone());
        Ok(metadata)
    }

    async fn probe(&self, token: Address) -> Result<TokenMetadata, ChainError> {
        for kind in PROBE_ORDER {
            if let Some(metadata) = self.try_interface(token, kind).await? {
                return Ok(metadata);
            }
            debug!("Token {:?} does not implement {:?} metadata", token, kind);
        }
        Ok(TokenMetadata::unknown(token))
    }

    async fn try_interface(
        &self,
        token: Address,
        kind: TokenKind,
    ) -> Result<Option<TokenMetadata>, ChainError> {
        let Some(name) = self.read(token, nameCall {}).await? else {
            return Ok(None);
        };
        let Some(symbol) = self.read(token, symbolCall {}).await? else {
            return Ok(None);
        };
        let decimals = match kind {
            TokenKind::Fungible => match self.read(token, decimalsCall {}).await? {
                Some(decimals) => decimals,
                None => return Ok(None),
            },
            TokenKind::Nft | TokenKind::Unknown => 0,
        };

        Ok(Some(TokenMetadata {
            address: token,
            name,
            symbol,
            decimals,
            kind,
        }))
    }

    /// `Ok(None)` when the contract does not answer this call: a revert or a
    /// return payload that does not decode.
    async fn read<C>(&self, token: Address, call: C) -> Result<Option<C::Return>, ChainError>
    where
        C: SolCall + Send,
    {
        match self.chain.static_call(token, call.abi_encode().into()).await {
            Ok(output) => Ok(C::abi_decode_returns(&output).ok()),
            Err(ChainError::CallReverted { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
