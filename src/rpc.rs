use crate::chain::{ChainBlock, ChainReader, ChainReceipt, ChainTransaction};
use crate::error::ChainError;
use alloy::consensus::Transaction as _;
use alloy::network::TransactionBuilder;
use alloy::providers::fillers::FillProvider;
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::{BlockNumberOrTag, Filter, Log, TransactionRequest};
use alloy::transports::{TransportError, TransportResult};
use alloy_primitives::{Address, B256, Bytes, U256};
use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::timeout;
use tokio_retry::Retry;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, info, warn};

type AlloyFullProvider = FillProvider<
    alloy::providers::fillers::JoinFill<
        alloy::providers::Identity,
        alloy::providers::fillers::JoinFill<
            alloy::providers::fillers::GasFiller,
            alloy::providers::fillers::JoinFill<
                alloy::providers::fillers::BlobGasFiller,
                alloy::providers::fillers::JoinFill<
                    alloy::providers::fillers::NonceFiller,
                    alloy::providers::fillers::ChainIdFiller,
                >,
            >,
        >,
    >,
    alloy::providers::RootProvider,
>;

const MAX_RESULTS_ERROR: &str = "exceeds max results";

#[derive(Clone)]
pub struct RpcClient {
    providers: Vec<AlloyFullProvider>,
    urls: Vec<String>,
    current_provider: Arc<AtomicUsize>,
    max_retries: usize,
    request_timeout: Duration,
}

impl RpcClient {
    pub fn new(rpc_urls: &[String], max_retries: usize, request_timeout: Duration) -> Result<Self> {
        if rpc_urls.is_empty() {
            return Err(anyhow::anyhow!("At least one RPC URL must be provided"));
        }

        let mut providers = Vec::new();
        for url in rpc_urls {
            let parsed_url = url
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid RPC URL: {}", url))?;
            let provider: AlloyFullProvider = ProviderBuilder::new().connect_http(parsed_url);
            providers.push(provider);
        }

        Ok(RpcClient {
            providers,
            urls: rpc_urls.to_vec(),
            current_provider: Arc::new(AtomicUsize::new(0)),
            max_retries,
            request_timeout,
        })
    }

    fn get_provider(&self) -> &AlloyFullProvider {
        let index = self.current_provider.load(Ordering::Relaxed) % self.providers.len();
        &self.providers[index]
    }

    pub fn get_current_url(&self) -> &str {
        let index = self.current_provider.load(Ordering::Relaxed) % self.urls.len();
        &self.urls[index]
    }

    pub fn rotate_provider(&self) {
        let current = self.current_provider.load(Ordering::Relaxed);
        let next = (current + 1) % self.providers.len();
        self.current_provider.store(next, Ordering::Relaxed);

        if self.providers.len() > 1 {
            debug!("Rotating to RPC provider #{}", next);
        }
    }

    fn get_retry_strategy(&self) -> impl Iterator<Item = Duration> {
        ExponentialBackoff::from_millis(100)
            .factor(2)
            .max_delay(Duration::from_secs(10))
            .map(jitter)
            .take(self.max_retries)
    }

    fn handle_error(&self, method: &str, error_str: &str) {
        let current_url = self.get_current_url();
        warn!(
            "RPC error in {} on {}: {}, rotating provider",
            method, current_url, error_str
        );
        self.rotate_provider();
    }

    fn handle_timeout(&self, method: &str) -> String {
        let current_url = self.get_current_url();
        warn!(
            "{} timed out after {} seconds on {}, rotating provider",
            method,
            self.request_timeout.as_secs(),
            current_url
        );
        self.rotate_provider();
        format!(
            "request timeout after {} seconds",
            self.request_timeout.as_secs()
        )
    }

    /// The node answered, but with an error that retrying will not change.
    fn is_rejection(error: &TransportError) -> bool {
        error.as_error_resp().is_some_and(|payload| {
            payload.code == 3
                || payload.message.contains("revert")
                || payload.message.contains(MAX_RESULTS_ERROR)
        })
    }

    /// Runs `call` against the current provider with timeout, backoff and
    /// rotation. The inner `Err` carries a rejection that was not retried.
    async fn request<T, F, Fut>(
        &self,
        method: &'static str,
        call: F,
    ) -> Result<TransportResult<T>, ChainError>
    where
        F: Fn(AlloyFullProvider) -> Fut,
        Fut: Future<Output = TransportResult<T>>,
    {
        Retry::spawn(self.get_retry_strategy(), || {
            let pending = call(self.get_provider().clone());
            async move {
                match timeout(self.request_timeout, pending).await {
                    Ok(Ok(value)) => Ok(Ok(value)),
                    // rejections go back to the caller without a retry
                    Ok(Err(e)) if Self::is_rejection(&e) => Ok(Err(e)),
                    Ok(Err(e)) => {
                        let error_str = e.to_string();
                        self.handle_error(method, &error_str);
                        Err(error_str)
                    }
                    Err(_) => Err(self.handle_timeout(method)),
                }
            }
        })
        .await
        .map_err(|reason| ChainError::transient(method, reason))
    }

    async fn get_logs_internal(
        &self,
        from_block: u64,
        to_block: u64,
        topic0: B256,
    ) -> Result<TransportResult<Vec<Log>>, ChainError> {
        let filter = Filter::new()
            .event_signature(topic0)
            .from_block(from_block)
            .to_block(to_block);

        self.request("eth_getLogs", |provider| {
            let filter = filter.clone();
            async move { provider.get_logs(&filter).await }
        })
        .await
    }

    fn parse_max_results_error(error_str: &str) -> Option<(u64, u64)> {
        let re = Regex::new(r"retry with the range (\d+)-(\d+)").ok()?;
        let captures = re.captures(error_str)?;

        let from = captures.get(1)?.as_str().parse().ok()?;
        let to = captures.get(2)?.as_str().parse().ok()?;

        Some((from, to))
    }

    pub async fn get_logs(
        &self,
        from_block: u64,
        to_block: u64,
        topic0: B256,
    ) -> Result<Vec<Log>, ChainError> {
        let mut all_logs = Vec::new();
        let mut current_from = from_block;

        while current_from <= to_block {
            match self
                .get_logs_internal(current_from, to_block, topic0)
                .await?
            {
                Ok(logs) => {
                    all_logs.extend(logs);
                    break;
                }
                Err(e) => {
                    let error_str = e.to_string();
                    let suggested = error_str
                        .contains(MAX_RESULTS_ERROR)
                        .then(|| Self::parse_max_results_error(&error_str))
                        .flatten();

                    let Some((suggested_from, suggested_to)) = suggested else {
                        return Err(ChainError::transient("eth_getLogs", error_str));
                    };

                    info!(
                        "Hit max results limit for blocks {}-{}, splitting at block {}",
                        current_from, to_block, suggested_to
                    );

                    let logs = self
                        .get_logs_internal(suggested_from, suggested_to, topic0)
                        .await?
                        .map_err(|e| ChainError::transient("eth_getLogs", e))?;

                    all_logs.extend(logs);
                    current_from = suggested_to + 1;
                }
            }
        }

        Ok(all_logs)
    }
}

fn rejected(method: &'static str) -> impl FnOnce(TransportError) -> ChainError {
    move |e| ChainError::transient(method, e)
}

#[async_trait]
impl ChainReader for RpcClient {
    async fn head_height(&self) -> Result<u64, ChainError> {
        self.request("eth_blockNumber", |provider| async move {
            provider.get_block_number().await
        })
        .await?
        .map_err(rejected("eth_blockNumber"))
    }

    async fn block_with_transactions(&self, number: u64) -> Result<ChainBlock, ChainError> {
        let block = self
            .request("eth_getBlockByNumber", |provider| async move {
                provider
                    .get_block_by_number(BlockNumberOrTag::Number(number))
                    .full()
                    .await
            })
            .await?
            .map_err(rejected("eth_getBlockByNumber"))?
            .ok_or(ChainError::MissingBlock(number))?;

        let transactions = block
            .transactions
            .txns()
            .map(|tx| ChainTransaction {
                hash: *tx.inner.tx_hash(),
                from: tx.inner.signer(),
                to: tx.to(),
                value: tx.value(),
                input: tx.input().clone(),
            })
            .collect();

        Ok(ChainBlock {
            number,
            transactions,
        })
    }

    async fn logs_in_range(
        &self,
        from_block: u64,
        to_block: u64,
        topic0: B256,
    ) -> Result<Vec<Log>, ChainError> {
        self.get_logs(from_block, to_block, topic0).await
    }

    async fn receipt(&self, tx_hash: B256) -> Result<ChainReceipt, ChainError> {
        let receipt = self
            .request("eth_getTransactionReceipt", |provider| async move {
                provider.get_transaction_receipt(tx_hash).await
            })
            .await?
            .map_err(rejected("eth_getTransactionReceipt"))?
            .ok_or(ChainError::MissingReceipt(tx_hash))?;

        Ok(ChainReceipt {
            gas_used: receipt.gas_used,
            contract_address: receipt.contract_address,
        })
    }

    async fn static_call(&self, address: Address, calldata: Bytes) -> Result<Bytes, ChainError> {
        let request = TransactionRequest::default()
            .with_to(address)
            .with_input(calldata);

        self.request("eth_call", |provider| {
            let request = request.clone();
            async move { provider.call(request).await }
        })
        .await?
        .map_err(|_| ChainError::CallReverted { address })
    }

    async fn native_balance(&self, address: Address) -> Result<U256, ChainError> {
        self.request("eth_getBalance", |provider| async move {
            provider.get_balance(address).await
        })
        .await?
        .map_err(rejected("eth_getBalance"))
    }
}
