//! Runs one scan cycle per tracked address and owns cursor advancement.
//!
//! A cycle walks `Idle -> RangeResolved -> Scanning -> Persisting` and ends in
//! either `CursorAdvanced` or `PartialFailure`. The cursor only moves when
//! every scanner and every append succeeded; otherwise the whole range is
//! scanned again next cycle and duplicate appends are no-ops.

use crate::activity::ActivityEvent;
use crate::balance::check_native_balance;
use crate::context::TrackerContext;
use crate::error::{ChainError, ScanError};
use crate::notifier::Notification;
use crate::range::{BlockRange, RangePolicy};
use crate::repository::TrackedAddress;
use crate::scanner::{self, deployment, interaction, native, transfers};
use alloy_primitives::Address;
use futures::{StreamExt, stream};
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct DispatcherSettings {
    pub range_policy: RangePolicy,
    /// Addresses scanned at the same time.
    pub max_concurrent_addresses: usize,
    /// Block and receipt requests in flight per scanner.
    pub fetch_concurrency: usize,
    pub cycle_timeout: Duration,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            range_policy: RangePolicy::default(),
            max_concurrent_addresses: 4,
            fetch_concurrency: 8,
            cycle_timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Advanced(u64),
    PartialFailure(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressOutcome {
    pub address: Address,
    pub owner_id: i64,
    pub outcome: CycleOutcome,
    /// Events persisted for the first time during this cycle.
    pub recorded: usize,
}

#[derive(Debug)]
enum CycleState {
    Idle,
    RangeResolved(BlockRange),
    Scanning,
    Persisting(usize),
    CursorAdvanced(u64),
    PartialFailure,
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleState::Idle => write!(f, "idle"),
            CycleState::RangeResolved(range) => write!(f, "range resolved {range}"),
            CycleState::Scanning => write!(f, "scanning"),
            CycleState::Persisting(count) => write!(f, "persisting {count} event(s)"),
            CycleState::CursorAdvanced(block) => write!(f, "cursor advanced to {block}"),
            CycleState::PartialFailure => write!(f, "partial failure"),
        }
    }
}

fn enter(tracked: &TrackedAddress, state: CycleState) {
    debug!("{:?} (owner {}): {}", tracked.address, tracked.owner_id, state);
}

struct ScannerRun {
    name: &'static str,
    result: Result<Vec<ActivityEvent>, ChainError>,
}

pub struct Dispatcher {
    ctx: TrackerContext,
    settings: DispatcherSettings,
}

impl Dispatcher {
    pub fn new(ctx: TrackerContext, settings: DispatcherSettings) -> Self {
        Self { ctx, settings }
    }

    pub fn context(&self) -> &TrackerContext {
        &self.ctx
    }

    /// Runs one cycle for every address in `addresses`, at most
    /// `max_concurrent_addresses` at a time. Failures never cross address
    /// boundaries.
    pub async fn run_cycle(&self, addresses: &[TrackedAddress]) -> Vec<AddressOutcome> {
        if addresses.is_empty() {
            return Vec::new();
        }

        let head = match self.ctx.chain.head_height().await {
            Ok(head) => head,
            Err(e) => {
                warn!("Could not read chain head: {}", e);
                return addresses
                    .iter()
                    .map(|tracked| AddressOutcome {
                        address: tracked.address,
                        owner_id: tracked.owner_id,
                        outcome: CycleOutcome::PartialFailure(e.to_string()),
                        recorded: 0,
                    })
                    .collect();
            }
        };

        stream::iter(addresses)
            .map(|tracked| self.run_address(tracked, head))
            .buffer_unordered(self.settings.max_concurrent_addresses.max(1))
            .collect()
            .await
    }

    async fn run_address(&self, tracked: &TrackedAddress, head: u64) -> AddressOutcome {
        let timeout = self.settings.cycle_timeout;
        let result = match tokio::time::timeout(timeout, self.process(tracked, head)).await {
            Ok(result) => result,
            Err(_) => Err(ScanError::Timeout(timeout)),
        };

        let (outcome, recorded) = match result {
            Ok(done) => done,
            Err(e) => {
                warn!("Cycle for {:?} aborted: {}", tracked.address, e);
                enter(tracked, CycleState::PartialFailure);
                (CycleOutcome::PartialFailure(e.to_string()), 0)
            }
        };

        AddressOutcome {
            address: tracked.address,
            owner_id: tracked.owner_id,
            outcome,
            recorded,
        }
    }

    async fn process(
        &self,
        tracked: &TrackedAddress,
        head: u64,
    ) -> Result<(CycleOutcome, usize), ScanError> {
        enter(tracked, CycleState::Idle);
        let cursor = self.ctx.store.last_processed_block(tracked).await?;
        let range = self.settings.range_policy.resolve(head, cursor);
        enter(tracked, CycleState::RangeResolved(range));

        if range.is_empty() {
            self.check_balance(tracked, head).await;
            return Ok((CycleOutcome::Advanced(cursor), 0));
        }

        enter(tracked, CycleState::Scanning);
        let runs = self.scan(tracked.address, range).await;

        let mut failures = Vec::new();
        let mut events = Vec::new();
        for run in runs {
            match run.result {
                Ok(found) => events.extend(found),
                Err(e) => {
                    warn!(
                        "{} scanner failed for {:?} over {}: {}",
                        run.name, tracked.address, range, e
                    );
                    failures.push(format!("{}: {}", run.name, e));
                }
            }
        }

        // first occurrence of a transaction wins, in scanner order
        let mut seen = HashSet::new();
        events.retain(|event| seen.insert(event.tx_hash()));

        enter(tracked, CycleState::Persisting(events.len()));
        let mut recorded = 0;
        for event in events {
            match self.ctx.store.append_activity(tracked, &event).await {
                Ok(true) => {
                    recorded += 1;
                    self.announce(tracked, event).await;
                }
                Ok(false) => debug!("Already recorded {:?}", event.tx_hash()),
                Err(e) => {
                    warn!("Failed to persist {:?}: {}", event.tx_hash(), e);
                    failures.push(format!("persist: {e}"));
                }
            }
        }

        self.check_balance(tracked, range.to_block).await;

        if !failures.is_empty() {
            enter(tracked, CycleState::PartialFailure);
            return Ok((CycleOutcome::PartialFailure(failures.join("; ")), recorded));
        }

        self.ctx
            .store
            .set_last_processed_block(tracked, range.to_block)
            .await?;
        enter(tracked, CycleState::CursorAdvanced(range.to_block));

        if recorded > 0 {
            info!(
                "Recorded {} new event(s) for {:?} in blocks {}",
                recorded, tracked.address, range
            );
        }
        Ok((CycleOutcome::Advanced(range.to_block), recorded))
    }

    /// Runs every scanner over `range`. Results come back in the fixed order
    /// native, token transfers, interactions, deployments.
    async fn scan(&self, address: Address, range: BlockRange) -> Vec<ScannerRun> {
        let chain = self.ctx.chain.as_ref();
        let concurrency = self.settings.fetch_concurrency;

        let block_driven = async {
            let blocks = scanner::fetch_blocks(chain, range, concurrency).await?;
            Ok::<_, ChainError>(tokio::join!(
                native::scan(chain, address, &blocks, concurrency),
                interaction::scan(chain, address, &blocks, concurrency),
                deployment::scan(chain, address, &blocks, concurrency),
            ))
        };

        let (block_driven, tokens) =
            tokio::join!(block_driven, transfers::scan(&self.ctx, address, range));

        let run = |name, result| ScannerRun { name, result };
        match block_driven {
            Ok((natives, interactions, deployments)) => vec![
                run("native", natives),
                run("token transfer", tokens),
                run("contract interaction", interactions),
                run("contract deployment", deployments),
            ],
            Err(e) => vec![run("block fetch", Err(e)), run("token transfer", tokens)],
        }
    }

    async fn announce(&self, tracked: &TrackedAddress, event: ActivityEvent) {
        info!("{:?}: {}", tracked.address, event);
        let notification = Notification::Activity {
            address: tracked.address,
            event,
        };
        if let Err(e) = self.ctx.notify(tracked.owner_id, &notification).await {
            warn!("Notification for {:?} failed: {}", tracked.address, e);
        }
    }

    // A failed balance read is retried next cycle and never holds the cursor
    async fn check_balance(&self, tracked: &TrackedAddress, block: u64) {
        if let Err(e) = check_native_balance(&self.ctx, tracked, block).await {
            warn!("Balance check for {:?} failed: {}", tracked.address, e);
        }
    }
}
