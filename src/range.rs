use std::fmt;

/// Inclusive block window. Empty when `from_block == to_block + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRange {
    pub from_block: u64,
    pub to_block: u64,
}

impl BlockRange {
    pub fn is_empty(&self) -> bool {
        self.from_block > self.to_block
    }

    pub fn len(&self) -> u64 {
        if self.is_empty() {
            0
        } else {
            self.to_block - self.from_block + 1
        }
    }

    pub fn blocks(&self) -> std::ops::RangeInclusive<u64> {
        self.from_block..=self.to_block
    }
}

impl fmt::Display for BlockRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.from_block, self.to_block)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RangePolicy {
    /// How far back a never-scanned address starts from the head.
    pub bootstrap_blocks: u64,
    /// Upper bound on blocks scanned in one cycle; the rest is picked up by
    /// the following cycles.
    pub max_range: u64,
}

impl Default for RangePolicy {
    fn default() -> Self {
        RangePolicy {
            bootstrap_blocks: 100,
            max_range: 1000,
        }
    }
}

impl RangePolicy {
    /// Next window for an address whose cursor is `last_processed` (0 means
    /// never scanned) when the chain head is at `head`.
    pub fn resolve(&self, head: u64, last_processed: u64) -> BlockRange {
        let from_block = if last_processed == 0 {
            head.saturating_sub(self.bootstrap_blocks).max(1)
        } else {
            last_processed + 1
        };

        let cap = from_block.saturating_add(self.max_range.max(1) - 1);
        BlockRange {
            from_block,
            to_block: head.min(cap),
        }
    }
}
