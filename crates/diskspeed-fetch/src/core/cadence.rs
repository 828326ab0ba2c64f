/// Percentage of `total` covered by `bytes`, floored and capped at 100.
///
/// `None` when the total is unknown or zero.
pub fn percent_of(bytes: u64, total: Option<u64>) -> Option<u8> {
    match total {
        Some(total) if total > 0 => {
            let pct = (u128::from(bytes) * 100 / u128::from(total)).min(100);
            Some(pct as u8)
        }
        _ => None,
    }
}

/// Decides which chunks trigger a progress report.
///
/// Every `every`-th chunk reports; a transfer that ends between two
/// boundaries gets one extra report at the end.
#[derive(Debug, Clone)]
pub struct ProgressCadence {
    every: u64,
    chunks: u64,
}

impl ProgressCadence {
    pub fn new(every: u64) -> Self {
        Self {
            every: every.max(1),
            chunks: 0,
        }
    }

    /// Count one chunk. Returns `true` when a report is due.
    pub fn tick(&mut self) -> bool {
        self.chunks += 1;
        self.chunks % self.every == 0
    }

    /// Whether the last chunk fell between boundaries.
    pub fn needs_final(&self) -> bool {
        self.chunks % self.every != 0
    }

    pub fn chunks(&self) -> u64 {
        self.chunks
    }
}
