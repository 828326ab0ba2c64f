use std::fmt;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ping,
    Download,
    Upload,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Ping => write!(f, "ping"),
            Direction::Download => write!(f, "download"),
            Direction::Upload => write!(f, "upload"),
        }
    }
}

/// State of one user-initiated test. Owned by the engine call that made it.
#[derive(Debug)]
pub struct MeasurementSession {
    pub target: String,
    pub direction: Direction,
    pub cancel: CancellationToken,
    pub started_at: Instant,
}

impl MeasurementSession {
    pub fn new(
        target: impl Into<String>,
        direction: Direction,
        cancel: &CancellationToken,
        started_at: Instant,
    ) -> Self {
        Self {
            target: target.into(),
            direction,
            cancel: cancel.clone(),
            started_at,
        }
    }

    pub fn span(&self) -> tracing::Span {
        tracing::info_span!("measure", direction = %self.direction, target = %self.target)
    }
}
