/// Identifier of a recognition request. Monotonically increasing; issuing a
/// new request invalidates the previous id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl RequestId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Immutable payload handed to the background worker. The worker never
/// touches UI-owned mutable state; these values are the only traffic across
/// the thread boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    pub id: RequestId,
    pub image_png: Vec<u8>,
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutcome {
    Success(String),
    Failure(String),
}

/// Produced by the worker, consumed exactly once by the orchestrator poll.
/// Results whose id no longer matches the outstanding request are discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionResult {
    pub id: RequestId,
    pub outcome: ConversionOutcome,
}
