use serde::{Deserialize, Serialize};

// MARK: - PresentEvent

/// One application frame becoming available, as read from the trace.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PresentEvent {
    /// 0-based position in the trace.
    pub sequence_number: u64,
    /// Cumulative sum of inter-present deltas up to and including this row.
    pub present_time_ms: f64,
}

impl PresentEvent {
    pub fn new(sequence_number: u64, present_time_ms: f64) -> Self {
        Self { sequence_number, present_time_ms }
    }
}

// MARK: - Disposition

/// What the simulation decided to do with a presented frame.
///
/// Only moves forward: `Unknown → Ignored`, or
/// `Unknown → Captured → Composited → CompositedDuplicate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Disposition {
    #[default]
    Unknown,
    Ignored,
    Captured,
    Composited,
    CompositedDuplicate,
}

impl Disposition {
    /// Whether the compositor may output a frame in this state.
    pub fn is_capturable(self) -> bool {
        matches!(self, Self::Captured | Self::Composited | Self::CompositedDuplicate)
    }

    pub fn is_composited(self) -> bool {
        matches!(self, Self::Composited | Self::CompositedDuplicate)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::Ignored => "IGNORED",
            Self::Captured => "CAPTURED",
            Self::Composited => "COMPOSITED",
            Self::CompositedDuplicate => "COMPOSITED_DUPLICATE",
        }
    }

    fn can_become(self, next: Self) -> bool {
        use Disposition::*;
        matches!(
            (self, next),
            (Unknown, Ignored)
                | (Unknown, Captured)
                | (Captured, Composited)
                | (Composited, CompositedDuplicate)
                | (CompositedDuplicate, CompositedDuplicate)
        )
    }
}

impl std::fmt::Display for Disposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// MARK: - Frame

/// A presented frame plus everything the simulation learned about it.
///
/// Owned by the driver's frame list and handed to each stage by `&mut`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    event: PresentEvent,
    capture_time_ms: Option<f64>,
    composite_time_ms: Option<f64>,
    composite_sequence_number: Option<u64>,
    disposition: Disposition,
}

impl Frame {
    pub fn new(event: PresentEvent) -> Self {
        Self {
            event,
            capture_time_ms: None,
            composite_time_ms: None,
            composite_sequence_number: None,
            disposition: Disposition::Unknown,
        }
    }

    pub fn event(&self) -> PresentEvent {
        self.event
    }

    pub fn sequence_number(&self) -> u64 {
        self.event.sequence_number
    }

    pub fn present_time_ms(&self) -> f64 {
        self.event.present_time_ms
    }

    pub fn capture_time_ms(&self) -> Option<f64> {
        self.capture_time_ms
    }

    /// Time of the most recent compositor tick that output this frame.
    pub fn composite_time_ms(&self) -> Option<f64> {
        self.composite_time_ms
    }

    /// Output sequence number of the most recent tick that output this frame.
    pub fn composite_sequence_number(&self) -> Option<u64> {
        self.composite_sequence_number
    }

    pub fn disposition(&self) -> Disposition {
        self.disposition
    }

    pub fn mark_ignored(&mut self) {
        self.advance(Disposition::Ignored);
    }

    pub fn mark_captured(&mut self, capture_time_ms: f64) {
        self.advance(Disposition::Captured);
        self.capture_time_ms = Some(capture_time_ms);
    }

    /// Record an output tick. `duplicate` is true when an earlier tick
    /// already output this frame.
    pub fn mark_composited(&mut self, composite_time_ms: f64, composite_sequence_number: u64, duplicate: bool) {
        let next = if duplicate {
            Disposition::CompositedDuplicate
        } else {
            Disposition::Composited
        };
        self.advance(next);
        self.composite_time_ms = Some(composite_time_ms);
        self.composite_sequence_number = Some(composite_sequence_number);
    }

    fn advance(&mut self, next: Disposition) {
        debug_assert!(
            self.disposition.can_become(next),
            "frame {}: illegal disposition change {} -> {}",
            self.event.sequence_number,
            self.disposition,
            next
        );
        self.disposition = next;
    }
}

// MARK: - CompositedEntry

/// One compositor output frame. A copy of the source frame's identity taken
/// at tick time, not a reference to it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompositedEntry {
    pub present_sequence_number: u64,
    pub present_time_ms: f64,
    pub capture_time_ms: Option<f64>,
    pub composite_sequence_number: u64,
    pub composite_time_ms: f64,
    pub duplicate: bool,
}

impl CompositedEntry {
    pub fn snapshot(frame: &Frame, composite_sequence_number: u64, composite_time_ms: f64, duplicate: bool) -> Self {
        Self {
            present_sequence_number: frame.sequence_number(),
            present_time_ms: frame.present_time_ms(),
            capture_time_ms: frame.capture_time_ms(),
            composite_sequence_number,
            composite_time_ms,
            duplicate,
        }
    }
}
