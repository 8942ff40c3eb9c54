//! capsim-sim — capture sampler, compositor, and the driver that replays a
//! present trace through them.
//!
//! ```text
//! PresentEvent ─► Driver ─┬─► CaptureSampler::try_capture
//!                         │         │ captured
//!                         │         ▼
//!                         └─► Compositor::offer / emit (fixed-rate ticks)
//!                                   │
//!                                   ▼
//!                           Vec<CompositedEntry>
//! ```

pub mod capture;
pub mod compositor;
pub mod driver;

pub use capture::{CaptureSampler, CaptureStats};
pub use compositor::{Compositor, CompositorOutput, CompositorStats};
pub use driver::{simulate_times, Driver, SimulationResult};
