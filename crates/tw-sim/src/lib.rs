//! `tw-sim` — the discrete-time microsimulation loop, live snapshot
//! builder, and stream hub for the traffic microsimulation engine.
//!
//! # What lives here
//!
//! | Module        | Contents                                              |
//! |----------------|--------------------------------------------------------|
//! | [`congestion`] | shared edge-occupancy/utilization helpers               |
//! | [`engine`]     | `advance()`, the outer tick loop, `TickObserver`         |
//! | [`snapshot`]   | `LiveSnapshot`, `VehiclePosition`, `CongestionSegment`   |
//! | [`stream`]     | `StreamHub`/`StreamSubscriber`, the SSE-style event bus  |
//! | [`metrics`]    | `SimOutcome`, the loop's own partial metrics             |
//! | [`error`]      | `SimError`                                               |

pub mod congestion;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod snapshot;
pub mod stream;

pub use engine::{run, NoopObserver, TickObserver};
pub use error::{SimError, SimResult};
pub use metrics::SimOutcome;
pub use snapshot::{build_live_snapshot, CongestionSegment, CongestionSegmentLevel, LiveSnapshot, VehiclePosition};
pub use stream::{channel, StreamEvent, StreamHub, StreamMessage, StreamSubscriber};
