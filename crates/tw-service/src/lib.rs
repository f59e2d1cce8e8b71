//! `tw-service` — HTTP/SSE service boundary, orchestrator, and persistence
//! wiring for the traffic microsimulation engine.
//!
//! # Crate layout
//!
//! | Module          | Contents                                               |
//! |-----------------|-----------------------------------------------------------|
//! | [`api`]         | axum router, handlers, `AppState`                         |
//! | [`orchestrator`]| `Orchestrator` — wires providers, graph, demand, sim       |
//! | [`providers`]   | `FallbackOnlyProvider` — the concrete provider wiring       |
//! | [`markers`]     | marker validation and request/record conversions            |
//! | [`metrics`]     | `FinalMetrics` — the assembled `final_metrics` response      |
//! | [`insights`]    | deterministic `ai_summary`/`risk_assessment`/`recommendations`|
//! | [`dto`]         | wire types for the HTTP/SSE boundary                          |
//! | [`error`]       | `ServiceError`, the five error kinds the boundary reports     |

pub mod api;
pub mod dto;
pub mod error;
pub mod insights;
pub mod markers;
pub mod metrics;
pub mod orchestrator;
pub mod providers;

pub use api::{build_router, AppState};
pub use error::{ServiceError, ServiceResult};
pub use orchestrator::Orchestrator;
