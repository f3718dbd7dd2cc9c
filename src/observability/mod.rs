//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters via the `metrics` facade)
//!
//! Consumers:
//!     → stderr (pretty for terminals, JSON for machines)
//!     → any `metrics` recorder the embedding application installs
//! ```
//!
//! # Design Decisions
//! - Structured fields, never interpolated secrets
//! - `RUST_LOG` always wins over the configured level

pub mod logging;
pub mod metrics;
