//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! relay + channel produce:
//!     → logging.rs (structured log events, connection/beacon fields)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stderr (human or JSON lines)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```

pub mod logging;
pub mod metrics;
