//! Metrics engine: pure functions mapping raw per-period counters to derived
//! metrics and display strings. No state, no IO; every numeric failure
//! collapses to 0 (compute) or "N/A" (format).

mod compute;
mod format;

pub use compute::compute;
pub use format::format_value;
