//! Row normalisation and aggregation pipeline.
//!
//! Raw sheet rows flow through field extraction, scope filtering and
//! grouping into capacity-weighted per-group summaries, KPI snapshots
//! and accumulative monthly series. Every function here is total.

pub mod accumulate;
pub mod aggregate;
pub mod analyzer;
pub mod extract;
pub mod grade;
pub mod scope;
pub mod types;
pub mod utility;
