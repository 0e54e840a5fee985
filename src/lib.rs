//! Batch analyses over public TidyTuesday datasets.
//!
//! Each binary under `src/bin/` is one self-contained run: download a CSV,
//! snapshot it into a local SQLite store (skipping the ingest when the store
//! is already current), run a few parametrized queries, reshape the results,
//! and print a table or write an SVG chart.

pub mod fetch;
pub mod frame;
pub mod logging;
pub mod present;
pub mod query;
pub mod stats;
pub mod store;
pub mod transform;
