//! Per-candidate report assembly for technosignature searches.
//!
//! ```text
//!  candidate table ──► evidence (light curve, radio hits, T/scale)
//!                        │
//!                        ▼
//!                  plots (lc / sed / radio PNGs)
//!                        │
//!                        ▼
//!                  report_<row + 1>.html
//! ```
//!
//! [`batch::run_from_config`] is the whole pipeline; the pieces are usable
//! on their own.

pub mod batch;
pub mod blackbody;
pub mod color;
pub mod config;
pub mod data;
pub mod render;
pub mod report;
