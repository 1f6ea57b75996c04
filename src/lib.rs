//! Folio - the per-page compilation core of a static site generator.
//!
//! # Architecture
//!
//! ```text
//! Template ──► get_data() ─────────── data cascade (global < layout < dir < front matter)
//!    │
//!    └──► page_entries() ──► PageEntry ×N ── computed phase 1, page.url / page.outputPath
//!                               │
//!            Collections::build(all entries)
//!                               │
//!                 process_remaining_data() ── computed phase 2
//!                               │
//!            pipeline::render_page_entry() ── layout, linters, transforms
//!                               │
//!                     pipeline::write() ───── file, JSON record or NDJSON line
//! ```

pub mod build;
pub mod cache;
pub mod cli;
pub mod collections;
pub mod computed;
pub mod config;
pub mod context;
pub mod data;
pub mod engine;
pub mod error;
pub mod permalink;
pub mod pipeline;
pub mod template;
pub mod utils;

pub use context::SiteContext;
