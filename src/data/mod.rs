//! Page data: the cascade's building blocks.
//!
//! Every page sees one merged JSON object. It is assembled from four
//! sources, later ones winning:
//!
//! ```text
//! ┌────────────┐   ┌────────────┐   ┌────────────┐   ┌──────────────┐
//! │  global    │ < │  layout    │ < │ directory  │ < │ front matter │
//! │ (_data/*)  │   │  chain     │   │ data files │   │              │
//! └────────────┘   └────────────┘   └────────────┘   └──────────────┘
//!                                 │
//!                                 ▼
//!                  reserved-key check, merge_all()
//! ```
//!
//! | Module | Role |
//! |--------|------|
//! | [`merge`] | shallow/deep merge with the `override:` prefix |
//! | [`path`] | dotted key paths (`page.url`) |
//! | [`reserved`] | keys user data may not set |
//! | `store` | [`DataStore`] plus filesystem and in-memory stores |

pub mod merge;
pub mod path;
pub mod reserved;
mod store;

pub use merge::merge_all;
pub use path::{get_path, has_path, set_path};
pub use reserved::check_reserved;
pub use store::{DataStore, FsDataStore, StaticDataStore};
