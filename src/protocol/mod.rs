//! Pipeline data model
//!
//! Task definitions and agent responses (`messages`), per-run execution
//! records (`status`), and the canonical structured records stored under the
//! well-known context keys (`records`).

pub mod messages;
pub mod records;
pub mod status;

pub use messages::*;
pub use records::*;
pub use status::*;
