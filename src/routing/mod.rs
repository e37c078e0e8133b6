//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Movies request
//!     → selector.rs (gradual-migration switch, clamped percent, CSPRNG draw)
//!     → backend.rs (BackendChoice: kind + base URL)
//!     → handed to the forwarder
//! ```
//!
//! # Design Decisions
//! - Selection reads an immutable MigrationConfig snapshot (no locks)
//! - Randomness is injected through PercentSource so tests can pin draws
//! - Selection never fails; bad configuration is rejected at startup

pub mod backend;
pub mod selector;

pub use backend::{BackendChoice, BackendKind};
pub use selector::{select_backend, BackendSelector, OsRngSource, PercentSource};
