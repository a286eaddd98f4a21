// model = "claude-opus-4-5"
// created = 2026-10-19
// modified = 2026-10-19
// driver = "Isaac Clayton"

//! Shared primitives for the replicated types.
//!
//! ## Clocks
//! - `LamportClock`: simple monotonic counter
//! - `VectorClock`: tracks causality across replicas
//! - `HybridLogicalClock`: combines wall time with logical time
//!
//! ## IDs
//! - `ItemId`: atom / mark identifier (node, counter)

pub mod clock;
pub mod id;

// Re-exports for convenience
pub use clock::Causality;
pub use clock::HlcTimestamp;
pub use clock::HybridLogicalClock;
pub use clock::LamportClock;
pub use clock::ManualClock;
pub use clock::TimeSource;
pub use clock::VectorClock;
pub use clock::WallClock;
pub use id::ItemId;
