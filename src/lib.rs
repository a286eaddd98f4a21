// model = "claude-opus-4-5"
// created = "2026-01-30"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! Pocket - the conflict-free replication core of a local-first document store.
//!
//! Replicas edit independently and converge once they have seen the same
//! operations, in any order and with duplicates. Three layers:
//!
//! - logical clocks (`crdt::primitives::clock`) for causal ordering,
//! - per-field replicated state (`crdt::field`) for registers, counters,
//!   sets and maps,
//! - rich text (`crdt::peritext`) built on an RGA character sequence.
//!
//! # Quick Start
//!
//! ```
//! use pocket_crdt::config::Config;
//! use pocket_crdt::crdt::peritext::PeritextDoc;
//!
//! let mut alice = PeritextDoc::new(&Config::new("alice"));
//! let mut bob = PeritextDoc::new(&Config::new("bob"));
//!
//! alice.insert(0, "Hello");
//! bob.insert(0, "Hi ");
//!
//! // Ship each side's pending operations to the other.
//! for op in alice.flush_ops() {
//!     bob.apply_remote_op(&op);
//! }
//! for op in bob.flush_ops() {
//!     alice.apply_remote_op(&op);
//! }
//!
//! assert_eq!(alice.text(), bob.text());
//! assert_eq!(alice.text(), "Hi Hello");
//! ```
//!
//! Nothing here performs I/O. Shipping operations between peers and
//! persisting them belong to the caller.

pub mod config;
pub mod crdt;
pub mod error;
pub mod log;
pub mod node;
pub mod observe;

pub use error::Error;
pub use error::Result;
