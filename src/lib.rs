// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! Converge - server-side operational transformation for shared text.
//!
//! # Quick Start
//!
//! ```
//! use converge::ot::op::insert;
//! use converge::ot::Engine;
//!
//! let mut engine = Engine::new("");
//!
//! // Two clients type at position 0 against version 0.
//! engine.submit(insert(0, "Hello").unwrap(), "alice", 0).unwrap();
//! let applied = engine.submit(insert(0, "Hi ").unwrap(), "bob", 0).unwrap();
//!
//! // Bob's edit was rebased past Alice's.
//! assert_eq!(applied.version, 2);
//! assert_eq!(engine.content(), "HelloHi ");
//! ```

pub mod config;
pub mod error;
pub mod ot;

pub use config::EngineConfig;
pub use error::Error;
pub use error::ErrorKind;
pub use error::Result;
