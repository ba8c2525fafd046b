// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! Operational transformation for plain-text documents.

pub mod checkpoint;
pub mod engine;
pub mod history;
pub mod op;
pub mod primitives;
pub mod session;
pub mod transform;

pub use checkpoint::Checkpoint;
pub use engine::Applied;
pub use engine::Engine;
pub use engine::Rejected;
pub use op::apply;
pub use op::compose;
pub use op::invert;
pub use op::DocumentState;
pub use op::Op;
pub use op::OpKind;
pub use op::Operation;
pub use session::Session;
pub use transform::transform;
pub use transform::transform_against_sequence;
