// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! Small building blocks shared by the operation model and the engine.

pub mod clock;
pub mod text;

pub use clock::LamportClock;
