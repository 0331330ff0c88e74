//! The stream engine: turns transport readiness events into decoded
//! messages for a [`Session`], and outbound messages into framed bytes.

pub mod engine;
pub mod error;
pub mod session;

pub use engine::{Engine, EngineState};
pub use error::EngineError;
pub use session::Session;
