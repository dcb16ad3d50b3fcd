//! Gudgeon application layer: ports (ownership boundary traits) and the
//! engine use case that sits behind the wire server.

pub mod ports;
pub mod use_cases;

pub use use_cases::Engine;
