//! CWAI Protocol - Core types and wire definitions
//!
//! Static ecosystem/species catalogs, the validated analysis query, and the
//! JSON shapes exchanged with the Climate & Wildlife AI backend.

pub mod catalog;
pub mod constants;
pub mod types;
pub mod wire;

pub use catalog::*;
pub use constants::*;
pub use types::*;
pub use wire::*;
