//! Purpose: Define the stable public Rust API boundary for pushgate.
//! Exports: Envelope parsing types and the shared error model.
//! Role: Public, additive-only surface; hides internal module layout.
//! Invariants: This module is the only public path to the parsing core.

#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::criteria::SendCriteria;
pub use crate::core::envelope::{MessageEnvelope, RESERVED_PAYLOAD_KEYS};
pub use crate::core::error::{Error, ErrorKind};
