//! Quorum Encryption Subsystem
//!
//! Rolling switch of quorum traffic between plain and TLS without losing the
//! majority. Every switch passes through TRANSITIONAL and waits for a
//! unanimous `unified` barrier before reaching the final mode.

mod coordinator;
mod errors;
mod mode;

pub use coordinator::{
    EncryptionCoordinator, EncryptionDelta, EncryptionState, UnitEncryptionAction,
    UnitEncryptionView,
};
pub use errors::{EncryptionError, EncryptionErrorKind, EncryptionResult};
pub use mode::QuorumMode;
