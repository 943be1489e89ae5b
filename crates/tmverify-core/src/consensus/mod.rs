pub mod error;
pub mod signature;
pub mod verifier;

pub use error::*;
pub use signature::*;
pub use verifier::*;
