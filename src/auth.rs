//! Auth-domain identifiers, token models, and expiry evaluation.

pub mod expiry;
pub mod id;
pub mod token;

pub use expiry::*;
pub use id::*;
pub use token::{pair::*, secret::*};
