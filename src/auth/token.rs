//! Token secrets and the credential pair they form.

pub mod pair;
pub mod secret;
