//! Auth-domain identifiers, credentials, sessions, and the credential source contract.

pub mod credential;
pub mod id;
pub mod session;
pub mod source;

pub use credential::*;
pub use id::*;
pub use session::*;
pub use source::*;
