//! Encrypted, TTL-bounded persistence of authenticated browser cookie sets,
//! keyed by (profile, platform).

pub mod cookie;
pub mod key;
pub mod record;
pub mod store;

pub(crate) mod crypto;

pub use cookie::{Cookie, SameSite};
pub use key::KeyManager;
pub use record::{SessionRecord, SessionStatus};
pub use store::SessionStore;
