//! User authentication.
//!
//! Provides:
//! - User records persisted in a flat JSON file, re-read on every lookup
//! - Password hashing (PBKDF2-HMAC-SHA256, per-hash salt, self-describing format)
//! - Session tokens (opaque hex, process memory only, no expiry)
//!
//! ## Design Decisions
//! - Sessions are not persisted: restarting the server logs every user out.
//! - The user file is the single source of truth; nothing is cached.

pub mod password;
pub mod session;
pub mod store;
pub mod user;

pub use password::PasswordHasher;
pub use session::SessionRegistry;
pub use store::{UserStore, UserStoreError};
pub use user::{Profile, Role, User};
