#![doc = include_str!("../README.md")]

pub mod adapter;
pub mod error;
pub mod logger;
pub mod models;
pub mod options;

// Re-exports for convenience
pub use adapter::{Adapter, AdapterResult, SessionAndUser};
pub use error::{AuthError, LinkRejection, Result};
pub use logger::{AuthLogger, LogHandler, LogLevel};
pub use models::{Account, AccountDraft, AccountKind, Profile, Session, User, UserDraft, VerificationToken};
pub use options::{AuthOptions, ProviderOptions, SessionMode, SessionOptions};
