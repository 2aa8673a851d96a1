#![doc = include_str!("../README.md")]

pub mod callback;
pub mod crypto;
pub mod engine;
pub mod session;
pub mod verification;

pub use engine::{Resolution, ResolutionEngine};
pub use session::{SessionClaims, SessionHandle};
