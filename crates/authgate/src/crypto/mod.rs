pub mod claims;
pub mod random;
