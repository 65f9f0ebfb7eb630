//! Credentials: password hashing and bearer tokens.

pub mod jwt;
pub mod password;

pub use jwt::{Claims, IssuedToken, TokenIssuer};
pub use password::PasswordHasher;
