//! Authentication primitives for the back-office API

pub mod jwt;
pub mod password;

pub use jwt::{JwtClaims, JwtError, JwtValidator, DEFAULT_TOKEN_HOURS};
pub use password::{check_password_policy, hash_password, verify_password, PasswordError};
