mod helpers;
mod middleware;
mod password;
mod token;

pub use helpers::{extract_bearer, issue_token, validate_token};
pub use middleware::RequireActor;
pub use password::{generate_password, hash_password, verify_password};
pub use token::{MintedToken, TokenGenerator, TokenParts, parse_token};
