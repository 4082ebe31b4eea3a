//! Authentication middleware for the Gatehouse API server.

pub mod extractor;
pub mod jwt;
pub mod layer;
pub mod types;

pub use extractor::{Auth, MaybeAuth};
pub use jwt::{decode_token, encode_token};
pub use layer::{AuthLayer, AuthMiddleware, ACCESS_TOKEN_COOKIE};
pub use types::{AuthUser, Claims};
