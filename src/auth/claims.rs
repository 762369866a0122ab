use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::role::Role;

/// JWT payload: which account, on which side of the marketplace, until when.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,    // account ID
    pub role: Role,   // mentor or mentee store
    pub iat: usize,   // issued at (unix timestamp)
    pub exp: usize,   // expires at (unix timestamp)
    pub iss: String,  // issuer
    pub aud: String,  // audience
}
