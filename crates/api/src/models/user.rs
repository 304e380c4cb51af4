//! Authenticated caller identity.

use serde::{Deserialize, Serialize};

use tindahan_core::UserId;

/// The caller identity carried by a verified bearer token.
///
/// Users are created by the authentication service; this API only ever sees
/// the id and email encoded in the credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: String,
}
