use serde::{Deserialize, Serialize};

use crate::model::{common::password::MIN_PASSWORD_LENGTH, db::admin::NewAdmin};

/// Raw admin credentials, received from a user. These are never stored directly,
/// since the password is in plaintext.
#[derive(Clone, Deserialize, Serialize)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

impl TryFrom<AdminCredentials> for NewAdmin {
    type Error = ();

    /// Convert [`AdminCredentials`] to a new admin by hashing the password.
    /// This enforces that the username is non-empty, and the password meets minimum length.
    fn try_from(cred: AdminCredentials) -> Result<Self, Self::Error> {
        if cred.username.is_empty() || cred.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(());
        }
        Ok(Self::new(cred.username, &cred.password))
    }
}
