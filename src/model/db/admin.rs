use std::ops::{Deref, DerefMut};

use log::{debug, info};
use mongodb::{bson::doc, error::Error as DbError};
use serde::{Deserialize, Serialize};

use crate::model::{
    common::password::{hash_password, verify_password},
    mongodb::{Coll, Id},
};

/// Username of the admin created on first launch.
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";

/// Core admin user data.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminCore {
    pub username: String,
    pub password_hash: String,
}

impl AdminCore {
    /// Create an admin, hashing the given password.
    pub fn new(username: String, password: &str) -> Self {
        Self {
            username,
            password_hash: hash_password(password),
        }
    }

    /// Check whether the given password is correct.
    pub fn verify_password<T: AsRef<[u8]>>(&self, password: T) -> bool {
        verify_password(&self.password_hash, password)
    }
}

/// An admin without an ID.
pub type NewAdmin = AdminCore;

/// An admin user from the database, with its unique ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct Admin {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub admin: AdminCore,
}

impl Deref for Admin {
    type Target = AdminCore;

    fn deref(&self) -> &Self::Target {
        &self.admin
    }
}

impl DerefMut for Admin {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.admin
    }
}

/// If there are no admins at all, create the default one so the system can
/// be bootstrapped.
pub async fn ensure_admin_exists(
    admins: &Coll<NewAdmin>,
    default_password: &str,
) -> Result<(), DbError> {
    debug!("Ensuring at least one admin exists");
    if admins.count_documents(None, None).await? == 0 {
        let admin = NewAdmin::new(DEFAULT_ADMIN_USERNAME.to_string(), default_password);
        admins.insert_one(admin, None).await?;
        info!("Created default admin '{DEFAULT_ADMIN_USERNAME}'");
    }
    Ok(())
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl AdminCore {
        pub fn example() -> Self {
            Self::new("coordinator".to_string(), "coordinator-password")
        }

        pub fn example2() -> Self {
            Self::new("coordinator2".to_string(), "another-password")
        }
    }
}
