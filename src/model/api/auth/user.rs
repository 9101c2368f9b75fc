use std::fmt::{Display, Formatter};

use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::model::{
    db::{admin::Admin, voter::Voter},
    mongodb::Id,
};

/// Someone who can sign in and be issued an [`AuthToken`](super::AuthToken).
pub trait User {
    /// What a token for this kind of user grants.
    const RIGHTS: Rights;
    /// Shown when a login attempt for this kind of user fails.
    const LOGIN_FAILED: &'static str;

    fn id(&self) -> Id;

    /// What the user signs in with, for logging.
    fn login_name(&self) -> &str;
}

/// Privilege levels. Stored in tokens as a small integer to keep cookies short.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum Rights {
    Voter = 0,
    Admin = 1,
}

impl Rights {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Voter => "voter",
            Self::Admin => "admin",
        }
    }
}

impl Display for Rights {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl User for Voter {
    const RIGHTS: Rights = Rights::Voter;
    const LOGIN_FAILED: &'static str = "Please enter a correct email and password.";

    fn id(&self) -> Id {
        self.id
    }

    fn login_name(&self) -> &str {
        &self.email
    }
}

impl User for Admin {
    const RIGHTS: Rights = Rights::Admin;
    const LOGIN_FAILED: &'static str =
        "No admin found with the provided username and password combination.";

    fn id(&self) -> Id {
        self.id
    }

    fn login_name(&self) -> &str {
        &self.username
    }
}
