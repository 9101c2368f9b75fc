use std::collections::HashSet;
use std::ops::{Deref, DerefMut};

use data_encoding::HEXLOWER;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::{
    config::Config,
    model::{
        api::voter::VoterRegistration,
        common::password::{hash_password, verify_password},
        mongodb::Id,
    },
};

pub type HmacSha256 = Hmac<Sha256>;

/// Core voter data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterCore {
    /// Login email, unique across voters.
    pub email: String,
    pub password_hash: String,
    /// HMAC of the national ID number; the number itself is never stored.
    pub national_id_hmac: String,
    /// IDs of the groups this voter is a member of.
    pub groups: HashSet<Id>,
}

impl VoterCore {
    /// Create a new voter with no group memberships.
    /// The registration must already have been validated.
    pub fn new(registration: VoterRegistration, config: &Config) -> Self {
        Self {
            email: registration.email,
            password_hash: hash_password(&registration.password),
            national_id_hmac: national_id_hmac(&registration.national_id, config),
            groups: HashSet::new(),
        }
    }

    /// Check whether the given password is correct.
    pub fn verify_password<T: AsRef<[u8]>>(&self, password: T) -> bool {
        verify_password(&self.password_hash, password)
    }
}

/// Keyed digest of a national ID number, hex-encoded.
pub fn national_id_hmac(national_id: &str, config: &Config) -> String {
    let mut mac =
        HmacSha256::new_from_slice(config.hmac_secret()).expect("HMAC accepts keys of any size");
    mac.update(national_id.as_bytes());
    HEXLOWER.encode(&mac.finalize().into_bytes())
}

/// A voter without an ID.
pub type NewVoter = VoterCore;

/// A voter from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Voter {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub voter: VoterCore,
}

impl Deref for Voter {
    type Target = VoterCore;

    fn deref(&self) -> &Self::Target {
        &self.voter
    }
}

impl DerefMut for Voter {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.voter
    }
}
