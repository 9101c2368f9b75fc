use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::model::{api::id::ApiId, db::voter::Voter};

pub const NATIONAL_ID_LENGTH: usize = 11;

/// A self-registration request from a prospective voter.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct VoterRegistration {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[validate(custom(function = "validate_national_id"))]
    pub national_id: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters long."))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords don't match."))]
    pub password_confirmation: String,
}

impl VoterRegistration {
    /// Every problem with the registration, in form order, so they can all be
    /// shown at once.
    pub fn problems(&self) -> Result<(), Vec<String>> {
        let errors = match self.validate() {
            Ok(()) => return Ok(()),
            Err(errors) => errors,
        };
        let field_errors = errors.field_errors();
        let problems = ["email", "national_id", "password", "password_confirmation"]
            .into_iter()
            .filter_map(|field| field_errors.get(field))
            .flat_map(|errors| errors.iter())
            .filter_map(|error| error.message.as_ref().map(ToString::to_string))
            .collect();
        Err(problems)
    }
}

fn validate_national_id(national_id: &str) -> Result<(), ValidationError> {
    if national_id.chars().count() == NATIONAL_ID_LENGTH
        && national_id.chars().all(|c| c.is_ascii_digit())
    {
        Ok(())
    } else {
        Err(ValidationError::new("national_id").with_message(Cow::Owned(format!(
            "National ID number must be exactly {NATIONAL_ID_LENGTH} digits."
        ))))
    }
}

/// Voter login credentials.
#[derive(Clone, Deserialize, Serialize)]
pub struct VoterCredentials {
    pub email: String,
    pub password: String,
}

/// A voter as shown to admins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterDescription {
    pub id: ApiId,
    pub email: String,
    pub groups: Vec<ApiId>,
}

impl From<Voter> for VoterDescription {
    fn from(voter: Voter) -> Self {
        let mut groups: Vec<ApiId> = voter.groups.iter().copied().map(ApiId::from).collect();
        groups.sort();
        Self {
            id: voter.id.into(),
            email: voter.voter.email,
            groups,
        }
    }
}
