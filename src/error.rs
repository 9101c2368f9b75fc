use csv::Error as CsvError;
use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use log::{debug, error};
use mongodb::error::Error as DbError;
use rocket::{
    http::{Status, StatusClass},
    response::{self, Responder},
    serde::json::Json,
    Request, Response,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error("Failed to render report: {0}")]
    Csv(#[from] CsvError),
    #[error("{1}")]
    Status(Status, String),
}

impl Error {
    /// Something with the given description could not be found.
    pub fn not_found(what: String) -> Self {
        Self::Status(Status::NotFound, format!("{what} not found"))
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::Status(Status::BadRequest, message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Status(Status::Forbidden, message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Status(Status::Conflict, message.into())
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::Status(Status::UnprocessableEntity, message.into())
    }

    /// The HTTP status this error maps to.
    pub fn status(&self) -> Status {
        match self {
            Self::Db(_) | Self::Csv(_) => Status::InternalServerError,
            Self::Jwt(err) => match err.kind() {
                JwtErrorKind::ExpiredSignature | JwtErrorKind::ImmatureSignature => {
                    Status::Unauthorized
                }
                _ => Status::BadRequest,
            },
            Self::Status(status, _) => *status,
        }
    }

    /// The message shown to the client. Internal failures are not described
    /// in detail, except for report rendering which surfaces its diagnostic.
    fn public_message(&self) -> String {
        match self {
            Self::Db(_) => "Internal server error".to_string(),
            Self::Jwt(_) => "Invalid authentication token".to_string(),
            Self::Csv(_) | Self::Status(..) => self.to_string(),
        }
    }
}

/// JSON body attached to every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let status = self.status();
        if status.class() == StatusClass::ServerError {
            error!("{self}");
        } else {
            debug!("{self}");
        }
        let body = ErrorBody {
            message: self.public_message(),
        };
        Response::build_from(Json(body).respond_to(req)?)
            .status(status)
            .ok()
    }
}
