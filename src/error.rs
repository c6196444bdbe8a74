/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */
use rocket::http::Status;
use rocket::response::{self, status, Responder};
use rocket::serde::json::Json;
use rocket::Request;
use thiserror::Error;

/// Errors a caller of the merge boundary can observe.
///
/// Storage failures never appear here verbatim; they are logged and folded into
/// `Internal` (or `PartialSuccessDeletionFailed` once the matches are merged).
#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("The function must be called while authenticated.")]
    Unauthenticated {},

    #[error("{message}")]
    InvalidArgument { message: String },

    #[error("Merge verification failed: guest history was not fully migrated. Guest not deleted.")]
    MigrationIncomplete { guest_id: String },

    #[error("History migrated, but failed to permanently delete guest from roster.")]
    PartialSuccessDeletionFailed { updated_matches: usize },

    #[error("Unable to merge guest history.")]
    Internal {},
}

pub type Result<T> = std::result::Result<T, crate::Error>;

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ErrorBody {
    pub status: u16,
    pub code: String,
    pub message: String,
}

impl Error {
    pub fn status(&self) -> Status {
        match self {
            Error::Unauthenticated {} => Status::Unauthorized,
            Error::InvalidArgument { .. } => Status::BadRequest,
            Error::MigrationIncomplete { .. } => Status::Conflict,
            Error::PartialSuccessDeletionFailed { .. } => Status::InternalServerError,
            Error::Internal {} => Status::InternalServerError,
        }
    }

    /// Stable identifier callers branch on; HTTP status alone does not separate the 500s.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Unauthenticated {} => "unauthenticated",
            Error::InvalidArgument { .. } => "invalid-argument",
            Error::MigrationIncomplete { .. } => "data-loss",
            Error::PartialSuccessDeletionFailed { .. } => "deletion-failed",
            Error::Internal {} => "internal",
        }
    }

    pub fn invalid_argument<T>(message: impl Into<String>) -> std::result::Result<T, Error> {
        std::result::Result::Err(Error::InvalidArgument {
            message: message.into(),
        })
    }

    pub fn unauthenticated<T>() -> std::result::Result<T, Error> {
        std::result::Result::Err(Error::Unauthenticated {})
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let status = self.status();
        let body = ErrorBody {
            status: status.code,
            code: self.code().to_owned(),
            message: self.to_string(),
        };
        status::Custom(status, Json(body)).respond_to(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_are_distinguishable() {
        let kinds = vec![
            Error::Unauthenticated {},
            Error::InvalidArgument {
                message: "x".to_owned(),
            },
            Error::MigrationIncomplete {
                guest_id: "g".to_owned(),
            },
            Error::PartialSuccessDeletionFailed { updated_matches: 3 },
            Error::Internal {},
        ];
        let mut codes = kinds.iter().map(Error::code).collect::<Vec<_>>();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), kinds.len());
    }

    #[test]
    fn test_migration_incomplete_is_not_internal() {
        let err = Error::MigrationIncomplete {
            guest_id: "guest_1".to_owned(),
        };
        assert_eq!(err.status(), Status::Conflict);
        assert_ne!(err.code(), Error::Internal {}.code());
    }
}
