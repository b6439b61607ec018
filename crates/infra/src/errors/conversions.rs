//! Conversions from external infrastructure errors into domain errors.

use lettre::address::AddressError;
use lettre::error::Error as MessageError;
use lettre::transport::smtp::Error as SmtpError;
use rusqlite::Error as SqlError;
use transitdesk_domain::TransitDeskError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub TransitDeskError);

impl From<InfraError> for TransitDeskError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<TransitDeskError> for InfraError {
    fn from(value: TransitDeskError) -> Self {
        InfraError(value)
    }
}

trait IntoTransitDeskError {
    fn into_transitdesk(self) -> TransitDeskError;
}

fn looks_like_wrong_key(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("not a database") || lower.contains("encrypted")
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → TransitDeskError */
/* -------------------------------------------------------------------------- */

impl IntoTransitDeskError for SqlError {
    fn into_transitdesk(self) -> TransitDeskError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => {
                        TransitDeskError::Database("database is busy".into())
                    }
                    (ErrorCode::DatabaseLocked, _) => {
                        TransitDeskError::Database("database is locked".into())
                    }
                    (ErrorCode::ConstraintViolation, 2067 | 1555) => {
                        TransitDeskError::Database("unique constraint violation".into())
                    }
                    (ErrorCode::ConstraintViolation, 787) => {
                        TransitDeskError::Database("foreign key constraint violation".into())
                    }
                    (ErrorCode::NotADatabase, _) => TransitDeskError::Database(
                        "SQLCipher key rejected or database not encrypted".into(),
                    ),
                    (_, _) if looks_like_wrong_key(&message) => TransitDeskError::Database(
                        "SQLCipher key rejected or database not encrypted".into(),
                    ),
                    _ => TransitDeskError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => {
                TransitDeskError::NotFound("no rows returned by query".into())
            }
            RE::FromSqlConversionFailure(_, _, cause) => {
                TransitDeskError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                TransitDeskError::Database(format!("invalid column type: {ty}"))
            }
            RE::Utf8Error(_) => {
                TransitDeskError::Database("invalid UTF-8 returned from sqlite".into())
            }
            RE::InvalidParameterName(parameter_name) => {
                TransitDeskError::Database(format!("invalid parameter name: {parameter_name}"))
            }
            RE::InvalidPath(path) => TransitDeskError::Database(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            RE::InvalidQuery => TransitDeskError::Database("invalid SQL query".into()),
            other => TransitDeskError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_transitdesk())
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → TransitDeskError */
/* -------------------------------------------------------------------------- */

impl IntoTransitDeskError for r2d2::Error {
    fn into_transitdesk(self) -> TransitDeskError {
        let message = self.to_string();
        if looks_like_wrong_key(&message) {
            TransitDeskError::Database("SQLCipher key rejected or database not encrypted".into())
        } else {
            TransitDeskError::Database(format!("connection pool error: {message}"))
        }
    }
}

impl From<r2d2::Error> for InfraError {
    fn from(value: r2d2::Error) -> Self {
        InfraError(value.into_transitdesk())
    }
}

/* -------------------------------------------------------------------------- */
/* lettre errors → TransitDeskError */
/* -------------------------------------------------------------------------- */

impl IntoTransitDeskError for SmtpError {
    fn into_transitdesk(self) -> TransitDeskError {
        if self.is_timeout() {
            return TransitDeskError::Messaging("SMTP request timed out".into());
        }
        if self.is_permanent() {
            return TransitDeskError::Messaging(format!("SMTP server rejected the mail: {self}"));
        }
        TransitDeskError::Messaging(format!("SMTP delivery failed: {self}"))
    }
}

impl From<SmtpError> for InfraError {
    fn from(value: SmtpError) -> Self {
        InfraError(value.into_transitdesk())
    }
}

impl From<AddressError> for InfraError {
    fn from(value: AddressError) -> Self {
        InfraError(TransitDeskError::Messaging(format!("invalid mail address: {value}")))
    }
}

impl From<MessageError> for InfraError {
    fn from(value: MessageError) -> Self {
        InfraError(TransitDeskError::Messaging(format!("failed to build mail: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use rusqlite::ffi::{Error as FfiError, ErrorCode};
    use rusqlite::Error as SqlError;

    use super::*;

    fn sqlite_failure(code: ErrorCode, extended_code: i32, message: &str) -> SqlError {
        SqlError::SqliteFailure(FfiError { code, extended_code }, Some(message.into()))
    }

    #[test]
    fn sqlite_busy_maps_to_database_error() {
        let err = sqlite_failure(ErrorCode::DatabaseBusy, 5, "database is locked");

        let mapped: TransitDeskError = InfraError::from(err).into();
        match mapped {
            TransitDeskError::Database(msg) => {
                assert!(msg.contains("busy") || msg.contains("locked"));
            }
            other => panic!("expected database error, got {other:?}"),
        }
    }

    #[test]
    fn unique_violation_is_named() {
        let err = sqlite_failure(ErrorCode::ConstraintViolation, 2067, "UNIQUE failed");

        let mapped: TransitDeskError = InfraError::from(err).into();
        assert_eq!(mapped, TransitDeskError::Database("unique constraint violation".into()));
    }

    #[test]
    fn wrong_key_is_detected_from_message() {
        let err = sqlite_failure(ErrorCode::Unknown, 1, "file is not a database");

        let mapped: TransitDeskError = InfraError::from(err).into();
        match mapped {
            TransitDeskError::Database(msg) => assert!(msg.contains("SQLCipher key rejected")),
            other => panic!("expected database error, got {other:?}"),
        }
    }

    #[test]
    fn no_rows_maps_to_not_found() {
        let mapped: TransitDeskError = InfraError::from(SqlError::QueryReturnedNoRows).into();
        assert!(matches!(mapped, TransitDeskError::NotFound(_)));
    }

    #[test]
    fn bad_address_maps_to_messaging_error() {
        let err = "not an address".parse::<lettre::Address>().unwrap_err();

        let mapped: TransitDeskError = InfraError::from(err).into();
        match mapped {
            TransitDeskError::Messaging(msg) => assert!(msg.contains("invalid mail address")),
            other => panic!("expected messaging error, got {other:?}"),
        }
    }
}
