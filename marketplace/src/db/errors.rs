use thiserror::Error;

/// Errors raised by the repository layer.
///
/// Constraint violations are lifted out of `sqlx::Error` so that handlers can
/// turn them into meaningful HTTP responses instead of generic 500s.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Entity not found")]
    NotFound,

    #[error("Unique constraint violated: {constraint:?} on {table:?}")]
    UniqueViolation {
        constraint: Option<String>,
        table: Option<String>,
        message: String,
    },

    #[error("Foreign key constraint violated: {constraint:?} on {table:?}")]
    ForeignKeyViolation {
        constraint: Option<String>,
        table: Option<String>,
        message: String,
    },

    #[error("Check constraint violated: {constraint:?} on {table:?}")]
    CheckViolation {
        constraint: Option<String>,
        table: Option<String>,
        message: String,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::RowNotFound = err {
            return DbError::NotFound;
        }

        if let Some(db_err) = err.as_database_error() {
            let constraint = db_err.constraint().map(str::to_owned);
            let table = db_err.table().map(str::to_owned);
            let message = db_err.message().to_owned();

            match db_err.code().as_deref() {
                Some("23505") => {
                    return DbError::UniqueViolation {
                        constraint,
                        table,
                        message,
                    }
                }
                Some("23503") => {
                    return DbError::ForeignKeyViolation {
                        constraint,
                        table,
                        message,
                    }
                }
                Some("23514") => {
                    return DbError::CheckViolation {
                        constraint,
                        table,
                        message,
                    }
                }
                _ => {}
            }
        }

        DbError::Other(err.into())
    }
}

impl DbError {
    /// True when a unique constraint with the given name was violated.
    pub fn is_unique_violation_on(&self, name: &str) -> bool {
        matches!(self, DbError::UniqueViolation { constraint: Some(c), .. } if c == name)
    }

    /// True when a check constraint with the given name was violated.
    pub fn is_check_violation_on(&self, name: &str) -> bool {
        matches!(self, DbError::CheckViolation { constraint: Some(c), .. } if c == name)
    }
}

/// Name Postgres gives the ledger's non-negative balance CHECK
pub const NEGATIVE_BALANCE_CONSTRAINT: &str = "credits_transactions_balance_after_check";

pub type Result<T> = std::result::Result<T, DbError>;
