use jobtrack_data::DataError;

/// Extension trait for converting `sqlx::Error` into `DataError`.
///
/// Due to Rust's orphan rules, we can't implement `From<sqlx::Error> for DataError`
/// in this crate. Instead, use `.into_data_error()`.
pub trait SqlxErrorExt {
    fn into_data_error(self) -> DataError;
}

impl SqlxErrorExt for sqlx::Error {
    fn into_data_error(self) -> DataError {
        match &self {
            sqlx::Error::RowNotFound => DataError::does_not_exist("row", None::<String>),
            sqlx::Error::Database(db) if db.is_unique_violation() => DataError::AlreadyExists {
                key: "id".to_string(),
                value: db.message().to_string(),
            },
            _ => DataError::database(self),
        }
    }
}
