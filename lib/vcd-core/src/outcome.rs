//! Result of a per-cluster detail fetch

use crate::error::FetchError;

/// Either the fetched value or the zero-valued substitute used after a
/// failed fetch, together with the failure that caused it
#[derive(Clone, Debug, PartialEq)]
pub enum DetailOutcome<T> {
    Fetched(T),
    Degraded { value: T, error: FetchError },
}

impl<T: Default> DetailOutcome<T> {
    /// Fold a fetch result into an outcome, substituting `T::default()`
    pub fn from_result(result: Result<T, FetchError>) -> Self {
        match result {
            Ok(value) => DetailOutcome::Fetched(value),
            Err(error) => DetailOutcome::Degraded {
                value: T::default(),
                error,
            },
        }
    }
}

impl<T> DetailOutcome<T> {
    pub fn is_degraded(&self) -> bool {
        matches!(self, DetailOutcome::Degraded { .. })
    }

    pub fn value(&self) -> &T {
        match self {
            DetailOutcome::Fetched(value) => value,
            DetailOutcome::Degraded { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            DetailOutcome::Fetched(value) => value,
            DetailOutcome::Degraded { value, .. } => value,
        }
    }

    pub fn error(&self) -> Option<&FetchError> {
        match self {
            DetailOutcome::Fetched(_) => None,
            DetailOutcome::Degraded { error, .. } => Some(error),
        }
    }
}
