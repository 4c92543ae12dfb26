//! Conversions from external error types into `StrataError`.

use figment::Error as FigmentError;

use super::StrataError;

impl From<FigmentError> for StrataError {
    fn from(e: FigmentError) -> Self {
        Self::Settings(Box::new(e))
    }
}
