use tabula_core::TabulaError;
use thiserror::Error;

pub type SyncResult<T> = Result<T, SyncError>;

/// Errors surfaced by the table service
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Table service has shut down")]
    ServiceClosed,

    #[error(transparent)]
    Table(#[from] TabulaError),
}
