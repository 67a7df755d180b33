//! Mapping backend errors onto the classification taxonomy

use driftsync_backend::BackendError;
use driftsync_core::{classify_transfer_error, ErrorKind, SyncErrorInfo};

/// Classifies a typed backend error.
///
/// Typed variants map straight onto their kind; untyped `Io`/`Other`
/// errors fall back to message classification, so an FTP reply line or OS
/// error phrase still lands in the right bucket.
pub fn classify_backend_error(error: &BackendError, file_path: Option<&str>) -> SyncErrorInfo {
    let message = error.to_string();
    match error {
        BackendError::Network(_) => {
            SyncErrorInfo::new(ErrorKind::Network, message, true, file_path)
        }
        BackendError::Auth(_) => SyncErrorInfo::new(ErrorKind::Auth, message, false, file_path),
        BackendError::NotFound(_) => {
            SyncErrorInfo::new(ErrorKind::PathNotFound, message, false, file_path)
        }
        BackendError::PermissionDenied(_) => {
            SyncErrorInfo::new(ErrorKind::PermissionDenied, message, false, file_path)
        }
        BackendError::QuotaExceeded(_) => {
            SyncErrorInfo::new(ErrorKind::QuotaExceeded, message, false, file_path)
        }
        BackendError::RateLimited(_) => {
            SyncErrorInfo::new(ErrorKind::RateLimit, message, true, file_path)
        }
        BackendError::Locked(_) => {
            SyncErrorInfo::new(ErrorKind::FileLocked, message, true, file_path)
        }
        BackendError::Disk(_) => {
            SyncErrorInfo::new(ErrorKind::DiskError, message, false, file_path)
        }
        BackendError::Io(_) | BackendError::Other(_) => {
            classify_transfer_error(&message, file_path)
        }
    }
}
