//! Transfer backend capability for driftsync
//!
//! The reconciliation engine never talks to a protocol directly; it drives
//! a [`TransferBackend`] — an opaque capability that can list a remote
//! tree, move bytes in either direction, and create directories. Protocol
//! sessions (FTP, SFTP, S3, WebDAV, managed providers) implement this
//! trait outside the engine. Two implementations ship here:
//!
//! - [`LocalDirBackend`] treats a second local directory as the remote
//!   side, which makes the CLI usable without any server.
//! - [`MemoryBackend`] keeps the remote tree in memory with fault and
//!   latency injection, for tests.

pub mod error;
pub mod local;
pub mod memory;
pub mod traits;

pub use error::{BackendError, BackendResult};
pub use local::{file_checksum, scan_local_tree, LocalDirBackend};
pub use memory::MemoryBackend;
pub use traits::{SpeedLimits, TransferBackend, TransferPacing};
