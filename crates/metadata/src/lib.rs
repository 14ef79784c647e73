//! The filesystem attribute boundary: the only way the transfer core reads
//! or writes `stat`-level metadata.
//!
//! # Overview
//!
//! Everything upstream of this crate — the Generator deciding whether a
//! file needs a transfer, the Receiver applying final attributes after a
//! rename — goes through [`FileAttributeManager`] rather than touching
//! `std::fs` directly. That keeps the core testable against a fake backend
//! and keeps platform-specific attribute quirks (POSIX permission bits,
//! uid/gid resolution, device/symlink creation) isolated to one place.
//!
//! # Design
//!
//! - [`manager`] defines the capability trait and its error/result types.
//! - [`posix`] implements it for Unix-like systems on top of `rustix` and
//!   `filetime`.
//!
//! # See also
//!
//! The `engine` and `transfer` crates hold a `&dyn FileAttributeManager`
//! rather than depending on this crate's concrete backend, so tests can
//! substitute an in-memory fake.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod manager;
#[cfg(unix)]
pub mod posix;

pub use manager::{AttributeError, FileAttributeManager, FileStat};
#[cfg(unix)]
pub use posix::PosixAttributeManager;
