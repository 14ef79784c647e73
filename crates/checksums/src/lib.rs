#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `checksums` provides the rolling and strong checksum primitives used by the
//! delta-transfer engine. The rolling checksum is the Adler-32-style weak
//! checksum (`rsum`) that lets the sender slide a window across a file in
//! O(1) per byte; the strong checksum is a session-seeded MD5 used to confirm
//! a weak-checksum match and to verify whole files end to end.
//!
//! # Design
//!
//! - [`rolling`] implements the weak checksum used for block matching.
//! - [`strong`] exposes the [`strong::StrongDigest`] trait and the
//!   [`strong::Md5`] / [`strong::SeededMd5`] hashers. A session's checksum
//!   seed is mixed in as trailing bytes (`digest(window || seed)`), matching
//!   how the protocol authenticates block matches against a session.
//!
//! # Invariants
//!
//! - `RollingChecksum` truncates both state components to 16 bits after every
//!   update.
//! - Rolling updates reject mismatched slice lengths and empty windows so the
//!   caller never observes silent state corruption.
//! - [`strong::SeededMd5`] appends the seed only once, at `finalize`, so
//!   incremental `update` calls never need to know the seed in advance.
//!
//! # Errors
//!
//! [`RollingError`] reports invalid rolling operations (empty windows, window
//! lengths that overflow `u32`, or mismatched slice lengths).
//!
//! # Examples
//!
//! ```
//! use checksums::RollingChecksum;
//!
//! let mut rolling = RollingChecksum::new();
//! rolling.update(b"abcd");
//! assert_eq!(rolling.len(), 4);
//! rolling.roll(b'a', b'e').unwrap();
//! assert_eq!(rolling.len(), 4);
//! ```
//!
//! ```
//! use checksums::strong::SeededMd5;
//!
//! let seed = 0x1234_5678u32;
//! let mut hasher = SeededMd5::new(seed);
//! hasher.update(b"block bytes");
//! let digest = hasher.finalize();
//! assert_eq!(digest.len(), 16);
//! ```

mod rolling;
pub mod strong;

pub use rolling::{RollingChecksum, RollingError};
