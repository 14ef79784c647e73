//! Path-safety helpers shared by the generator and receiver loops.
//!
//! A file-list entry's path bytes come from the peer and must never be
//! trusted to stay under the destination root on their own.

use std::ffi::OsString;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Converts raw file-list path bytes into a relative path, rejecting
/// anything that could escape the destination root.
///
/// # Errors
///
/// Returns an error if the path is absolute or any component would climb
/// above the destination root (`.` components are dropped, `..` is refused).
pub fn relative_path_from_bytes(bytes: &[u8]) -> io::Result<PathBuf> {
    let raw = os_string_from_bytes(bytes);
    let candidate = Path::new(&raw);
    if candidate.is_absolute() {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "refusing an absolute file-list path"));
    }

    let mut out = PathBuf::new();
    for component in candidate.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "refusing a file-list path that escapes the destination root",
                ));
            }
        }
    }
    Ok(out)
}

/// Joins `relative` onto `root`, re-checking that the result still lives
/// under `root` (defense in depth alongside [`relative_path_from_bytes`]).
///
/// # Errors
///
/// Returns an error if the joined path does not stay under `root`.
pub fn safe_join(root: &Path, relative: &Path) -> io::Result<PathBuf> {
    let joined = root.join(relative);
    if !joined.starts_with(root) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "refusing a file-list path that escapes the destination root",
        ));
    }
    Ok(joined)
}

#[cfg(unix)]
pub(crate) fn os_string_from_bytes(bytes: &[u8]) -> OsString {
    use std::os::unix::ffi::OsStrExt;
    std::ffi::OsStr::from_bytes(bytes).to_os_string()
}

#[cfg(not(unix))]
pub(crate) fn os_string_from_bytes(bytes: &[u8]) -> OsString {
    String::from_utf8_lossy(bytes).into_owned().into()
}

#[cfg(unix)]
pub(crate) fn bytes_of(os: &std::ffi::OsStr) -> &[u8] {
    use std::os::unix::ffi::OsStrExt;
    os.as_bytes()
}

#[cfg(not(unix))]
pub(crate) fn bytes_of(os: &std::ffi::OsStr) -> Vec<u8> {
    os.to_string_lossy().into_owned().into_bytes()
}
