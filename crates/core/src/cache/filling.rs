//! How full the volume hosting the cache file is.

use std::io;
use std::path::Path;

use super::connection::SqliteBackend;
use crate::Error;

impl SqliteBackend {
    /// Used space on the volume holding the database file, as 0..=100.
    ///
    /// # Errors
    ///
    /// Returns `Error::FillingUnavailable` for an in-memory backend, when the
    /// volume cannot be queried, or when it reports a total size of zero.
    pub fn get_filling_percentage(&self) -> Result<u8, Error> {
        let path = self
            .path()
            .ok_or_else(|| Error::FillingUnavailable("in-memory cache has no backing volume".into()))?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let (total, free) = volume_space(dir)
            .map_err(|e| Error::FillingUnavailable(format!("cannot stat {}: {e}", dir.display())))?;
        percentage_used(total, free)
            .ok_or_else(|| Error::FillingUnavailable(format!("total space of {} reported as zero", dir.display())))
    }
}

/// Integer percentage of `total` not counted as `free`, or None when
/// `total` is zero.
fn percentage_used(total: u64, free: u64) -> Option<u8> {
    if total == 0 {
        return None;
    }
    let used = u128::from(total.saturating_sub(free));
    let pct = used * 100 / u128::from(total);
    Some(u8::try_from(pct).unwrap_or(100))
}

/// (total bytes, bytes available to unprivileged users) for the volume at `dir`.
#[cfg(unix)]
fn volume_space(dir: &Path) -> io::Result<(u64, u64)> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let c_path =
        CString::new(dir.as_os_str().as_bytes()).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    // SAFETY: `statvfs` is plain old data and is fully written by a successful call.
    let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
    // SAFETY: `c_path` is a valid NUL-terminated string and `stat` is a valid out-pointer.
    let rc = unsafe { libc::statvfs(c_path.as_ptr(), &mut stat) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }

    #[allow(clippy::useless_conversion)]
    let (blocks, available, fragment) = (u64::from(stat.f_blocks), u64::from(stat.f_bavail), u64::from(stat.f_frsize));
    Ok((blocks.saturating_mul(fragment), available.saturating_mul(fragment)))
}

#[cfg(not(unix))]
fn volume_space(_dir: &Path) -> io::Result<(u64, u64)> {
    Err(io::Error::new(io::ErrorKind::Unsupported, "volume statistics are only available on unix"))
}
