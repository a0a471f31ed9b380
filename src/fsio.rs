//! Whole-file read and replace helpers shared by both stores.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;

use log::debug;
use tempfile::NamedTempFile;

use crate::error::{Error, Result};

/// Read the whole file. `Ok(None)` when it does not exist.
pub fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::io(path, e)),
    }
}

/// Read the whole file, treating a missing file as an error.
pub fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| Error::io(path, e))
}

/// Replace the file contents through a temp file in the same directory,
/// fsynced and renamed over the target. Existing permissions are kept.
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| Error::io(dir, e))?;
    tmp.write_all(content.as_bytes())
        .map_err(|e| Error::io(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| Error::io(tmp.path(), e))?;

    if let Ok(meta) = fs::metadata(path) {
        fs::set_permissions(tmp.path(), meta.permissions())
            .map_err(|e| Error::io(tmp.path(), e))?;
    }

    tmp.persist(path).map_err(|e| Error::io(path, e.error))?;
    debug!("Wrote {} bytes to {:?}", content.len(), path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_reads_as_none() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.conf");
        assert!(read_optional(&path).unwrap().is_none());
        assert!(read(&path).unwrap_err().is_io());
    }

    #[test]
    fn write_atomic_replaces_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dhcpd.conf");
        fs::write(&path, "old contents\n").unwrap();

        write_atomic(&path, "new contents\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "new contents\n");
        let leftovers = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[cfg(unix)]
    #[test]
    fn write_atomic_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("isc-dhcp-server");
        fs::write(&path, "x\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).unwrap();

        write_atomic(&path, "y\n").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
    }
}
