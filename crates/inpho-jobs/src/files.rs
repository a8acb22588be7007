//! Atomic replacement of pipeline files.

use std::io::{BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use inpho_core::{Error, Result};

/// Write `lines` to `path`, newline-terminated, replacing it atomically.
///
/// The content goes to a temporary file in the same directory which is
/// renamed over `path` once complete; readers never see a partial file.
pub fn write_lines_atomic<I, S>(path: &Path, lines: I) -> Result<usize>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let tmp = NamedTempFile::new_in(dir)?;
    let mut count = 0;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        for line in lines {
            writer.write_all(line.as_ref().as_bytes())?;
            writer.write_all(b"\n")?;
            count += 1;
        }
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .map_err(|e| Error::Io(e.error))?;
    Ok(count)
}
