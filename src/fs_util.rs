use std::fs;
use std::io;
use std::path::Path;

/// Writes `content` to a sibling temp file and renames it over `path`, so
/// readers never observe a partially written file.
pub fn atomic_write(path: &Path, content: &str) -> io::Result<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, content)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}
