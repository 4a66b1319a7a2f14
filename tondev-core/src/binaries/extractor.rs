//! Payload unpacking for downloaded binaries.
//!
//! Zip archives are extracted into a directory; gzip payloads are single
//! files decompressed chunk by chunk while they stream in.

use flate2::write::GzDecoder;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::Result;

// ============================================================================
// ZIP Extraction
// ============================================================================

/// Extracts every entry of a zip archive into `dest_dir`.
///
/// Entries with unsafe paths are skipped. Returns the extracted file paths.
pub fn extract_zip(archive_path: &Path, dest_dir: &Path) -> Result<Vec<PathBuf>> {
    info!(
        "Extracting {} to {}",
        archive_path.display(),
        dest_dir.display()
    );

    fs::create_dir_all(dest_dir)?;

    let file = File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut extracted = Vec::with_capacity(archive.len());

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let entry_path = match entry.enclosed_name() {
            Some(path) => path.to_owned(),
            None => {
                debug!("Skipping unsafe path in zip: {}", entry.name());
                continue;
            }
        };

        let dest_path = dest_dir.join(&entry_path);

        if entry.is_dir() {
            fs::create_dir_all(&dest_path)?;
            continue;
        }

        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut outfile = File::create(&dest_path)?;
        io::copy(&mut entry, &mut outfile)?;

        #[cfg(unix)]
        keep_unix_mode(&dest_path, entry.unix_mode())?;

        extracted.push(dest_path);
    }

    debug!("ZIP extraction complete: {} files", extracted.len());
    Ok(extracted)
}

#[cfg(unix)]
fn keep_unix_mode(path: &Path, mode: Option<u32>) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    if let Some(mode) = mode {
        if mode & 0o111 != 0 {
            fs::set_permissions(path, fs::Permissions::from_mode(mode | 0o755))?;
        }
    }
    Ok(())
}

// ============================================================================
// GZIP Decompression
// ============================================================================

/// Incremental gunzip over an in-memory buffer.
///
/// Compressed bytes go in through [`Gunzip::feed`]; whatever has been
/// decompressed so far comes back out.
pub struct Gunzip {
    decoder: GzDecoder<Vec<u8>>,
}

impl Gunzip {
    pub fn new() -> Self {
        Self {
            decoder: GzDecoder::new(Vec::new()),
        }
    }

    pub fn feed(&mut self, compressed: &[u8]) -> io::Result<Vec<u8>> {
        self.decoder.write_all(compressed)?;
        Ok(std::mem::take(self.decoder.get_mut()))
    }

    /// Flushes whatever the decoder still holds.
    pub fn finish(mut self) -> io::Result<Vec<u8>> {
        self.decoder.try_finish()?;
        Ok(std::mem::take(self.decoder.get_mut()))
    }
}

impl Default for Gunzip {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Permissions
// ============================================================================

/// Sets mode 0755 on a file. No-op on Windows.
#[allow(unused_variables)]
pub fn make_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
        debug!("Set executable permission on {}", path.display());
    }

    Ok(())
}
