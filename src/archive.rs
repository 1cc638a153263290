//! Packaging of downloaded pages into a comic book archive.

use crate::error::ArchiveError;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use zip::CompressionMethod;
use zip::write::FileOptions;

/// Extension of the produced archives (zip container of images).
pub const ARCHIVE_EXTENSION: &str = "cbz";

/// Packs every regular file directly inside `dir` into a zip archive at `dest`.
///
/// Entries are added in file-name order so readers show pages in sequence.
/// The archive is written next to `dest` under a `.part` name and renamed
/// into place once complete, so `dest` never holds a truncated archive.
pub fn pack_directory(dir: &Path, dest: &Path) -> Result<PathBuf, ArchiveError> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    files.sort();

    if files.is_empty() {
        return Err(ArchiveError::EmptyDirectory(dir.to_path_buf()));
    }

    let partial = partial_path(dest);
    if let Err(e) = write_archive(&files, &partial) {
        if let Err(rm) = fs::remove_file(&partial) {
            warn!("could not remove {}: {}", partial.display(), rm);
        }
        return Err(e);
    }
    fs::rename(&partial, dest)?;

    debug!("packed {} files into {}", files.len(), dest.display());
    Ok(dest.to_path_buf())
}

fn write_archive(files: &[PathBuf], out: &Path) -> Result<(), ArchiveError> {
    let file = File::create(out)?;
    let mut zip = zip::ZipWriter::new(file);
    // Images are already compressed
    let options = FileOptions::default().compression_method(CompressionMethod::Stored);

    for path in files {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        zip.start_file(name, options)?;
        let mut source = File::open(path)?;
        io::copy(&mut source, &mut zip)?;
    }

    let mut file = zip.finish()?;
    file.flush()?;
    file.sync_all()?;
    Ok(())
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    #[test]
    fn test_pack_directory_sorted_entries() {
        let temp = TempDir::new().unwrap();
        let pages = temp.path().join("pages");
        fs::create_dir(&pages).unwrap();
        fs::write(pages.join("002.png"), b"second").unwrap();
        fs::write(pages.join("001.png"), b"first").unwrap();
        fs::write(pages.join("010.jpeg"), b"tenth").unwrap();

        let dest = temp.path().join("901 - Storm.cbz");
        let packed = pack_directory(&pages, &dest).unwrap();
        assert_eq!(packed, dest);
        assert!(!partial_path(&dest).exists());

        let mut archive = zip::ZipArchive::new(File::open(&dest).unwrap()).unwrap();
        let names: Vec<String> = archive.file_names().map(str::to_string).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(sorted, vec!["001.png", "002.png", "010.jpeg"]);

        let mut content = String::new();
        archive
            .by_name("001.png")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "first");
    }

    #[test]
    fn test_pack_directory_overwrites_existing_archive() {
        let temp = TempDir::new().unwrap();
        let pages = temp.path().join("pages");
        fs::create_dir(&pages).unwrap();
        fs::write(pages.join("001.png"), b"new").unwrap();

        let dest = temp.path().join("chapter.cbz");
        fs::write(&dest, b"stale").unwrap();

        pack_directory(&pages, &dest).unwrap();
        let archive = zip::ZipArchive::new(File::open(&dest).unwrap()).unwrap();
        assert_eq!(archive.len(), 1);
    }

    #[test]
    fn test_pack_empty_directory_fails() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("empty.cbz");

        let err = pack_directory(temp.path(), &dest).unwrap_err();
        assert!(matches!(err, ArchiveError::EmptyDirectory(_)));
        assert!(!dest.exists());
    }

    #[test]
    fn test_failed_write_leaves_nothing_behind() {
        let temp = TempDir::new().unwrap();
        let pages = temp.path().join("pages");
        fs::create_dir(&pages).unwrap();
        fs::write(pages.join("001.png"), b"page").unwrap();

        let dest = temp.path().join("missing").join("chapter.cbz");
        let err = pack_directory(&pages, &dest).unwrap_err();
        assert!(matches!(err, ArchiveError::Io(_)));
        assert!(!partial_path(&dest).exists());
        assert!(!dest.exists());
    }

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("/a/b/ch.cbz")),
            PathBuf::from("/a/b/ch.cbz.part")
        );
    }
}
