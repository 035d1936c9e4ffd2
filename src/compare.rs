use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

/// Outcome of comparing a candidate with the file already at its target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Identical,
    Different,
}

/// Compute Blake3 hash of entire file contents
pub fn full_hash_file(path: &Path) -> io::Result<blake3::Hash> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut buffer = vec![0u8; 64 * 1024];

    let mut hasher = blake3::Hasher::new();

    // Read in chunks
    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.finalize())
}

/// Compare two files by size, then by full content hash.
pub fn compare_files(existing: &Path, candidate: &Path) -> io::Result<Comparison> {
    compare_with(existing, candidate, full_hash_file)
}

/// Generic comparison with an injectable hash function.
///
/// Files of different sizes are never hashed.
pub fn compare_with<F>(existing: &Path, candidate: &Path, hash_fn: F) -> io::Result<Comparison>
where
    F: Fn(&Path) -> io::Result<blake3::Hash>,
{
    let existing_size = fs::metadata(existing)?.len();
    let candidate_size = fs::metadata(candidate)?.len();
    if existing_size != candidate_size {
        return Ok(Comparison::Different);
    }

    tracing::debug!(
        "{} and {} have the same size, comparing checksums",
        existing.display(),
        candidate.display()
    );

    if hash_fn(existing)? == hash_fn(candidate)? {
        Ok(Comparison::Identical)
    } else {
        Ok(Comparison::Different)
    }
}

/// Find a free `name(n).ext` path inside `folder`.
///
/// `name` is the complete file name, so `photo.jpg` becomes `photo.jpg(1).jpg`.
pub fn duplicate_file_name(file_name: &OsStr, folder: &Path) -> PathBuf {
    let name = file_name.to_string_lossy();
    let extension = Path::new(file_name)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    let mut copy_count: u32 = 1;
    loop {
        let candidate = folder.join(format!("{name}({copy_count}){extension}"));
        if !candidate.exists() {
            return candidate;
        }
        copy_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::io::Write;
    use tempfile::TempDir;

    fn create_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(content).unwrap();
        path
    }

    #[test]
    fn test_full_hash_identical_files() {
        let temp = TempDir::new().unwrap();
        let content = b"test content for full hash";

        let path1 = create_file(temp.path(), "file1.txt", content);
        let path2 = create_file(temp.path(), "file2.txt", content);

        assert_eq!(
            full_hash_file(&path1).unwrap(),
            full_hash_file(&path2).unwrap()
        );
    }

    #[test]
    fn test_full_hash_nonexistent_file() {
        assert!(full_hash_file(Path::new("/nonexistent/file.jpg")).is_err());
    }

    #[test]
    fn test_different_sizes_skip_hashing() {
        let temp = TempDir::new().unwrap();
        let path1 = create_file(temp.path(), "a.jpg", b"short");
        let path2 = create_file(temp.path(), "b.jpg", b"a bit longer");

        let calls = Cell::new(0);
        let result = compare_with(&path1, &path2, |p| {
            calls.set(calls.get() + 1);
            full_hash_file(p)
        })
        .unwrap();

        assert_eq!(result, Comparison::Different);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_same_size_different_content() {
        let temp = TempDir::new().unwrap();

        // Same length, differ only near the end
        let mut content1 = vec![b'X'; 100 * 1024];
        let mut content2 = content1.clone();
        content1[90 * 1024] = b'A';
        content2[90 * 1024] = b'B';

        let path1 = create_file(temp.path(), "a.jpg", &content1);
        let path2 = create_file(temp.path(), "b.jpg", &content2);

        let calls = Cell::new(0);
        let result = compare_with(&path1, &path2, |p| {
            calls.set(calls.get() + 1);
            full_hash_file(p)
        })
        .unwrap();

        assert_eq!(result, Comparison::Different);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_copies_are_identical() {
        let temp = TempDir::new().unwrap();
        let content: Vec<u8> = (0..100 * 1024).map(|i| (i % 256) as u8).collect();

        let path1 = create_file(temp.path(), "a.jpg", &content);
        let path2 = create_file(temp.path(), "b.jpg", &content);

        assert_eq!(
            compare_files(&path1, &path2).unwrap(),
            Comparison::Identical
        );
    }

    #[test]
    fn test_empty_files_are_identical() {
        let temp = TempDir::new().unwrap();
        let path1 = create_file(temp.path(), "a.jpg", b"");
        let path2 = create_file(temp.path(), "b.jpg", b"");

        assert_eq!(
            compare_files(&path1, &path2).unwrap(),
            Comparison::Identical
        );
    }

    #[test]
    fn test_compare_missing_file_is_error() {
        let temp = TempDir::new().unwrap();
        let path1 = create_file(temp.path(), "a.jpg", b"content");

        assert!(compare_files(&path1, &temp.path().join("gone.jpg")).is_err());
    }

    #[test]
    fn test_duplicate_name_starts_at_one() {
        let temp = TempDir::new().unwrap();
        create_file(temp.path(), "photo.jpg", b"x");

        let name = duplicate_file_name(OsStr::new("photo.jpg"), temp.path());
        assert_eq!(name, temp.path().join("photo.jpg(1).jpg"));
    }

    #[test]
    fn test_duplicate_name_skips_taken_names() {
        let temp = TempDir::new().unwrap();
        create_file(temp.path(), "photo.jpg", b"x");
        create_file(temp.path(), "photo.jpg(1).jpg", b"y");

        let name = duplicate_file_name(OsStr::new("photo.jpg"), temp.path());
        assert_eq!(name, temp.path().join("photo.jpg(2).jpg"));
    }

    #[test]
    fn test_duplicate_name_without_extension() {
        let temp = TempDir::new().unwrap();

        let name = duplicate_file_name(OsStr::new("README"), temp.path());
        assert_eq!(name, temp.path().join("README(1)"));
    }

    #[test]
    fn test_duplicate_name_in_missing_folder() {
        let temp = TempDir::new().unwrap();
        let folder = temp.path().join("ms-duplicates");

        let name = duplicate_file_name(OsStr::new("clip.mov"), &folder);
        assert_eq!(name, folder.join("clip.mov(1).mov"));
    }
}
