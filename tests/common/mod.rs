#![allow(dead_code)]

use assert_cmd::cargo;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Seconds between 1904-01-01 and 1970-01-01
const QUICKTIME_EPOCH_OFFSET: u64 = 2_082_844_800;

pub fn mediasort() -> assert_cmd::Command {
    assert_cmd::Command::new(cargo::cargo_bin!("mediasort"))
}

/// Run a sort with a private log directory and return the parsed JSON report.
pub fn sort_json(log_dir: &Path, args: &[&str]) -> serde_json::Value {
    let output = mediasort()
        .args(args)
        .arg("--log-dir")
        .arg(log_dir)
        .args(["--format", "json", "--no-progress"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    serde_json::from_slice(&output).expect("Invalid JSON output")
}

pub fn create_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

/// Relative path -> contents (None for directories) of everything below `root`
pub fn snapshot(root: &Path) -> BTreeMap<PathBuf, Option<Vec<u8>>> {
    let mut out = BTreeMap::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            let relative = path.strip_prefix(root).unwrap().to_path_buf();
            if path.is_dir() {
                out.insert(relative, None);
                stack.push(path);
            } else {
                out.insert(relative, Some(fs::read(&path).unwrap()));
            }
        }
    }
    out
}

fn ascii(s: &str) -> Vec<u8> {
    let mut bytes = s.as_bytes().to_vec();
    bytes.push(0);
    bytes
}

/// Append a little-endian IFD at the end of `out`. Returns the IFD offset.
fn write_ifd(out: &mut Vec<u8>, entries: &[(u16, u16, Vec<u8>)]) -> usize {
    let ifd_start = out.len();
    let data_start = ifd_start + 2 + entries.len() * 12 + 4;
    let mut data = Vec::new();

    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    for (tag, kind, bytes) in entries {
        let count = if *kind == 4 { bytes.len() / 4 } else { bytes.len() };
        out.extend_from_slice(&tag.to_le_bytes());
        out.extend_from_slice(&kind.to_le_bytes());
        out.extend_from_slice(&(count as u32).to_le_bytes());
        if bytes.len() <= 4 {
            let mut inline = bytes.clone();
            inline.resize(4, 0);
            out.extend_from_slice(&inline);
        } else {
            let offset = (data_start + data.len()) as u32;
            out.extend_from_slice(&offset.to_le_bytes());
            data.extend_from_slice(bytes);
            if data.len() % 2 == 1 {
                data.push(0);
            }
        }
    }
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&data);
    ifd_start
}

/// Minimal JPEG with an EXIF DateTimeOriginal (`YYYY:MM:DD HH:MM:SS`) and optional camera.
///
/// `padding` ends up after the EXIF block so files with the same date can differ.
pub fn exif_jpeg(original: &str, camera: Option<(&str, &str)>, padding: &[u8]) -> Vec<u8> {
    let mut tiff = b"II\x2a\x00\x08\x00\x00\x00".to_vec();

    let mut ifd0 = Vec::new();
    if let Some((make, model)) = camera {
        ifd0.push((0x010f, 2, ascii(make)));
        ifd0.push((0x0110, 2, ascii(model)));
    }
    ifd0.push((0x8769, 4, 0u32.to_le_bytes().to_vec()));
    let ifd0_start = write_ifd(&mut tiff, &ifd0);

    let exif_ifd = tiff.len() as u32;
    let pointer = ifd0_start + 2 + (ifd0.len() - 1) * 12 + 8;
    tiff[pointer..pointer + 4].copy_from_slice(&exif_ifd.to_le_bytes());
    write_ifd(&mut tiff, &[(0x9003, 2, ascii(original))]);

    let mut jpeg = vec![0xff, 0xd8, 0xff, 0xe1];
    jpeg.extend_from_slice(&((tiff.len() + 8) as u16).to_be_bytes());
    jpeg.extend_from_slice(b"Exif\0\0");
    jpeg.extend_from_slice(&tiff);
    jpeg.extend_from_slice(&[0xff, 0xd9]);
    jpeg.extend_from_slice(padding);
    jpeg
}

fn atom(kind: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = ((payload.len() + 8) as u32).to_be_bytes().to_vec();
    out.extend_from_slice(kind);
    out.extend_from_slice(payload);
    out
}

/// Minimal QuickTime movie whose header says it was created at `unix_secs` (UTC).
pub fn quicktime_movie(unix_secs: u64) -> Vec<u8> {
    let mut mvhd = vec![0u8; 100];
    let created = (unix_secs + QUICKTIME_EPOCH_OFFSET) as u32;
    mvhd[4..8].copy_from_slice(&created.to_be_bytes());

    [
        atom(b"ftyp", b"qt  \0\0\0\0qt  "),
        atom(b"moov", &atom(b"mvhd", &mvhd)),
        atom(b"mdat", b"frames"),
    ]
    .concat()
}

/// Log files a run left in `log_dir`
pub fn log_files(log_dir: &Path) -> Vec<PathBuf> {
    fs::read_dir(log_dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| {
            let name = path.file_name().unwrap().to_string_lossy();
            name.starts_with("mediasort-") && name.ends_with(".log")
        })
        .collect()
}
