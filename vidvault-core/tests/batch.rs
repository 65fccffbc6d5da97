use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use tempfile::TempPath;
use vidvault_core::batch::{REMOTE_OUTPUT_NAME, decoded_name, encoded_name};
use vidvault_core::error::{Result, VaultError};
use vidvault_core::media::raw::{Manifest, Meta, RawBackend, Superblock, VERSION};
use vidvault_core::media::{MediaBackend, StreamInfo};
use vidvault_core::remote::RemoteFetcher;
use vidvault_core::{BatchOptions, DecodeOptions, EncodeParams, run_decode, run_encode};

fn small() -> EncodeParams {
    EncodeParams {
        width: 8,
        height: 8,
        ..Default::default()
    }
}

/// Serves a local container as if it had been downloaded.
struct LocalFetcher {
    source: PathBuf,
    handed_out: Mutex<Option<PathBuf>>,
}

impl RemoteFetcher for LocalFetcher {
    fn fetch(&self, _url: &str) -> Result<TempPath> {
        let tmp = tempfile::NamedTempFile::new()?;
        fs::copy(&self.source, tmp.path())?;
        let path = tmp.into_temp_path();
        *self.handed_out.lock().unwrap() = Some(path.to_path_buf());
        Ok(path)
    }
}

struct FailingFetcher;

impl RemoteFetcher for FailingFetcher {
    fn fetch(&self, url: &str) -> Result<TempPath> {
        Err(VaultError::Remote(format!("no formats for {url}")))
    }
}

#[test]
fn directory_encode_then_decode() {
    let src = tempfile::tempdir().unwrap();
    let enc = tempfile::tempdir().unwrap();
    let dec = tempfile::tempdir().unwrap();
    fs::write(src.path().join("a.txt"), b"alpha").unwrap();
    fs::write(src.path().join("b.txt"), b"bravo bravo").unwrap();
    fs::create_dir(src.path().join("nested")).unwrap();

    let backend = RawBackend::new(true);
    let opts = BatchOptions {
        sorted: true,
        ..Default::default()
    };
    let report = run_encode(src.path(), enc.path(), &small(), &opts, &backend).unwrap();
    assert_eq!(report.succeeded.len(), 2);
    assert!(report.is_clean());
    assert!(enc.path().join("a.txt.vvr").exists());
    assert!(!enc.path().join("nested.vvr").exists());

    // Non-container entries are ignored on decode.
    fs::write(enc.path().join("notes.md"), b"ignore me").unwrap();
    let enc_dir = enc.path().to_str().unwrap();
    let report = run_decode(
        enc_dir,
        dec.path(),
        &DecodeOptions::default(),
        &opts,
        &backend,
        &FailingFetcher,
    )
    .unwrap();
    assert_eq!(report.total(), 2);
    assert_eq!(fs::read(dec.path().join("a.txt.decoded")).unwrap(), b"alpha");
    assert_eq!(
        fs::read(dec.path().join("b.txt.decoded")).unwrap(),
        b"bravo bravo"
    );
}

#[cfg(unix)]
#[test]
fn unreadable_entry_does_not_stop_the_batch() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    for n in ["one", "two", "three"] {
        fs::write(src.path().join(n), n).unwrap();
    }
    std::os::unix::fs::symlink(src.path().join("missing"), src.path().join("broken")).unwrap();

    let backend = RawBackend::new(true);
    let report = run_encode(
        src.path(),
        out.path(),
        &small(),
        &BatchOptions::default(),
        &backend,
    )
    .unwrap();
    assert_eq!(report.succeeded.len(), 3);
    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].0.ends_with("broken"));
}

/// A container whose manifest claims a frame size no machine can address.
fn write_oversized_container(path: &std::path::Path) {
    let manifest = Manifest {
        stream: StreamInfo {
            width: u32::MAX,
            height: u32::MAX,
            fps: 30,
            mode: None,
            payload_len: None,
        },
        meta: Meta::default(),
    };
    let mut body = Vec::new();
    ciborium::ser::into_writer(&manifest, &mut body).unwrap();
    let mut bytes = Vec::new();
    Superblock {
        version: VERSION,
        manifest_len: body.len() as u64,
        frame_count: 1,
    }
    .write_to(&mut bytes)
    .unwrap();
    bytes.extend(body);
    fs::write(path, bytes).unwrap();
}

#[test]
fn corrupt_container_is_skipped_in_directory_decode() {
    let src = tempfile::tempdir().unwrap();
    let enc = tempfile::tempdir().unwrap();
    let dec = tempfile::tempdir().unwrap();
    let input = src.path().join("good.bin");
    fs::write(&input, b"still here").unwrap();

    let backend = RawBackend::new(true);
    let opts = BatchOptions {
        sorted: true,
        ..Default::default()
    };
    run_encode(&input, enc.path(), &small(), &opts, &backend).unwrap();
    write_oversized_container(&enc.path().join("bad.vvr"));

    let report = run_decode(
        enc.path().to_str().unwrap(),
        dec.path(),
        &DecodeOptions::default(),
        &opts,
        &backend,
        &FailingFetcher,
    )
    .unwrap();
    assert_eq!(report.succeeded.len(), 1);
    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].0.ends_with("bad.vvr"));
    assert_eq!(
        fs::read(dec.path().join("good.bin.decoded")).unwrap(),
        b"still here"
    );
}

#[test]
fn single_file_failure_is_fatal() {
    let out = tempfile::tempdir().unwrap();
    let missing = out.path().join("missing.bin");
    let backend = RawBackend::default();
    let err = run_encode(
        &missing,
        out.path(),
        &small(),
        &BatchOptions::default(),
        &backend,
    );
    assert!(err.is_err());
}

#[test]
fn output_directory_is_created() {
    let src = tempfile::tempdir().unwrap();
    let input = src.path().join("x.bin");
    fs::write(&input, b"x").unwrap();
    let out = src.path().join("deep").join("out");

    let backend = RawBackend::new(true);
    run_encode(&input, &out, &small(), &BatchOptions::default(), &backend).unwrap();
    assert!(out.join(encoded_name(&input, backend.extension())).exists());
}

#[test]
fn remote_decode_removes_download() {
    let work = tempfile::tempdir().unwrap();
    let input = work.path().join("clip.bin");
    let container = work.path().join("clip.bin.vvr");
    fs::write(&input, b"remote payload").unwrap();
    let backend = RawBackend::new(true);
    run_encode(&input, work.path(), &small(), &BatchOptions::default(), &backend).unwrap();
    assert!(container.exists());

    let fetcher = LocalFetcher {
        source: container.clone(),
        handed_out: Mutex::new(None),
    };
    let out = work.path().join("out");
    let report = run_decode(
        "https://example.com/watch?v=abc",
        &out,
        &DecodeOptions::default(),
        &BatchOptions::default(),
        &backend,
        &fetcher,
    )
    .unwrap();
    assert_eq!(report.succeeded.len(), 1);
    assert_eq!(
        fs::read(out.join(REMOTE_OUTPUT_NAME)).unwrap(),
        b"remote payload"
    );
    let downloaded = fetcher.handed_out.lock().unwrap().clone().unwrap();
    assert!(!downloaded.exists());
    assert_eq!(
        decoded_name(&container, backend.extension()),
        std::ffi::OsString::from("clip.bin.decoded")
    );
}

#[test]
fn remote_fetch_failure_is_fatal() {
    let out = tempfile::tempdir().unwrap();
    let err = run_decode(
        "http://example.com/video",
        out.path(),
        &DecodeOptions::default(),
        &BatchOptions::default(),
        &RawBackend::default(),
        &FailingFetcher,
    )
    .unwrap_err();
    assert!(matches!(err, VaultError::Remote(_)));
}
