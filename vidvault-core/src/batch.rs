use crate::domain::{BatchReport, JobKind, JobOutcome, TranscodeJob};
use crate::error::Result;
use crate::media::MediaBackend;
use crate::params::{BatchOptions, DecodeOptions, EncodeParams};
use crate::remote::{RemoteFetcher, is_remote};
use crate::transcode::{decode_file, run_job};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

pub const DECODED_EXTENSION: &str = "decoded";
/// Output file name for a decode whose source is a remote locator.
pub const REMOTE_OUTPUT_NAME: &str = "remote.decoded";

fn file_name(input: &Path) -> OsString {
    input
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| input.as_os_str().to_os_string())
}

/// `name.ext` -> `name.ext.<container_ext>`
pub fn encoded_name(input: &Path, container_ext: &str) -> OsString {
    let mut name = file_name(input);
    name.push(".");
    name.push(container_ext);
    name
}

/// `name.<container_ext>` -> `name.decoded`; other names just gain `.decoded`.
pub fn decoded_name(input: &Path, container_ext: &str) -> OsString {
    let name = file_name(input);
    let suffix = format!(".{container_ext}");
    let stem = match name.to_str() {
        Some(s) => OsString::from(s.strip_suffix(&suffix).unwrap_or(s)),
        None => name,
    };
    let mut out = stem;
    out.push(".");
    out.push(DECODED_EXTENSION);
    out
}

/// Direct, non-directory entries of `dir`. Listing order unless `sorted`.
fn list_entries(dir: &Path, sorted: bool) -> Result<Vec<PathBuf>> {
    let mut walker = WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(false);
    if sorted {
        walker = walker.sort_by_file_name();
    }
    let mut out = Vec::new();
    for e in walker {
        let e = e.map_err(std::io::Error::other)?;
        if e.file_type().is_dir() {
            continue; // Skip subdirectories
        }
        out.push(e.into_path());
    }
    Ok(out)
}

fn run_item(report: &mut BatchReport, job: TranscodeJob, backend: &dyn MediaBackend) {
    info!("Processing: {}", job.input.display());
    match run_job(&job, backend) {
        Ok(_) => report.succeeded.push(JobOutcome {
            input: job.input,
            output: job.output,
        }),
        Err(e) => {
            warn!("Error processing {}: {e}", job.input.display());
            report.failed.push((job.input, e.to_string()));
        }
    }
}

/// Encode a single file, or every direct entry of a directory, into `out_dir`.
///
/// Directory items that fail are logged and recorded; a failing single file,
/// the listing itself, or creating `out_dir` is returned as an error.
pub fn run_encode(
    input: &Path,
    out_dir: &Path,
    params: &EncodeParams,
    opts: &BatchOptions,
    backend: &dyn MediaBackend,
) -> Result<BatchReport> {
    fs::create_dir_all(out_dir)?;
    let md = fs::metadata(input)?;
    let ext = backend.extension();
    let mut report = BatchReport::default();
    let job_for = |path: PathBuf| TranscodeJob {
        output: out_dir.join(encoded_name(&path, ext)),
        input: path,
        kind: JobKind::Encode(*params),
    };

    if md.is_dir() {
        for path in list_entries(input, opts.sorted)? {
            run_item(&mut report, job_for(path), backend);
        }
    } else {
        let job = job_for(input.to_path_buf());
        run_job(&job, backend)?;
        report.succeeded.push(JobOutcome {
            input: job.input,
            output: job.output,
        });
    }
    Ok(report)
}

/// Decode a container file, a directory of containers, or a remote locator into `out_dir`.
///
/// A remote source is downloaded to a temporary file that is removed after
/// the single decode job, whether or not it succeeded.
pub fn run_decode(
    input: &str,
    out_dir: &Path,
    dopts: &DecodeOptions,
    opts: &BatchOptions,
    backend: &dyn MediaBackend,
    fetcher: &dyn RemoteFetcher,
) -> Result<BatchReport> {
    fs::create_dir_all(out_dir)?;
    let ext = backend.extension();
    let mut report = BatchReport::default();

    if is_remote(input) {
        let output = out_dir.join(REMOTE_OUTPUT_NAME);
        info!("Decoding from URL: {input}");
        let local = fetcher.fetch(input)?;
        decode_file(&local, &output, dopts, backend)?;
        if let Err(e) = local.close() {
            warn!("could not remove downloaded video: {e}");
        }
        report.succeeded.push(JobOutcome {
            input: PathBuf::from(input),
            output,
        });
        return Ok(report);
    }

    let input = Path::new(input);
    let md = fs::metadata(input)?;
    let suffix = format!(".{ext}");
    let job_for = |path: PathBuf| TranscodeJob {
        output: out_dir.join(decoded_name(&path, ext)),
        input: path,
        kind: JobKind::Decode(*dopts),
    };

    if md.is_dir() {
        for path in list_entries(input, opts.sorted)? {
            let is_container = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(&suffix));
            if !is_container {
                continue;
            }
            run_item(&mut report, job_for(path), backend);
        }
    } else {
        let job = job_for(input.to_path_buf());
        run_job(&job, backend)?;
        report.succeeded.push(JobOutcome {
            input: job.input,
            output: job.output,
        });
    }
    Ok(report)
}
