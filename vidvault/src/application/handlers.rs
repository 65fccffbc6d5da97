use crate::presentation::cli::{DecodeArgs, EncodeArgs};
use vidvault_core::error::Result;
use vidvault_core::media::{Backend, MediaBackend, open_backend};
use vidvault_core::remote::{NoRemote, RemoteFetcher, is_remote};
use vidvault_core::{
    BatchOptions, BatchReport, DecodeOptions, EncodeParams, run_decode, run_encode,
};

#[cfg(feature = "remote")]
fn http_fetcher(backend: &dyn MediaBackend) -> Result<Box<dyn RemoteFetcher>> {
    Ok(Box::new(vidvault_core::remote::HttpFetcher::new(
        backend.extension(),
    )?))
}

#[cfg(not(feature = "remote"))]
fn http_fetcher(_backend: &dyn MediaBackend) -> Result<Box<dyn RemoteFetcher>> {
    Ok(Box::new(NoRemote))
}

fn fetcher_for(input: &str, backend: &dyn MediaBackend) -> Result<Box<dyn RemoteFetcher>> {
    if is_remote(input) {
        http_fetcher(backend)
    } else {
        Ok(Box::new(NoRemote))
    }
}

fn print_report(verb: &str, report: &BatchReport) {
    for job in &report.succeeded {
        println!(
            "{verb} {} into {}",
            job.input.display(),
            job.output.display()
        );
    }
    if !report.failed.is_empty() {
        eprintln!(
            "{} of {} item(s) failed:",
            report.failed.len(),
            report.total()
        );
        for (path, err) in &report.failed {
            eprintln!("  {}: {err}", path.display());
        }
    }
}

pub fn handle_encode(backend: Backend, args: EncodeArgs) -> Result<()> {
    let params = EncodeParams {
        width: args.width,
        height: args.height,
        fps: args.fps,
        mode: args.mode.into(),
    };
    params.validate()?;
    let opts = BatchOptions {
        sorted: args.sorted,
        deterministic: args.deterministic,
    };
    let media = open_backend(backend, opts.deterministic)?;
    let report = run_encode(&args.input, &args.out_dir, &params, &opts, media.as_ref())?;
    print_report("Encoded", &report);
    Ok(())
}

pub fn handle_decode(backend: Backend, args: DecodeArgs) -> Result<()> {
    let dopts = DecodeOptions {
        mode: args.mode.map(Into::into),
        keep_padding: args.keep_padding,
    };
    let opts = BatchOptions {
        sorted: args.sorted,
        deterministic: false,
    };
    let media = open_backend(backend, false)?;
    let fetcher = fetcher_for(&args.input, media.as_ref())?;
    let report = run_decode(
        &args.input,
        &args.out_dir,
        &dopts,
        &opts,
        media.as_ref(),
        fetcher.as_ref(),
    )?;
    print_report("Decoded", &report);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presentation::cli::{Cli, Commands, ModeArg};
    use clap::Parser;
    use std::fs;

    fn encode_args(input: &std::path::Path, out: &std::path::Path) -> EncodeArgs {
        EncodeArgs {
            input: input.to_path_buf(),
            out_dir: out.to_path_buf(),
            width: 4,
            height: 4,
            fps: 30,
            mode: ModeArg::Single,
            sorted: true,
            deterministic: true,
        }
    }

    #[test]
    fn encode_then_decode_directory() {
        let src = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        fs::write(src.path().join("doc.txt"), b"some document text").unwrap();
        fs::write(src.path().join("img.bin"), [7u8; 40]).unwrap();

        let enc = work.path().join("enc");
        let dec = work.path().join("dec");
        handle_encode(Backend::Raw, encode_args(src.path(), &enc)).unwrap();
        assert!(enc.join("doc.txt.vvr").exists());

        let args = DecodeArgs {
            input: enc.to_string_lossy().into_owned(),
            out_dir: dec.clone(),
            mode: None,
            keep_padding: false,
            sorted: true,
        };
        handle_decode(Backend::Raw, args).unwrap();
        assert_eq!(
            fs::read(dec.join("doc.txt.decoded")).unwrap(),
            b"some document text"
        );
        assert_eq!(fs::read(dec.join("img.bin.decoded")).unwrap(), vec![7u8; 40]);
    }

    #[test]
    fn invalid_geometry_is_fatal() {
        let src = tempfile::tempdir().unwrap();
        let file = src.path().join("f");
        fs::write(&file, b"f").unwrap();
        let mut args = encode_args(&file, src.path());
        args.width = 0;
        assert!(handle_encode(Backend::Raw, args).is_err());
    }

    #[test]
    fn missing_decode_input_is_fatal() {
        let out = tempfile::tempdir().unwrap();
        let args = DecodeArgs {
            input: out.path().join("nope.vvr").to_string_lossy().into_owned(),
            out_dir: out.path().to_path_buf(),
            mode: None,
            keep_padding: false,
            sorted: false,
        };
        assert!(handle_decode(Backend::Raw, args).is_err());
    }

    #[test]
    fn cli_parses_both_commands() {
        let cli =
            Cli::try_parse_from(["vidvault", "encode", "in", "out", "--mode", "single"]).unwrap();
        match cli.command {
            Commands::Encode(a) => {
                assert_eq!(a.mode, ModeArg::Single);
                assert_eq!((a.width, a.height, a.fps), (640, 480, 30));
            }
            Commands::Decode(_) => panic!("expected encode"),
        }

        let cli =
            Cli::try_parse_from(["vidvault", "decode", "https://example.com/v", "out"]).unwrap();
        assert!(matches!(cli.command, Commands::Decode(ref a) if a.mode.is_none()));
        assert!(Cli::try_parse_from(["vidvault", "encode", "only-one"]).is_err());
    }
}
