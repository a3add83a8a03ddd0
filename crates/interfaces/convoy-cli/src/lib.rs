pub mod commands;

use std::io::{self, BufRead, Write};

use anyhow::Context;
use camino::Utf8PathBuf;
use clap::{Args, ValueEnum};
use convoy_session::{Candidate, Phase, Selection, SelectionPrompt};
use convoy_store::{Backend, S3Params};

#[derive(ValueEnum, Clone, Debug, Copy)]
pub enum CliBackend {
    S3,
    Local,
}

/// Remote-store selection, shared by every subcommand.
#[derive(Args, Clone, Debug)]
pub struct StoreArgs {
    #[arg(long, value_enum, default_value_t = CliBackend::S3)]
    pub backend: CliBackend,
    #[arg(long, required_if_eq("backend", "s3"))]
    pub bucket: Option<String>,
    #[arg(long, default_value = "", help = "Key prefix of the shared location")]
    pub prefix: String,
    #[arg(long)]
    pub region: Option<String>,
    #[arg(long, help = "S3-compatible endpoint (MinIO and friends)")]
    pub endpoint_url: Option<String>,
    #[arg(
        long,
        required_if_eq("backend", "local"),
        help = "Directory standing in for the remote store"
    )]
    pub local_root: Option<Utf8PathBuf>,
}

impl StoreArgs {
    pub fn to_backend(&self) -> anyhow::Result<Backend> {
        match self.backend {
            CliBackend::S3 => Ok(Backend::S3(S3Params {
                bucket: self
                    .bucket
                    .clone()
                    .context("--bucket is required for the s3 backend")?,
                prefix: self.prefix.clone(),
                region: self.region.clone(),
                endpoint_url: self.endpoint_url.clone(),
                credentials: None,
            })),
            CliBackend::Local => Ok(Backend::LocalDir {
                root: self
                    .local_root
                    .clone()
                    .context("--local-root is required for the local backend")?,
            }),
        }
    }
}

/// Interactive prompt over stdin/stdout. Candidates are numbered from
/// zero to match the index syntax of the response.
pub struct ConsolePrompt;

impl SelectionPrompt for ConsolePrompt {
    fn select(&self, phase: Phase, candidates: &[Candidate]) -> Selection {
        println!("\n{}", phase.question());
        for (i, candidate) in candidates.iter().enumerate() {
            println!("  [{i}] {}  ({})", candidate.path, candidate.detail);
        }
        print!("Select (all / comma-separated indices / enter to skip): ");
        let _ = io::stdout().flush();

        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(_) => Selection::parse(&line),
            Err(_) => Selection::Cancel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(backend: CliBackend) -> StoreArgs {
        StoreArgs {
            backend,
            bucket: None,
            prefix: String::new(),
            region: None,
            endpoint_url: None,
            local_root: None,
        }
    }

    #[test]
    fn s3_backend_requires_a_bucket() {
        assert!(args(CliBackend::S3).to_backend().is_err());

        let mut with_bucket = args(CliBackend::S3);
        with_bucket.bucket = Some("shared".into());
        assert!(matches!(
            with_bucket.to_backend().unwrap(),
            Backend::S3(_)
        ));
    }

    #[test]
    fn local_backend_requires_a_root() {
        assert!(args(CliBackend::Local).to_backend().is_err());

        let mut with_root = args(CliBackend::Local);
        with_root.local_root = Some("/tmp/remote".into());
        assert!(matches!(
            with_root.to_backend().unwrap(),
            Backend::LocalDir { .. }
        ));
    }
}
