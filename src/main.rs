//! The `update` hook binary.
//!
//! Install it as `hooks/update` of a repository receiving pushes, or call it from an
//! existing hook with the hook's arguments. Git runs it once per reference that is about to
//! change; a non-zero exit status rejects that reference update only.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use gix_submodule_guard::repository::gitoxide::GixRepository;
use gix_submodule_guard::{Guard, Keyword, RefTransition, Verdict};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Reject reference updates introducing commits that change a submodule pointer
/// without mentioning it in their commit message.
#[derive(Debug, Parser)]
#[command(name = "submodule-guard", version)]
struct Args {
    /// The name of the reference being updated.
    refname: String,
    /// The old object id of the reference, all zeros if it is being created.
    old: String,
    /// The new object id of the reference, all zeros if it is being deleted.
    new: String,

    /// The repository receiving the push.
    #[arg(long, env = "GIT_DIR", default_value = ".")]
    git_dir: PathBuf,

    /// The object directory holding the objects of the push in progress.
    #[arg(long, env = "GIT_QUARANTINE_PATH")]
    quarantine: Option<PathBuf>,

    /// The word commits changing a submodule have to mention, instead of `submoduleGuard.keyword`.
    #[arg(long, env = "SUBMODULE_GUARD_KEYWORD")]
    keyword: Option<String>,

    /// Log what is evaluated to standard error.
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(&args) {
        Ok(Verdict::Accept) => ExitCode::SUCCESS,
        Ok(Verdict::Reject(violations)) => {
            for violation in &violations {
                eprintln!("{violation}");
            }
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> anyhow::Result<Verdict> {
    let transition = RefTransition::parse(&args.refname, &args.old, &args.new)?;
    if transition.is_deletion() {
        tracing::debug!(refname = transition.name(), "deletion accepted without opening the repository");
        return Ok(Verdict::Accept);
    }

    let mut repo = GixRepository::open(&args.git_dir)?;
    if let Some(quarantine) = &args.quarantine {
        repo = repo
            .with_quarantine(quarantine)
            .with_context(|| format!("could not open quarantine at '{}'", quarantine.display()))?;
    }

    let mut config = repo.load_config()?;
    if let Some(keyword) = &args.keyword {
        config = config.with_keyword(Keyword::new(keyword.as_str())?);
    }

    Guard::new(&repo, config)
        .evaluate(&transition)
        .with_context(|| format!("could not verify the update of '{}'", transition.name()))
}

/// Logging is off unless `SUBMODULE_GUARD_LOG` or `--verbose` ask for it, as standard error
/// is what the pusher gets to see.
fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("SUBMODULE_GUARD_LOG")
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "off" }));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}
