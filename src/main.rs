use std::io::{self, Write};
use std::path::{self, PathBuf};
use std::process;

use clap::{CommandFactory, FromArgMatches, Parser};
use mutter_clipboard_patcher::commands::patch_apply::{self, ApplyOptions};
use mutter_clipboard_patcher::patch::{PatchError, DEFAULT_MAX_DIFF_LINES};
use mutter_clipboard_patcher::targets::Profile;
use mutter_clipboard_patcher::telemetry;

#[derive(Parser)]
#[command(name = "mutter-clipboard-patcher")]
#[command(about = "Remove Wayland clipboard focus restrictions from a mutter source tree")]
#[command(version)]
struct Cli {
    /// Path to the mutter source tree
    root: PathBuf,
    /// Validate and preview the changes without writing anything
    #[arg(short = 'n', long)]
    dry_run: bool,
    /// Diff lines shown per file before truncating
    #[arg(long, default_value_t = DEFAULT_MAX_DIFF_LINES)]
    max_diff_lines: usize,
    /// More diagnostic output on stderr (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn fail(err: &PatchError, version: &str) -> ! {
    eprintln!("\n[ERROR] {}\n", err);
    if let Some(link) = err.reference() {
        eprintln!("Compare against upstream {}:", version);
        eprintln!("  {}", link);
    }
    eprintln!("\nThis patcher targets mutter {} specifically.", version);
    eprintln!("If your version differs, adapt the patch manually.\n");
    process::exit(1);
}

fn command(profile: &Profile) -> clap::Command {
    Cli::command().after_help(patch_apply::checkout_hint(profile))
}

/// Print a usage error followed by the checkout hint.
fn write_usage_error<W: Write>(out: &mut W, err: &clap::Error, hint: &str) -> io::Result<()> {
    write!(out, "{}", err.render())?;
    writeln!(out)?;
    writeln!(out, "{}", hint)
}

fn main() {
    let profile = match Profile::mutter_46_2() {
        Ok(profile) => profile,
        Err(e) => fail(&e, "46.2"),
    };

    let cli = match command(&profile)
        .try_get_matches()
        .and_then(|matches| Cli::from_arg_matches(&matches))
    {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            let hint = patch_apply::checkout_hint(&profile);
            drop(write_usage_error(&mut io::stderr().lock(), &e, &hint));
            process::exit(1);
        }
        Err(e) => {
            // --help and --version
            drop(e.print());
            process::exit(0);
        }
    };

    telemetry::init(cli.verbose);

    let root = path::absolute(&cli.root).unwrap_or_else(|_| cli.root.clone());
    let options = ApplyOptions {
        dry_run: cli.dry_run,
        max_diff_lines: cli.max_diff_lines,
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let summary = match patch_apply::run(&root, &profile, &options, &mut out) {
        Ok(summary) => summary,
        Err(e) => {
            drop(out.flush());
            fail(&e, profile.version)
        }
    };

    let written = patch_apply::write_summary(&mut out, &profile, &root, &options, &summary);

    if let Err(e) = written.and_then(|()| out.flush()) {
        fail(
            &PatchError::Report {
                reason: e.to_string(),
            },
            profile.version,
        );
    }
}
