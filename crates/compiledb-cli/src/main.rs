use clap::Parser;
use compiledb_build::{generate, Config, MakeCommand, DATABASE_FILE_NAME};
use log::info;
use miette::{miette, IntoDiagnostic, Result};
use std::path::PathBuf;

/// Create a compilation database.
///
/// Does a make clean, then a make -n for this target and uses the dry-run
/// output to create compile_commands.json, which helps IDEs and language
/// servers understand the build. See
/// https://clang.llvm.org/docs/JSONCompilationDatabase.html
#[derive(Parser)]
#[command(name = "compiledb")]
#[command(version)]
struct Cli {
    /// The keyboard to generate the database for
    #[arg(short, long)]
    keyboard: Option<String>,

    /// The keymap to generate the database for
    #[arg(short = 'm', long)]
    keymap: Option<String>,

    /// Firmware root directory (default: current directory)
    #[arg(long)]
    root: Option<PathBuf>,

    /// Output file path (default: <root>/compile_commands.json)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Show debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))?;

    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(if cli.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .parse_default_env()
        .init();

    let root = cli
        .root
        .unwrap_or_else(|| PathBuf::from("."))
        .canonicalize()
        .map_err(|e| miette!("Failed to resolve firmware root: {}", e))?;

    let config = Config::load(&root).into_diagnostic()?;
    let target = config
        .resolve_target(cli.keyboard.as_deref(), cli.keymap.as_deref())
        .map_err(|e| {
            miette!(
                help = "usage: compiledb [-k KEYBOARD] [-m KEYMAP], or set them in compiledb.toml",
                "{}",
                e
            )
        })?;

    let command = MakeCommand::dry_run(&target, &config.make);
    let db = generate(&root, &command).into_diagnostic()?;

    let output = cli.output.unwrap_or_else(|| root.join(DATABASE_FILE_NAME));
    info!("Writing build database to {}", output.display());
    db.write_to_file(&output).into_diagnostic()?;

    Ok(())
}
