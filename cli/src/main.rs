mod config;
mod report;
mod test_runner;

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Parser, Subcommand};
use render::{RenderOptions, Target};
use sections::Format;
use sections::validate::validate;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::report::Reporter;

const SUBCOMMANDS: &[&str] = &["check", "render", "list", "test", "help"];

/// Global flags that take a value; their value is never a file argument.
const VALUE_FLAGS: &[&str] = &["--config"];

#[derive(Parser)]
#[command(name = "sections", version, about = "Check, convert and render section content")]
struct Cli {
    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,

    /// Configuration file (defaults to ./sections.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load and validate a content file
    Check(CheckArgs),

    /// Render a content file as Markdown, HTML or JSON
    Render(RenderArgs),

    /// List sections and their components
    List(ListArgs),

    /// Run .test.md fixture files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct CheckArgs {
    /// Content file (.json, .toml or .md)
    file: String,

    /// Override format detection
    #[arg(long)]
    format: Option<Format>,

    /// Fail on warnings as well as errors
    #[arg(long)]
    deny_warnings: bool,
}

#[derive(clap::Args)]
struct RenderArgs {
    /// Content file (.json, .toml or .md)
    file: String,

    /// Override format detection
    #[arg(long)]
    format: Option<Format>,

    /// Output format: markdown, html or json
    #[arg(short, long)]
    to: Option<Target>,

    /// Write to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Leave component and heading ids out of the output
    #[arg(long)]
    no_ids: bool,

    /// Heading level for section titles (1-6)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=6))]
    heading_level: Option<u8>,
}

#[derive(clap::Args)]
struct ListArgs {
    /// Content file (.json, .toml or .md)
    file: String,

    /// Override format detection
    #[arg(long)]
    format: Option<Format>,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.md file or directory containing them
    path: String,

    /// Run only tests in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

fn main() {
    // Shorthand: if the first positional arg is not a known subcommand,
    // inject "check" so `sections file.md` works like `sections check file.md`.
    let mut args: Vec<String> = std::env::args().collect();
    if let Some(pos) = first_positional(&args) {
        if !SUBCOMMANDS.contains(&args[pos].as_str()) {
            args.insert(pos, "check".to_string());
        }
    }

    let cli = Cli::parse_from(&args);
    init_tracing(cli.verbose);

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let config = match config::load(cli.config.as_deref(), &cwd) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };

    let exit_code = match cli.command {
        Command::Check(args) => do_check(args, &config, cli.no_color),
        Command::Render(args) => do_render(args, &config, cli.no_color),
        Command::List(args) => do_list(args, cli.no_color),
        Command::Test(args) => {
            let path = Path::new(&args.path);
            if args.list_categories {
                test_runner::list_categories(path);
                0
            } else {
                test_runner::run_tests(path, cli.no_color, &args.category)
            }
        }
    };
    process::exit(exit_code);
}

/// Index of the first argument that is neither a flag nor a flag's value.
fn first_positional(args: &[String]) -> Option<usize> {
    let mut i = 1;
    while i < args.len() {
        let arg = args[i].as_str();
        if VALUE_FLAGS.contains(&arg) {
            i += 2;
        } else if arg.starts_with('-') {
            i += 1;
        } else {
            return Some(i);
        }
    }
    None
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn do_check(args: CheckArgs, config: &Config, no_color: bool) -> i32 {
    let mut reporter = Reporter::new(no_color);
    let Some(loaded) = report::load(&args.file, args.format, &mut reporter) else {
        return 1;
    };

    let issues = validate(&loaded.outline);
    for issue in &issues {
        reporter.emit(&issue.to_diagnostic(&loaded.outline));
    }

    let errors = issues.iter().filter(|i| i.is_error()).count();
    let warnings = loaded.warnings + issues.len() - errors;
    let deny_warnings = args.deny_warnings || config.check.deny_warnings;

    if errors > 0 || (deny_warnings && warnings > 0) {
        eprintln!(
            "error: {} failed with {} error(s) and {} warning(s)",
            args.file, errors, warnings
        );
        1
    } else {
        eprintln!(
            "ok: {} has {} section(s), {} component(s), {} warning(s)",
            args.file,
            loaded.outline.len(),
            loaded.outline.component_count(),
            warnings
        );
        0
    }
}

fn do_render(args: RenderArgs, config: &Config, no_color: bool) -> i32 {
    let mut reporter = Reporter::new(no_color);
    let Some(loaded) = report::load(&args.file, args.format, &mut reporter) else {
        return 1;
    };

    let issues = validate(&loaded.outline);
    for issue in &issues {
        reporter.emit(&issue.to_diagnostic(&loaded.outline));
    }
    if issues.iter().any(|i| i.is_error()) {
        eprintln!("error: {} has errors; nothing rendered", args.file);
        return 1;
    }

    let (target, options) = render_settings(&args, config);
    // Checked before the output file is created, which truncates it
    if let Err(e) = options.check() {
        eprintln!("error: {}", e);
        return 1;
    }

    let result = match &args.output {
        Some(path) => match File::create(path) {
            Ok(mut file) => render::render_outline(&loaded.outline, target, &mut file, &options),
            Err(e) => {
                eprintln!("error: cannot create '{}': {}", path.display(), e);
                return 1;
            }
        },
        None => {
            let mut stdout = io::stdout().lock();
            render::render_outline(&loaded.outline, target, &mut stdout, &options)
                .and_then(|_| stdout.flush().map_err(Into::into))
        }
    };

    match result {
        Ok(()) => {
            tracing::info!(file = %args.file, %target, "rendered");
            0
        }
        Err(e) => {
            eprintln!("error: {}", e);
            1
        }
    }
}

/// Output target and options: flags first, then the config file.
fn render_settings(args: &RenderArgs, config: &Config) -> (Target, RenderOptions) {
    let target = args.to.unwrap_or(config.render.to);
    let mut options = config.render.options();
    if args.no_ids {
        options.explicit_ids = false;
    }
    if let Some(level) = args.heading_level {
        options.heading_level = level;
    }
    (target, options)
}

fn do_list(args: ListArgs, no_color: bool) -> i32 {
    let mut reporter = Reporter::new(no_color);
    let Some(loaded) = report::load(&args.file, args.format, &mut reporter) else {
        return 1;
    };

    for section in &loaded.outline {
        println!(
            "{}  {}  ({} component{})",
            section.id,
            section.title,
            section.len(),
            if section.len() == 1 { "" } else { "s" }
        );
        for component in &section.components {
            println!("  {}  {}", component.id, component.component_type());
        }
    }
    0
}
