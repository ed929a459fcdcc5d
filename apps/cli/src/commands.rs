//! CLI definitions, routing, and tracing setup.

use std::io::{ErrorKind, Write};
use std::path::Path;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use clap::{CommandFactory, Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use mdcc_core::{CommandRunner, FileGroup, OutputSink, Pipeline, parallelism};
use mdcc_discovery::{DiscoveryOptions, find_matching_files};
use mdcc_shared::{AppConfig, PatternList, init_config, load_config};

use crate::args::split_groups;

/// Exit code for invalid arguments or configuration.
const EXIT_INVALID: u8 = 2;

const EXAMPLES: &str = "\
EXAMPLES:
  mdcc file1.cs
  mdcc \"src/**/*.cs\" \"*.md\"
  mdcc @@filelist.txt
  mdcc \"src/**/*.js\" --contains \"export\"
  mdcc \"src/**\" --contains \"(?i)LLM\" --lines 2
  mdcc \"src/**\" --file-not-contains \"TODO\" --exclude \"drafts/*\"
  mdcc \"*.cs\" --remove-all-lines \"^\\s*//\"
  mdcc \"**/*.json\" --file-instructions \"convert the JSON to YAML\"
  mdcc \"**/*.json\" --file-instructions @instructions.md --threads 5
  mdcc \"**/*.py\" --file-instructions @instructions.md --save-file-output \"{filePath}/{fileBase}-{timeStamp}.md\"
  mdcc \"src/**/*.rs\" --line-contains \"fn \" -- \"docs/*.md\" --line-numbers

A `--` argument starts a new group with its own globs and options.
Global options (-v, --log-format) belong to the first group.

Arguments starting with @ use a file's content as the argument;
arguments starting with @@ use each line of a file as a separate argument.";

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// mdcc: assemble Markdown context from files.
#[derive(Parser)]
#[command(
    name = "mdcc",
    version,
    about = "Markdown Context Creator: assemble files matched by globs into one Markdown document.",
    long_about = None,
    after_help = EXAMPLES,
    args_conflicts_with_subcommands = true,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub run: RunArgs,

    /// Groups after the first `--` separator.
    #[arg(skip)]
    pub groups: Vec<RunArgs>,
}

impl Cli {
    /// Parse arguments split into `--` separated groups.
    pub(crate) fn parse_grouped(argv: Vec<String>) -> std::result::Result<Self, clap::Error> {
        let mut segments = split_groups(argv).into_iter();
        let mut cli = Self::try_parse_from(segments.next().unwrap_or_default())?;
        for segment in segments {
            cli.groups.push(GroupCli::try_parse_from(segment)?.run);
        }
        Ok(cli)
    }

    /// Every group's options, first group first.
    fn into_groups(self) -> Vec<RunArgs> {
        std::iter::once(self.run).chain(self.groups).collect()
    }
}

/// Parser for groups after a separator; they carry no program name.
#[derive(Parser)]
#[command(name = "mdcc", no_binary_name = true)]
struct GroupCli {
    #[command(flatten)]
    run: RunArgs,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Subcommands besides the default file assembly.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

/// Options for assembling files.
#[derive(clap::Args, Debug, Default)]
pub(crate) struct RunArgs {
    /// Files or glob patterns to include.
    pub globs: Vec<String>,

    /// Match only files and lines containing REGEX.
    #[arg(long, value_name = "REGEX")]
    pub contains: Vec<String>,

    /// Match only files containing REGEX.
    #[arg(long, value_name = "REGEX")]
    pub file_contains: Vec<String>,

    /// Skip files containing REGEX.
    #[arg(long, value_name = "REGEX")]
    pub file_not_contains: Vec<String>,

    /// Skip files matching GLOB (bare names match the file name).
    #[arg(long, value_name = "GLOB")]
    pub exclude: Vec<String>,

    /// Match only lines containing REGEX.
    #[arg(long, value_name = "REGEX")]
    pub line_contains: Vec<String>,

    /// Include N lines before matching lines.
    #[arg(long, value_name = "N")]
    pub lines_before: Option<usize>,

    /// Include N lines after matching lines.
    #[arg(long, value_name = "N")]
    pub lines_after: Option<usize>,

    /// Include N lines both before and after matching lines.
    #[arg(long, value_name = "N")]
    pub lines: Option<usize>,

    /// Prefix output lines with their line number.
    #[arg(long)]
    pub line_numbers: bool,

    /// Remove lines containing REGEX.
    #[arg(long, value_name = "REGEX")]
    pub remove_all_lines: Vec<String>,

    /// Instructions applied to each file's block by the configured command, in order.
    #[arg(long, num_args = 1.., value_name = "INSTRUCTION")]
    pub file_instructions: Vec<String>,

    /// Maximum concurrent instruction runs (default: available parallelism).
    #[arg(long, value_name = "N")]
    pub threads: Option<usize>,

    /// Save each file's output to a templated path, e.g. {filePath}/{fileBase}.md
    #[arg(long, value_name = "TEMPLATE")]
    pub save_file_output: Option<String>,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr; stdout is the document.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "mdcc=warn",
        1 => "mdcc=info",
        2 => "mdcc=debug",
        _ => "mdcc=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(mut cli: Cli) -> Result<ExitCode> {
    match cli.command.take() {
        Some(Command::Config { action }) => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
        None => cmd_assemble(cli.into_groups()).await,
    }
}

async fn cmd_assemble(group_args: Vec<RunArgs>) -> Result<ExitCode> {
    if group_args.iter().any(|args| args.globs.is_empty()) {
        Cli::command().print_help()?;
        return Ok(ExitCode::FAILURE);
    }

    // Everything that can be invalid is checked before the first file is read.
    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return Ok(ExitCode::from(EXIT_INVALID));
        }
    };

    let built = match build_groups(&group_args, &config) {
        Ok(built) => built,
        Err(e) => {
            eprintln!("{e}");
            return Ok(ExitCode::from(EXIT_INVALID));
        }
    };

    let mut groups = Vec::with_capacity(built.len());
    for (discovery, mut group) in built {
        group.files = match find_matching_files(&discovery) {
            Ok(files) => files,
            Err(e) => {
                eprintln!("{e}");
                return Ok(ExitCode::from(EXIT_INVALID));
            }
        };
        groups.push(group);
    }

    info!(
        groups = groups.len(),
        files = groups.iter().map(|g| g.files.len()).sum::<usize>(),
        "assembling"
    );

    let runner = Arc::new(CommandRunner::from_config(&config.instructions));
    let sink = Arc::new(ConsoleSink::new());
    let pipeline = Pipeline::new(parallelism(&groups), runner, sink.clone());

    let report = pipeline.run(groups).await;
    sink.finish();

    if sink.stdout_closed() {
        debug!("stdout closed before all blocks were written");
    }

    if report.is_success() {
        return Ok(ExitCode::SUCCESS);
    }

    for failure in &report.failures {
        eprintln!("{}: {}", failure.path.display(), failure.error);
    }
    Ok(ExitCode::FAILURE)
}

/// Build every group before any file is touched, so one bad pattern fails fast.
fn build_groups(
    group_args: &[RunArgs],
    config: &AppConfig,
) -> mdcc_shared::Result<Vec<(DiscoveryOptions, FileGroup)>> {
    group_args
        .iter()
        .map(|args| build_run(args, config))
        .collect()
}

/// Merge CLI flags over config defaults and compile every pattern.
fn build_run(
    args: &RunArgs,
    config: &AppConfig,
) -> mdcc_shared::Result<(DiscoveryOptions, FileGroup)> {
    let file_contains: Vec<&String> = args.contains.iter().chain(&args.file_contains).collect();
    let line_contains: Vec<&String> = args.contains.iter().chain(&args.line_contains).collect();

    let discovery = DiscoveryOptions {
        globs: args.globs.clone(),
        exclude_globs: args.exclude.clone(),
        file_contains: PatternList::compile(&file_contains)?,
        file_not_contains: PatternList::compile(&args.file_not_contains)?,
    };

    let format = mdcc_markdown::build_options(
        &line_contains,
        &args.remove_all_lines.iter().collect::<Vec<_>>(),
        args.lines_before
            .or(args.lines)
            .unwrap_or(config.defaults.lines_before),
        args.lines_after
            .or(args.lines)
            .unwrap_or(config.defaults.lines_after),
        args.line_numbers || config.defaults.line_numbers,
    )?;

    if !args.file_instructions.is_empty() {
        config.instructions.validate()?;
    }

    let group = FileGroup {
        files: Vec::new(),
        format,
        instructions: args.file_instructions.clone(),
        save_output: args.save_file_output.clone(),
        threads: args.threads.unwrap_or(config.defaults.threads),
    };

    debug!(?group.format, threads = group.threads, "run configuration built");
    Ok((discovery, group))
}

// ---------------------------------------------------------------------------
// Console sink
// ---------------------------------------------------------------------------

/// Prints blocks to stdout and status to an indicatif spinner on stderr.
///
/// Once stdout reports a broken pipe, further blocks are dropped quietly.
struct ConsoleSink {
    spinner: ProgressBar,
    out: Mutex<Box<dyn Write + Send>>,
    closed: AtomicBool,
}

impl ConsoleSink {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self::with_writer(spinner, Box::new(std::io::stdout()))
    }

    fn with_writer(spinner: ProgressBar, out: Box<dyn Write + Send>) -> Self {
        Self {
            spinner,
            out: Mutex::new(out),
            closed: AtomicBool::new(false),
        }
    }

    fn stdout_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl OutputSink for ConsoleSink {
    fn status(&self, message: &str) {
        self.spinner.set_message(message.to_string());
    }

    fn emit(&self, block: &str) {
        if self.stdout_closed() {
            return;
        }

        let written = self.spinner.suspend(|| {
            let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
            writeln!(out, "{block}").and_then(|()| out.flush())
        });

        match written {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                self.closed.store(true, Ordering::Relaxed);
            }
            Err(e) => warn!(error = %e, "failed to write block to stdout"),
        }
    }

    fn saved(&self, path: &Path) {
        debug!(path = %path.display(), "saved");
    }

    fn clear_status(&self) {
        self.spinner.set_message(String::new());
    }
}

async fn cmd_config_init() -> Result<ExitCode> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(ExitCode::SUCCESS)
}

async fn cmd_config_show() -> Result<ExitCode> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(items: &[&str]) -> Cli {
        Cli::try_parse_from(items.iter().copied()).expect("valid arguments")
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn lines_sets_both_radii_unless_overridden() {
        let cli = parse(&["mdcc", "*.rs", "--contains", "fn", "--lines", "2", "--lines-after", "5"]);
        let (_, group) = build_run(&cli.run, &AppConfig::default()).unwrap();
        assert_eq!(group.format.lines_before, 2);
        assert_eq!(group.format.lines_after, 5);
    }

    #[test]
    fn contains_feeds_file_and_line_filters() {
        let cli = parse(&["mdcc", "*.rs", "--contains", "export", "--line-contains", "fn"]);
        let (discovery, group) = build_run(&cli.run, &AppConfig::default()).unwrap();
        assert_eq!(discovery.file_contains.len(), 1);
        assert_eq!(group.format.include.len(), 2);
    }

    #[test]
    fn config_defaults_fill_missing_flags() {
        let mut config = AppConfig::default();
        config.defaults.threads = 7;
        config.defaults.line_numbers = true;
        config.defaults.lines_before = 1;

        let cli = parse(&["mdcc", "*.rs"]);
        let (_, group) = build_run(&cli.run, &config).unwrap();
        assert_eq!(group.threads, 7);
        assert!(group.format.line_numbers);
        assert_eq!(group.format.lines_before, 1);
    }

    #[test]
    fn invalid_regex_rejected_before_discovery() {
        let cli = parse(&["mdcc", "*.rs", "--remove-all-lines", "(oops"]);
        let err = build_run(&cli.run, &AppConfig::default()).unwrap_err();
        assert!(err.to_string().contains("(oops"));
    }

    #[test]
    fn instructions_accept_multiple_values() {
        let cli = parse(&[
            "mdcc",
            "**/*.cs",
            "--file-instructions",
            "step one",
            "step two",
            "--threads",
            "3",
        ]);
        assert_eq!(cli.run.file_instructions, vec!["step one", "step two"]);
        assert_eq!(cli.run.threads, Some(3));
    }

    fn grouped(items: &[&str]) -> Cli {
        let argv = items.iter().map(|s| s.to_string()).collect();
        Cli::parse_grouped(argv).expect("valid grouped arguments")
    }

    #[test]
    fn separator_builds_independent_groups() {
        let cli = grouped(&[
            "mdcc",
            "src/**/*.rs",
            "--line-contains",
            "fn",
            "--threads",
            "2",
            "--",
            "docs/*.md",
            "--line-contains",
            "TODO",
            "--line-contains",
            "FIXME",
            "--threads",
            "6",
        ]);
        let groups = cli.into_groups();
        assert_eq!(groups.len(), 2);

        let built = build_groups(&groups, &AppConfig::default()).unwrap();
        let (first_discovery, first) = &built[0];
        let (second_discovery, second) = &built[1];

        assert_eq!(first_discovery.globs, vec!["src/**/*.rs"]);
        assert_eq!(second_discovery.globs, vec!["docs/*.md"]);
        assert_eq!(first.format.include.len(), 1);
        assert_eq!(second.format.include.len(), 2);
        assert_eq!(first.threads, 2);
        assert_eq!(second.threads, 6);

        let groups: Vec<FileGroup> = built.into_iter().map(|(_, g)| g).collect();
        assert_eq!(parallelism(&groups), 6);
    }

    #[test]
    fn group_without_globs_is_detected() {
        let cli = grouped(&["mdcc", "*.rs", "--", "--line-numbers"]);
        let groups = cli.into_groups();
        assert!(groups[1].globs.is_empty());
    }

    #[test]
    fn bad_pattern_in_later_group_fails_the_build() {
        let cli = grouped(&["mdcc", "*.rs", "--", "*.md", "--contains", "(oops"]);
        assert!(build_groups(&cli.into_groups(), &AppConfig::default()).is_err());
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn broken_pipe_stops_output_without_panicking() {
        let sink = ConsoleSink::with_writer(ProgressBar::hidden(), Box::new(ClosedPipe));
        assert!(!sink.stdout_closed());

        sink.emit("## a.rs\n\n```\nfn a() {}\n```\n");
        assert!(sink.stdout_closed());

        sink.emit("## b.rs\n\n```\nfn b() {}\n```\n");
        assert!(sink.stdout_closed());
    }

    #[test]
    fn config_subcommand_parses() {
        let cli = parse(&["mdcc", "config", "show"]);
        assert!(matches!(
            cli.command,
            Some(Command::Config {
                action: ConfigAction::Show
            })
        ));
    }
}
