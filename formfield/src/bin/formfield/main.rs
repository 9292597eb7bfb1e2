mod commands;
mod examples;
mod output;
mod theme;

use std::fmt::Write;
use std::io::{self, Write as IoWrite};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{
    ColorChoice, Command, CommandFactory, FromArgMatches, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Color as ClapColor, RgbColor, Style},
    },
    error::ErrorKind,
};
use colored::{Color as ThemeColor, Colorize, control::ShouldColorize};
use formfield::{FieldService, FieldStore, FormfieldConfig, MemoryStore, RedisStore, SheetLookup};

use commands::{
    CreateArgs, DeleteArgs, ShowArgs, UpdateArgs, handle_create, handle_delete, handle_show, handle_update,
};
use examples::{ExampleGroup, command_examples};
use output::{GlobalOptions, OutputFormat, OutputManager};
use theme::{ICONS, THEME};

const ENVIRONMENT_VARIABLES: &[(&str, &str)] = &[
    ("REDIS_URL", "Redis connection URL used when the config keeps the default"),
    ("RUST_LOG", "Log filter, e.g. formfield=debug"),
];

#[derive(Parser)]
#[command(name = "formfield")]
#[command(version)]
#[command(
    about = "Create, inspect, update and delete form fields",
    long_about = r#"Form field configuration CLI.

Each field is stored as one row plus the satellite rows its type needs
(range, choice options, autocomplete settings), written atomically.

Commands:
  create    Create a field from a JSON payload
  show      Display a field with its additional options
  update    Apply a JSON update payload to a field
  delete    Delete a field and its satellites
"#
)]
#[command(subcommand_required = true, arg_required_else_help = true)]
struct Cli {
    /// Output format
    #[arg(long, value_enum, default_value = "table", global = true)]
    output: OutputFormat,

    /// Suppress output (only errors will be shown)
    #[arg(short = 'q', long, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Configuration file
    #[arg(long, env = "FORMFIELD_CONFIG", default_value = "formfield.toml", global = true)]
    config: PathBuf,

    /// Keep fields in memory for this invocation instead of Redis
    #[arg(long, global = true)]
    memory: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn parse_with_styles() -> Self {
        let command = build_cli_command();
        match command.styles(help_styles()).try_get_matches() {
            Ok(matches) => Cli::from_arg_matches(&matches).unwrap_or_else(|err| err.exit()),
            Err(err) => match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                    let _ = print_blank_line_stdout();
                    if let Err(print_err) = err.print()
                        && print_err.kind() != io::ErrorKind::BrokenPipe
                    {
                        eprintln!("Failed to display help: {print_err}");
                    }
                    let _ = print_blank_line_stdout();
                    std::process::exit(0);
                }
                _ => {
                    let exit_code = err.exit_code();
                    let _ = print_blank_line_stderr();
                    if let Err(print_err) = err.print()
                        && print_err.kind() != io::ErrorKind::BrokenPipe
                    {
                        eprintln!("Failed to display error: {print_err}");
                    }
                    let _ = print_blank_line_stderr();
                    std::process::exit(exit_code);
                }
            },
        }
    }
}

fn build_cli_command() -> Command {
    let use_color = detect_color_support();
    let appendix = render_top_level_appendix(use_color);
    let mut command = Cli::command().after_long_help(appendix);
    command = command.color(if use_color { ColorChoice::Auto } else { ColorChoice::Never });
    attach_command_examples(&mut command, use_color);
    command
}

fn attach_command_examples(command: &mut Command, use_color: bool) {
    for example in command_examples() {
        if let Some(subcommand) = command.find_subcommand_mut(example.name) {
            let help_text = render_examples(example.groups, use_color);
            *subcommand = subcommand.clone().after_long_help(help_text);
        }
    }
}

fn render_examples(groups: &[ExampleGroup], use_color: bool) -> String {
    let theme = &THEME;
    let mut buffer = String::new();

    let heading = stylize("Examples:", theme.highlight, true, use_color);
    let _ = writeln!(buffer, "{heading}");

    for (index, group) in groups.iter().enumerate() {
        let title = stylize(group.title, theme.primary, true, use_color);
        let _ = writeln!(buffer, "  {title}");

        for command in group.commands {
            let arrow = stylize(ICONS.arrow, theme.secondary, false, use_color);
            let command_text = stylize(command, theme.secondary, false, use_color);
            let _ = writeln!(buffer, "    {arrow} {command_text}");
        }

        if index + 1 < groups.len() {
            buffer.push('\n');
        }
    }

    buffer
}

fn render_top_level_appendix(use_color: bool) -> String {
    let theme = &THEME;
    let mut buffer = String::new();

    let env_heading = stylize("Environment Variables:", theme.highlight, true, use_color);
    let _ = writeln!(buffer, "{env_heading}");
    for (key, description) in ENVIRONMENT_VARIABLES {
        let key_text = stylize(key, theme.key, true, use_color);
        let value_text = stylize(description, theme.value, false, use_color);
        let _ = writeln!(buffer, "  {key_text}  {value_text}");
    }

    buffer.push('\n');

    let tip_heading = stylize("Tip:", theme.highlight, true, use_color);
    let tip_text = stylize(
        "Use 'formfield <command> --help' to view examples for each command.",
        theme.secondary,
        false,
        use_color,
    );
    let _ = writeln!(buffer, "{tip_heading} {tip_text}");

    buffer
}

fn print_blank_line_stdout() -> io::Result<()> {
    let mut stdout = io::stdout();
    IoWrite::write_all(&mut stdout, b"\n")?;
    IoWrite::flush(&mut stdout)
}

fn print_blank_line_stderr() -> io::Result<()> {
    let mut stderr = io::stderr();
    IoWrite::write_all(&mut stderr, b"\n")?;
    IoWrite::flush(&mut stderr)
}

fn stylize(text: &str, color: ThemeColor, bold: bool, use_color: bool) -> String {
    if !use_color {
        return text.to_string();
    }
    let styled = text.color(color);
    if bold { styled.bold().to_string() } else { styled.to_string() }
}

fn detect_color_support() -> bool {
    ShouldColorize::from_env().should_colorize()
}

fn help_styles() -> Styles {
    let theme = &THEME;
    Styles::styled()
        .usage(style_from_color(theme.primary).bold())
        .header(style_from_color(theme.highlight).bold())
        .literal(style_from_color(theme.secondary))
        .placeholder(style_from_color(theme.muted))
        .valid(style_from_color(theme.success))
        .invalid(style_from_color(theme.warning))
        .error(style_from_color(theme.error).bold())
}

fn style_from_color(color: ThemeColor) -> Style {
    Style::new().fg_color(Some(color_to_clap_color(color)))
}

fn color_to_clap_color(color: ThemeColor) -> ClapColor {
    match color {
        ThemeColor::Black => ClapColor::Ansi(AnsiColor::Black),
        ThemeColor::Red => ClapColor::Ansi(AnsiColor::Red),
        ThemeColor::Green => ClapColor::Ansi(AnsiColor::Green),
        ThemeColor::Yellow => ClapColor::Ansi(AnsiColor::Yellow),
        ThemeColor::Blue => ClapColor::Ansi(AnsiColor::Blue),
        ThemeColor::Magenta => ClapColor::Ansi(AnsiColor::Magenta),
        ThemeColor::Cyan => ClapColor::Ansi(AnsiColor::Cyan),
        ThemeColor::White => ClapColor::Ansi(AnsiColor::White),
        ThemeColor::BrightBlack => ClapColor::Ansi(AnsiColor::BrightBlack),
        ThemeColor::BrightRed => ClapColor::Ansi(AnsiColor::BrightRed),
        ThemeColor::BrightGreen => ClapColor::Ansi(AnsiColor::BrightGreen),
        ThemeColor::BrightYellow => ClapColor::Ansi(AnsiColor::BrightYellow),
        ThemeColor::BrightBlue => ClapColor::Ansi(AnsiColor::BrightBlue),
        ThemeColor::BrightMagenta => ClapColor::Ansi(AnsiColor::BrightMagenta),
        ThemeColor::BrightCyan => ClapColor::Ansi(AnsiColor::BrightCyan),
        ThemeColor::BrightWhite => ClapColor::Ansi(AnsiColor::BrightWhite),
        ThemeColor::TrueColor { r, g, b } => ClapColor::Rgb(RgbColor(r, g, b)),
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create a field from a JSON payload
    Create(CreateArgs),

    /// Display a field with its additional options
    Show(ShowArgs),

    /// Apply a JSON update payload to a field
    Update(UpdateArgs),

    /// Delete a field and its satellites
    Delete(DeleteArgs),
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let cli = Cli::parse_with_styles();
    if cli.no_color {
        colored::control::set_override(false);
    }

    match execute(cli).await {
        Ok(()) => {}
        Err(err) => {
            eprintln!("Error: {err:#}");
            std::process::exit(1);
        }
    }
}

async fn execute(cli: Cli) -> Result<()> {
    let output = OutputManager::new(GlobalOptions {
        output_format: cli.output.clone(),
        quiet: cli.quiet,
        no_color: cli.no_color,
    });

    let config = FormfieldConfig::load_or_default(&cli.config)?;
    let sheets = config.static_sheets();
    let options = config.store.options();

    if cli.memory {
        let mut service = FieldService::new(MemoryStore::with_options(options), sheets);
        return dispatch(cli.command, &mut service, &output).await;
    }

    let url = config.redis.resolved_url()?;
    let store = RedisStore::connect(&url, config.store.prefix.clone(), config.store.service.clone())
        .await
        .with_context(|| format!("Failed to connect to Redis at {url}"))?
        .with_options(options);
    let mut service = FieldService::new(store, sheets);
    dispatch(cli.command, &mut service, &output).await
}

async fn dispatch<S, L>(command: Commands, service: &mut FieldService<S, L>, output: &OutputManager) -> Result<()>
where
    S: FieldStore,
    L: SheetLookup,
{
    match command {
        Commands::Create(args) => handle_create(args, service, output).await,
        Commands::Show(args) => handle_show(args, service, output).await,
        Commands::Update(args) => handle_update(args, service, output).await,
        Commands::Delete(args) => handle_delete(args, service, output).await,
    }
}
