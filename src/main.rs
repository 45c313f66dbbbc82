//! CLI for publist - render BibTeX publication lists into HTML.

use std::fmt;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};

use publist::{
    builtin_style_names, builtin_template_names, context, directive::DirectiveError,
    expand_directives, load_bibliography, publish, build_publications, BuiltinTemplates, Settings,
    TemplateRenderer, DEFAULT_TEMPLATE,
};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

/// Render BibTeX publication lists into HTML pages
#[derive(Parser)]
#[command(name = "publist")]
#[command(version)]
#[command(after_help = "\
Examples:
  publist render pubs.bib --split-by tags --untagged Other
  publist render pubs.bib --template bibliography_by_group -o pubs.html
  publist process page.rst --config publist.toml
  publist styles")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a bibliography file with a template
    #[command(after_help = "\
Examples:
  publist render pubs.bib
  publist render pubs.bib --group ml --decorate
  publist render pubs.bib -c publist.toml -t bibliography_by_group -o out.html")]
    Render {
        /// BibTeX bibliography file (defaults to the configured source)
        bib: Option<PathBuf>,

        /// Settings file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Template name (see builtin templates)
        #[arg(short, long)]
        template: Option<String>,

        /// Only render the named publication group
        #[arg(short, long)]
        group: Option<String>,

        /// Field used to split publications into groups
        #[arg(long)]
        split_by: Option<String>,

        /// Group label for entries without a split-field value
        #[arg(long)]
        untagged: Option<String>,

        /// Decorate citation pieces with span tags
        #[arg(long)]
        decorate: bool,

        /// Citation style name (see 'styles' command)
        #[arg(long)]
        style: Option<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Expand bibliography directives in a document
    #[command(after_help = "\
Examples:
  publist process page.rst
  publist process page.rst --root content -o page.html
  echo '.. bibliography:: pubs.bib' | publist process -

Directive syntax: '.. bibliography:: [PATH]' followed by indented
':option: value' lines and, after a blank line, literal BibTeX content.")]
    Process {
        /// Input document (use '-' for stdin)
        input: PathBuf,

        /// Settings file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Content root for absolute directive paths (default: current dir)
        #[arg(long)]
        root: Option<PathBuf>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List available builtin citation styles
    Styles,
}

// ---------------------------------------------------------------------------
// AppError — semantic exit codes
// ---------------------------------------------------------------------------

enum AppError {
    /// Exit 10 — input document not found / unreadable
    InputFile(String),
    /// Exit 11 — bibliography file not found / invalid
    BibFile(String),
    /// Exit 12 — settings file not found / invalid
    Config(String),
    /// Exit 13 — publication group not found
    Group(String),
    /// Exit 14 — template not found
    Template(String),
    /// Exit 15 — directive misuse
    Directive(String),
    /// Exit 16 — cannot write output file
    OutputFile(String),
}

impl AppError {
    fn exit_code(&self) -> i32 {
        match self {
            AppError::InputFile(_) => 10,
            AppError::BibFile(_) => 11,
            AppError::Config(_) => 12,
            AppError::Group(_) => 13,
            AppError::Template(_) => 14,
            AppError::Directive(_) => 15,
            AppError::OutputFile(_) => 16,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::InputFile(msg) => {
                write!(f, "{}\n  hint: verify the file path is correct", msg)
            }
            AppError::BibFile(msg) => {
                write!(
                    f,
                    "{}\n  hint: the file must be a BibTeX bibliography",
                    msg
                )
            }
            AppError::Config(msg) => {
                write!(f, "{}\n  hint: settings are a TOML file", msg)
            }
            AppError::Group(msg) => {
                write!(
                    f,
                    "{}\n  hint: check the split-by field values in your bibliography",
                    msg
                )
            }
            AppError::Template(msg) => {
                let names = builtin_template_names().join(", ");
                write!(f, "{}\n  available builtin templates: {}", msg, names)
            }
            AppError::Directive(msg) => {
                write!(f, "{}", msg)
            }
            AppError::OutputFile(msg) => {
                write!(
                    f,
                    "{}\n  hint: check that the output directory exists and is writable",
                    msg
                )
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(e.exit_code());
    }
}

fn run() -> Result<(), AppError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            bib,
            config,
            template,
            group,
            split_by,
            untagged,
            decorate,
            style,
            output,
        } => {
            render_command(
                bib.as_deref(),
                config.as_deref(),
                template.as_deref(),
                group.as_deref(),
                split_by,
                untagged,
                decorate,
                style,
                output.as_deref(),
            )?;
        }
        Commands::Process {
            input,
            config,
            root,
            output,
        } => {
            process_command(&input, config.as_deref(), root.as_deref(), output.as_deref())?;
        }
        Commands::Styles => {
            styles_command();
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Render one bibliography file with a template.
#[allow(clippy::too_many_arguments)]
fn render_command(
    bib: Option<&Path>,
    config: Option<&Path>,
    template: Option<&str>,
    group: Option<&str>,
    split_by: Option<String>,
    untagged: Option<String>,
    decorate: bool,
    style: Option<String>,
    output: Option<&Path>,
) -> Result<(), AppError> {
    // 1. Load settings and apply command-line overrides
    let mut settings = load_settings(config)?;
    if split_by.is_some() {
        settings.split_by = split_by;
    }
    if untagged.is_some() {
        settings.untagged_title = untagged;
    }
    if decorate {
        settings.decorate_html = true;
    }
    if style.is_some() {
        settings.style.name = style;
    }

    // 2. Resolve and load the bibliography; a direct invocation has nothing
    //    to fall back to, so failures are fatal here
    let bib = match bib.or(settings.source.as_deref()) {
        Some(bib) => bib.to_path_buf(),
        None => {
            return Err(AppError::BibFile(
                "no bibliography given on the command line or in the settings".to_string(),
            ))
        }
    };
    let bibliography = load_bibliography(&bib)
        .map_err(|e| AppError::BibFile(format!("'{}': {}", bib.display(), e)))?;

    // 3. Run the formatting pass and publish into a fresh context
    let set = build_publications(&bibliography, &settings);
    let mut ctx = context::Context::new();
    publish(&mut ctx, &set, group).map_err(|e| AppError::Group(e.to_string()))?;

    // 4. Render
    let template = template
        .or(settings.default_template.as_deref())
        .unwrap_or(DEFAULT_TEMPLATE);
    let html = BuiltinTemplates
        .render(template, &ctx)
        .map_err(|e| AppError::Template(e.to_string()))?;

    write_output(&html, output)
}

/// Expand bibliography directives found in a document.
fn process_command(
    input: &Path,
    config: Option<&Path>,
    root: Option<&Path>,
    output: Option<&Path>,
) -> Result<(), AppError> {
    // 1. Read the document (support '-' for stdin)
    let document = if input == Path::new("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| AppError::InputFile(format!("failed to read from stdin: {}", e)))?;
        buf
    } else {
        fs::read_to_string(input)
            .map_err(|e| AppError::InputFile(format!("'{}': {}", input.display(), e)))?
    };

    // 2. Settings and path anchors: relative directive paths resolve
    //    against the document's directory, absolute ones against the root
    let settings = load_settings(config)?;
    let base_dir = if input == Path::new("-") {
        PathBuf::from(".")
    } else {
        input
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    };
    let content_root = root.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));

    // 3. Expand every directive against an empty page context
    let result = expand_directives(
        &document,
        &base_dir,
        &content_root,
        &settings,
        &context::Context::new(),
        &BuiltinTemplates,
    )
    .map_err(map_directive_error)?;

    write_output(&result, output)
}

/// Maps a DirectiveError to an AppError using type-safe matching.
fn map_directive_error(e: DirectiveError) -> AppError {
    match e {
        DirectiveError::Context(_) => AppError::Group(e.to_string()),
        DirectiveError::Template(_) => AppError::Template(e.to_string()),
        _ => AppError::Directive(e.to_string()),
    }
}

fn load_settings(config: Option<&Path>) -> Result<Settings, AppError> {
    match config {
        Some(path) => Settings::from_toml_file(path)
            .map_err(|e| AppError::Config(format!("'{}': {}", path.display(), e))),
        None => Ok(Settings::default()),
    }
}

fn write_output(content: &str, output: Option<&Path>) -> Result<(), AppError> {
    if let Some(output_path) = output {
        fs::write(output_path, content)
            .map_err(|e| AppError::OutputFile(format!("'{}': {}", output_path.display(), e)))?;
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        write!(handle, "{}", content)
            .map_err(|e| AppError::OutputFile(format!("stdout: {}", e)))?;
    }
    Ok(())
}

/// List available builtin citation styles.
fn styles_command() {
    for name in builtin_style_names() {
        println!("{}", name);
    }
}
