//! typm CLI (made by FontLab https://www.fontlab.com/)

use std::fs;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum, ValueHint};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use typm_core::config::{parse_format_list, FontsDbConfig};
use typm_core::db::FontsDb;
use typm_core::font::{FontFace, FontSummary};
use typm_core::output::{write_json_pretty, write_ndjson};
use typm_core::query::FontQuery;

pub mod server;

/// CLI entrypoint for typm.
#[derive(Debug, Parser)]
#[command(
    name = "typm",
    about = "Font variant resolution, install and local registry (made by FontLab https://www.fontlab.com/)"
)]
pub struct Cli {
    #[command(flatten)]
    registry: RegistryArgs,

    /// Raise log verbosity (-v info, -vv debug)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

/// Where the registry lives and how it fetches fonts.
#[derive(Debug, Clone, Args)]
pub struct RegistryArgs {
    /// Registry root folder (holds fonts.yml)
    #[arg(
        long = "root",
        env = "TYPM_FONTS_DIR",
        default_value = "fonts",
        global = true,
        value_hint = ValueHint::DirPath
    )]
    pub root: PathBuf,

    /// Formats every installed variant must have (default ttf,woff2,woff)
    #[arg(long = "formats", value_delimiter = ',', global = true)]
    pub formats: Vec<String>,

    /// Program used to derive WOFF/WOFF2 from TTF
    #[arg(long = "subsetter", env = "TYPM_SUBSETTER", global = true, value_hint = ValueHint::CommandName)]
    pub subsetter: Option<PathBuf>,

    /// Google Fonts developer API key; enables the Google Fonts catalog
    #[arg(long = "google-api-key", env = "TYPM_GOOGLE_FONTS_KEY", hide_env_values = true, global = true)]
    pub google_api_key: Option<String>,

    /// Do not register the google-webfonts-helper catalog
    #[arg(long = "no-gwfh", action = ArgAction::SetTrue, global = true)]
    pub no_gwfh: bool,

    /// Merge every provider catalog while loading
    #[arg(long = "prefetch", action = ArgAction::SetTrue, global = true)]
    pub prefetch: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Verify a variant is installed with every required format
    Check(QueryArgs),
    /// Install a variant from the provider catalogs
    Install(QueryArgs),
    /// Print the descriptor of an installed variant
    Get(GetArgs),
    /// List installed (or all known) fonts
    List(ListArgs),
    /// Serve the registry over HTTP
    Serve(ServeArgs),
}

#[derive(Debug, Args)]
struct QueryArgs {
    /// Family, optionally with weight and subsets (e.g. Roboto/700italic@latin)
    query: String,

    /// Weight: 100-900, bold, light, regular, 700italic...
    #[arg(short = 'w', long = "weight")]
    weight: Option<String>,

    /// Style: normal or italic
    #[arg(short = 's', long = "style")]
    style: Option<String>,

    /// Required subsets (e.g. latin,latin-ext)
    #[arg(long = "subsets", value_delimiter = ',')]
    subsets: Vec<String>,
}

impl QueryArgs {
    fn to_query(&self) -> FontQuery {
        let mut query = FontQuery::new(self.query.as_str());
        if let Some(weight) = &self.weight {
            query = query.with_weight(weight);
        }
        if let Some(style) = &self.style {
            query = query.with_style(style.as_str());
        }
        if !self.subsets.is_empty() {
            query = query.with_subsets(self.subsets.iter().cloned());
        }
        query
    }
}

#[derive(Debug, Args)]
struct GetArgs {
    #[command(flatten)]
    query: QueryArgs,

    /// Emit the descriptor as JSON
    #[arg(long = "json", action = ArgAction::SetTrue)]
    json: bool,
}

#[derive(Debug, Args)]
struct ListArgs {
    /// Include known but not installed fonts
    #[arg(long = "all", action = ArgAction::SetTrue)]
    all: bool,

    /// Emit a single JSON array
    #[arg(long = "json", action = ArgAction::SetTrue, conflicts_with = "ndjson")]
    json: bool,

    /// Emit newline-delimited JSON
    #[arg(long = "ndjson", action = ArgAction::SetTrue)]
    ndjson: bool,

    /// Format output as padded columns
    #[arg(long = "columns", action = ArgAction::SetTrue)]
    columns: bool,

    /// Control colorized output (auto|always|never)
    #[arg(long = "color", default_value_t = ColorChoice::Auto, value_enum)]
    color: ColorChoice,
}

#[derive(Debug, Args)]
struct ServeArgs {
    /// Address to listen on
    #[arg(long = "bind", default_value = "127.0.0.1:8765")]
    bind: String,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

/// Parse CLI args and execute the selected command.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Command::Serve(args) = &cli.command {
        return run_serve(&cli.registry, &args.bind);
    }

    let mut db = open_registry(&cli.registry)?;
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let prefetch = cli.registry.prefetch;

    db.session(|db| -> Result<()> {
        db.load(prefetch)?;
        execute(db, &cli.command, &mut handle)
    })
}

fn init_tracing(verbose: u8) {
    let fallback = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .try_init();
}

/// Build the registry described by the flags; the root folder is created
/// when missing.
pub fn open_registry(args: &RegistryArgs) -> Result<FontsDb> {
    let mut config = FontsDbConfig::new(&args.root);
    if !args.formats.is_empty() {
        config = config.with_formats(parse_format_list(&args.formats)?);
    }
    if let Some(program) = &args.subsetter {
        config = config.with_subsetter(program);
    }

    fs::create_dir_all(&args.root)
        .with_context(|| format!("creating registry root {}", args.root.display()))?;

    let mut db = FontsDb::new(config);
    register_providers(&mut db, args);
    Ok(db)
}

#[cfg(feature = "http")]
fn register_providers(db: &mut FontsDb, args: &RegistryArgs) {
    use typm_core::google::GoogleFontsProvider;
    use typm_core::gwfh::GwfhProvider;

    if let Some(key) = args.google_api_key.as_deref().filter(|k| !k.is_empty()) {
        db.add_provider(Box::new(GoogleFontsProvider::new(key)));
    }
    if !args.no_gwfh {
        db.add_provider(Box::new(GwfhProvider::default()));
    }
}

#[cfg(not(feature = "http"))]
fn register_providers(_db: &mut FontsDb, args: &RegistryArgs) {
    if args.google_api_key.is_some() {
        tracing::warn!("built without the `http` feature; remote catalogs are disabled");
    }
}

fn execute(db: &mut FontsDb, command: &Command, mut w: impl Write) -> Result<()> {
    match command {
        Command::Check(args) => {
            db.check(args.to_query())
                .map_err(|err| anyhow!(err.report()))?;
            writeln!(w, "ok")?;
        }
        Command::Install(args) => {
            let query = args.to_query();
            db.install(&query).map_err(|err| anyhow!(err.report()))?;
            let face = db
                .get(&query)
                .ok_or_else(|| anyhow!("installed variant could not be read back"))?;
            writeln!(w, "installed {} {}", face.family, face.variant)?;
            write_files(&face, &mut w)?;
        }
        Command::Get(args) => {
            let query = args.query.to_query();
            let Some(face) = db.get(&query) else {
                bail!("font variant not installed: {}", query.normalize());
            };
            if args.json {
                serde_json::to_writer_pretty(&mut w, &face)?;
                writeln!(w)?;
            } else {
                write_face(&face, &mut w)?;
            }
        }
        Command::List(args) => {
            let summaries: Vec<FontSummary> = db
                .fonts()
                .filter(|font| args.all || font.is_installed())
                .map(|font| font.summary())
                .collect();
            let use_color = match args.color {
                ColorChoice::Always => true,
                ColorChoice::Never => false,
                ColorChoice::Auto => io::stdout().is_terminal(),
            };

            if args.ndjson {
                write_ndjson(&summaries, &mut w)?;
            } else if args.json {
                write_json_pretty(&summaries, &mut w)?;
            } else if args.columns {
                write_columns(&summaries, &mut w, use_color)?;
            } else {
                write_plain(&summaries, &mut w, use_color)?;
            }
        }
        Command::Serve(_) => bail!("serve runs outside of a registry session"),
    }
    Ok(())
}

fn run_serve(args: &RegistryArgs, bind: &str) -> Result<()> {
    let mut db = open_registry(args)?;
    db.load(args.prefetch)?;

    serve_and_close(db, bind)
}

/// Serve until shutdown; the registry is saved however serving ended.
fn serve_and_close(db: FontsDb, bind: &str) -> Result<()> {
    let shared = server::shared(db);
    let served = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting async runtime")
        .and_then(|runtime| runtime.block_on(server::serve(bind, shared.clone())));

    let closed = server::close(shared);
    served?;
    closed
}

fn write_face(face: &FontFace, mut w: impl Write) -> Result<()> {
    writeln!(w, "family:  {}", face.family)?;
    writeln!(w, "variant: {}", face.variant)?;
    writeln!(w, "style:   {}", face.style)?;
    if !face.weight.is_empty() {
        writeln!(w, "weight:  {}", face.weight)?;
    }
    if !face.display.is_empty() {
        writeln!(w, "display: {}", face.display)?;
    }
    writeln!(w, "version: {}", face.version)?;
    write_files(face, w)
}

fn write_files(face: &FontFace, mut w: impl Write) -> Result<()> {
    for (format, path) in &face.files {
        writeln!(w, "  {format:<6} {}", path.display())?;
    }
    Ok(())
}

fn write_plain(fonts: &[FontSummary], mut w: impl Write, color: bool) -> Result<()> {
    for font in fonts {
        let id = apply_color(&font.id, color, AnsiColor::Cyan);
        writeln!(w, "{id}")?;
    }
    Ok(())
}

fn write_columns(fonts: &[FontSummary], mut w: impl Write, color: bool) -> Result<()> {
    let rows: Vec<(String, String, String)> = fonts
        .iter()
        .map(|font| {
            let variants = if font.installed_variants.is_empty() {
                format!("known:{}", font.variants.len())
            } else {
                font.installed_variants.join(",")
            };
            (font.id.clone(), font.family.clone(), variants)
        })
        .collect();

    let id_width = rows.iter().map(|r| r.0.len()).max().unwrap_or(0).clamp(0, 60);
    let family_width = rows.iter().map(|r| r.1.len()).max().unwrap_or(0).clamp(0, 60);

    for (id, family, variants) in rows {
        let padded_id = format!("{:<id_width$}", id);
        let padded_family = format!("{:<family_width$}", family);
        let rendered_id = apply_color(&padded_id, color, AnsiColor::Cyan);
        let rendered_family = apply_color(&padded_family, color, AnsiColor::Yellow);
        let rendered_variants = apply_color(&variants, color, AnsiColor::Green);

        writeln!(w, "{rendered_id}  {rendered_family}  {rendered_variants}")?;
    }

    Ok(())
}

#[derive(Copy, Clone)]
enum AnsiColor {
    Cyan,
    Yellow,
    Green,
}

fn apply_color(text: &str, color: bool, code: AnsiColor) -> String {
    if !color {
        return text.to_string();
    }

    let code_str = match code {
        AnsiColor::Cyan => "36",
        AnsiColor::Yellow => "33",
        AnsiColor::Green => "32",
    };

    format!("\u{1b}[{}m{}\u{1b}[0m", code_str, text)
}
