//! Livechart - live Mermaid diagrams with shareable links.
//!
//! # Usage
//!
//! ```bash
//! livechart share flow.mmd
//! livechart open 'http://localhost:8080/?state=...' -o flow.mmd
//! livechart render --watch --theme dark flow.mmd
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use livechart::app::App;
use livechart::binding::UrlBinding;
use livechart::codec::Codec;
use livechart::config::{
    ConfigFlags, clear_config_flags, global_config_path, load_config_flags, local_override_path,
    save_config_flags,
};
use livechart::location::Location;
use livechart::perf;
use livechart::render::MmdcRenderer;
use livechart::router::DEFAULT_DEBOUNCE_MS;
use livechart::state::{LOOK_KEY, Look, THEME_KEY, Theme, ViewState};

/// Live Mermaid diagrams with shareable links
#[derive(Parser, Debug)]
#[command(name = "livechart", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Diagram theme
    #[arg(long, global = true, value_enum)]
    theme: Option<Theme>,

    /// Diagram look
    #[arg(long, global = true, value_enum)]
    look: Option<Look>,

    /// Keep rendering on every save of the source file
    #[arg(short, long, global = true)]
    watch: bool,

    /// Quiet period before a burst of saves is rendered
    #[arg(long, global = true, value_name = "MS")]
    debounce_ms: Option<u64>,

    /// Mermaid CLI executable
    #[arg(long, global = true, value_name = "PATH")]
    mmdc: Option<PathBuf>,

    /// Page that share links point at; it must read the `state` query parameter
    #[arg(long, global = true, value_name = "URL")]
    base_url: Option<String>,

    /// Enable timing logs
    #[arg(long, global = true)]
    perf: bool,

    /// Write render/persist debug events to a file
    #[arg(long, global = true, value_name = "PATH")]
    render_debug_log: Option<PathBuf>,

    /// Save current command-line flags as defaults
    #[arg(long, global = true)]
    save: bool,

    /// Clear saved defaults
    #[arg(long, global = true)]
    clear: bool,
}

impl Cli {
    fn flags(&self) -> ConfigFlags {
        ConfigFlags {
            watch: self.watch,
            perf: self.perf,
            theme: self.theme,
            look: self.look,
            debounce_ms: self.debounce_ms,
            mmdc: self.mmdc.clone(),
            base_url: self.base_url.clone(),
            render_debug_log: self.render_debug_log.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a share link for a diagram file
    Share {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Recover the diagram carried by a share link
    Open {
        #[arg(value_name = "URL")]
        url: String,
        /// Write the diagram source here instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Render a diagram file to chart.svg and print its share link
    Render {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Directory chart.svg is written to (default: next to FILE)
        #[arg(short = 'o', long, value_name = "DIR")]
        out_dir: Option<PathBuf>,
    },
}

fn initial_state(content: String, flags: &ConfigFlags) -> ViewState {
    let mut state = ViewState::default().with_content(content);
    if let Some(theme) = flags.theme {
        state = state.with_option(THEME_KEY, theme.name());
    }
    if let Some(look) = flags.look {
        state = state.with_option(LOOK_KEY, look.name());
    }
    state
}

fn share(file: &Path, flags: &ConfigFlags) -> Result<ExitCode> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let mut binding = UrlBinding::new(Location::parse(flags.base_url()), Codec::default());
    binding.persist(&initial_state(content, flags));
    println!("{}", binding.url());
    Ok(ExitCode::SUCCESS)
}

fn open(url: &str, output: Option<&Path>) -> Result<ExitCode> {
    let binding = UrlBinding::new(Location::parse(url), Codec::default());
    let state = binding.load_from_location().unwrap_or_else(|| {
        eprintln!("[warn] Link carries no readable diagram; using the sample diagram");
        ViewState::default()
    });
    let options = state
        .options()
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(" ");
    eprintln!("{options}");

    match output {
        Some(path) => std::fs::write(path, state.content())
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => println!("{}", state.content()),
    }
    Ok(ExitCode::SUCCESS)
}

fn render(file: PathBuf, out_dir: Option<PathBuf>, flags: &ConfigFlags) -> Result<ExitCode> {
    if !file.exists() {
        anyhow::bail!("File not found: {}", file.display());
    }

    let renderer = flags
        .mmdc
        .as_ref()
        .map_or_else(MmdcRenderer::default, |path| MmdcRenderer::new(path.as_os_str()));
    let mut app = App::new(file)
        .with_watch(flags.watch)
        .with_debounce(Duration::from_millis(
            flags.debounce_ms.unwrap_or(DEFAULT_DEBOUNCE_MS),
        ))
        .with_base_url(flags.base_url())
        .with_theme(flags.theme)
        .with_look(flags.look);
    if let Some(dir) = out_dir {
        app = app.with_output_dir(dir);
    }

    let summary = app.run(renderer).context("Render session failed")?;
    if summary.failure.is_some() {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> Result<ExitCode> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();
    let global_path = global_config_path();
    let local_path = local_override_path();
    let cli_flags = cli.flags();

    if cli.clear {
        clear_config_flags(&global_path)?;
    }
    if cli.save {
        save_config_flags(&global_path, &cli_flags)?;
        eprintln!("Saved defaults to {}", global_path.display());
    }

    let file_flags = if cli.clear {
        ConfigFlags::default()
    } else {
        let global_flags = load_config_flags(&global_path)?;
        let local_flags = load_config_flags(&local_path)?;
        global_flags.union(&local_flags)
    };
    let effective = file_flags.union(&cli_flags);

    perf::set_enabled(effective.perf);
    let render_debug_log_path = effective
        .render_debug_log
        .clone()
        .or_else(|| std::env::var_os(perf::DEBUG_LOG_ENV).map(PathBuf::from));
    if let Err(err) = perf::set_debug_log_path(render_debug_log_path.as_deref()) {
        eprintln!(
            "[warn] Failed to initialize render debug log {}: {}",
            render_debug_log_path
                .as_ref()
                .map_or_else(|| "<unset>".to_string(), |p| p.display().to_string()),
            err
        );
    }

    match cli.command {
        Some(Command::Share { file }) => share(&file, &effective),
        Some(Command::Open { url, output }) => open(&url, output.as_deref()),
        Some(Command::Render { file, out_dir }) => render(file, out_dir, &effective),
        None if cli.save || cli.clear => Ok(ExitCode::SUCCESS),
        None => anyhow::bail!("No command given; run `livechart --help` for usage"),
    }
}
