use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::app::App;
use crate::binding::UrlBinding;
use crate::codec::Codec;
use crate::export::{ExportError, remove_export};
use crate::location::Location;
use crate::render::{DiagramRenderer, OutputArea, RenderOrchestrator};
use crate::router::{Execution, Router, Signal};
use crate::state::ViewState;
use crate::watcher::SourceWatcher;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Settle time for file system events before the file is re-read.
const WATCH_SETTLE: Duration = Duration::from_millis(30);

/// What a finished (non-watching) session produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// The share link for the final state.
    pub url: String,
    /// Path of the exported SVG, if the last render succeeded.
    pub exported: Option<PathBuf>,
    /// The failure text shown instead of a diagram, if any.
    pub failure: Option<String>,
}

/// Tracks what has already been reported so each render and each link is
/// surfaced once.
struct Reporter {
    output_dir: PathBuf,
    seen_generation: u64,
    seen_url: String,
    exported: Option<PathBuf>,
    failure: Option<String>,
}

impl Reporter {
    const fn new(output_dir: PathBuf, initial_url: String) -> Self {
        Self {
            output_dir,
            seen_generation: 0,
            seen_url: initial_url,
            exported: None,
            failure: None,
        }
    }

    fn report<R: DiagramRenderer + 'static>(&mut self, router: &Router<R>) -> Result<()> {
        let generation = router.orchestrator().generation();
        if generation != self.seen_generation {
            self.seen_generation = generation;
            self.report_output(router)?;
        }
        let url = router.url();
        if url != self.seen_url {
            println!("{url}");
            self.seen_url = url;
        }
        Ok(())
    }

    fn report_output<R: DiagramRenderer + 'static>(&mut self, router: &Router<R>) -> Result<()> {
        match router.output() {
            OutputArea::Empty | OutputArea::Pending => {}
            OutputArea::Diagram(_) => {
                let path = match router.export(&self.output_dir) {
                    Ok(path) => path,
                    Err(ExportError::NoDiagram) => return Ok(()),
                    Err(err) => return Err(err).context("Failed to export diagram"),
                };
                info!(path = %path.display(), "exported diagram");
                self.exported = Some(path);
                self.failure = None;
            }
            OutputArea::Failed(message) => {
                eprintln!("{message}");
                remove_export(&self.output_dir).context("Failed to remove stale diagram")?;
                self.exported = None;
                self.failure = Some(message.clone());
            }
        }
        Ok(())
    }

    fn summary(self) -> RunSummary {
        RunSummary {
            url: self.seen_url,
            exported: self.exported,
            failure: self.failure,
        }
    }
}

impl App {
    /// Render the source file once, or keep rendering it on every save when
    /// watching. Rendering work runs off the loop thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the source file cannot be read, the watcher
    /// cannot be started, or the export cannot be written.
    pub fn run<R: DiagramRenderer + 'static>(&self, renderer: R) -> Result<RunSummary> {
        let _run_scope = crate::perf::scope("app.run.total");

        let read_scope = crate::perf::scope("app.read_source");
        let content = std::fs::read_to_string(&self.source_path)
            .with_context(|| format!("Failed to read {}", self.source_path.display()))?;
        drop(read_scope);

        let initial = self
            .option_overrides
            .iter()
            .fold(ViewState::default().with_content(content.as_str()), |state, (k, v)| {
                state.with_option(k, v)
            });
        crate::perf::log_event("app.initial_state", initial.to_string());

        let binding = UrlBinding::new(Location::parse(&self.base_url), Codec::default());
        let orchestrator = RenderOrchestrator::new(renderer, self.container);
        let debounce_ms = u64::try_from(self.debounce.as_millis()).unwrap_or(u64::MAX);
        let mut router = Router::with_state(binding, orchestrator, initial)
            .with_execution(Execution::Background)
            .with_debounce_ms(debounce_ms);

        // The link printed for the file as loaded; later edits replace it.
        let state = router.state().clone();
        router.binding_mut().persist(&state);
        println!("{}", router.url());
        let mut reporter = Reporter::new(self.output_dir.clone(), router.url());

        router.start();
        if !self.watch_enabled {
            router.wait_idle();
            reporter.report(&router)?;
            return Ok(reporter.summary());
        }

        let mut watcher = SourceWatcher::new(&self.source_path, WATCH_SETTLE, &content)
            .with_context(|| format!("Failed to watch {}", self.source_path.display()))?;
        info!(path = %watcher.target_path().display(), "watching for changes");

        let started = Instant::now();
        loop {
            let now_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
            if let Some(text) = watcher.take_change() {
                router.handle(Signal::ContentChanged(text), now_ms);
            }
            router.tick(now_ms);
            if let Err(err) = reporter.report(&router) {
                warn!(error = %err, "report failed");
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }
}
