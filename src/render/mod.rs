//! Render orchestration.
//!
//! The diagram engine itself is a collaborator behind [`DiagramRenderer`].
//! This module only:
//! - derives the engine configuration from the state's options
//! - clears the output area before every attempt
//! - routes the engine's answer into the output area, dropping answers that
//!   arrive after a newer render has started
//! - hands successful output to [`ViewSync`]

pub mod mmdc;

use std::sync::Arc;

use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use crate::state::{Look, Options, Theme, ViewState};
use crate::viewport::{Size, ViewSync, ViewportHandle};

pub use mmdc::MmdcRenderer;

/// Prefix of every failure message shown in the output area.
pub const FAILURE_PREFIX: &str = "Error rendering chart";

#[derive(Debug, Error)]
pub enum RenderError {
    /// The engine rejected the diagram source.
    #[error("{0}")]
    Diagram(String),
    /// The engine could not be started at all.
    #[error("renderer unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Font settings tied to a [`Look`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontProfile {
    pub family: &'static str,
    pub size_px: u16,
}

impl Look {
    /// Font table. New looks get a row here; existing rows stay put.
    pub const fn font_profile(self) -> FontProfile {
        match self {
            Self::HandDrawn => FontProfile {
                family: "Comic Sans MS",
                size_px: 16,
            },
            Self::Classic => FontProfile {
                family: "Arial",
                size_px: 14,
            },
        }
    }
}

/// Engine configuration derived from a state's options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderConfig {
    pub theme: Theme,
    pub look: Look,
    pub font: FontProfile,
}

impl RenderConfig {
    /// Pure mapping from options to configuration.
    pub fn from_options(options: &Options) -> Self {
        let look = options.look();
        Self {
            theme: options.theme(),
            look,
            font: look.font_profile(),
        }
    }

    /// Mermaid configuration object for this setup.
    pub fn to_mermaid_json(&self) -> serde_json::Value {
        json!({
            "startOnLoad": false,
            "theme": self.theme.name(),
            "look": self.look.name(),
            "themeVariables": {
                "fontFamily": self.font.family,
                "fontSize": format!("{}px", self.font.size_px),
            },
        })
    }
}

/// Turns diagram source into SVG markup.
pub trait DiagramRenderer: Send + Sync {
    /// # Errors
    ///
    /// Returns an error when the source is not a valid diagram or the engine fails.
    fn render(&self, source: &str, config: &RenderConfig) -> Result<String, RenderError>;
}

impl<R: DiagramRenderer + ?Sized> DiagramRenderer for Arc<R> {
    fn render(&self, source: &str, config: &RenderConfig) -> Result<String, RenderError> {
        (**self).render(source, config)
    }
}

/// What a render attempt produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    Success(Arc<str>),
    Failure(String),
}

/// The displayed diagram and its pan/zoom controller.
#[derive(Debug)]
pub struct RenderSession {
    svg: Arc<str>,
    viewport: Option<ViewportHandle>,
}

impl RenderSession {
    pub fn svg(&self) -> &str {
        &self.svg
    }

    pub const fn viewport(&self) -> Option<&ViewportHandle> {
        self.viewport.as_ref()
    }

    pub const fn viewport_mut(&mut self) -> Option<&mut ViewportHandle> {
        self.viewport.as_mut()
    }
}

/// Contents of the output area.
#[derive(Debug, Default)]
pub enum OutputArea {
    #[default]
    Empty,
    /// Cleared, waiting for the engine.
    Pending,
    Diagram(RenderSession),
    Failed(String),
}

impl OutputArea {
    pub const fn session(&self) -> Option<&RenderSession> {
        match self {
            Self::Diagram(session) => Some(session),
            _ => None,
        }
    }

    pub fn svg(&self) -> Option<&str> {
        self.session().map(RenderSession::svg)
    }

    pub fn failure(&self) -> Option<&str> {
        match self {
            Self::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// Identifies one render attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RenderTicket(u64);

impl RenderTicket {
    pub const fn id(self) -> u64 {
        self.0
    }
}

/// Owns the output area and drives the renderer.
pub struct RenderOrchestrator<R> {
    renderer: Arc<R>,
    output: OutputArea,
    view_sync: ViewSync,
    latest: u64,
    generation: u64,
}

impl<R: DiagramRenderer> RenderOrchestrator<R> {
    pub fn new(renderer: R, container: Size) -> Self {
        Self::with_shared(Arc::new(renderer), container)
    }

    pub const fn with_shared(renderer: Arc<R>, container: Size) -> Self {
        Self {
            renderer,
            output: OutputArea::Empty,
            view_sync: ViewSync::new(container),
            latest: 0,
            generation: 0,
        }
    }

    /// Shared handle to the renderer, for running renders off-thread.
    pub fn renderer(&self) -> Arc<R> {
        Arc::clone(&self.renderer)
    }

    pub const fn output(&self) -> &OutputArea {
        &self.output
    }

    pub const fn view_sync(&self) -> &ViewSync {
        &self.view_sync
    }

    /// Bumped every time the output area changes.
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Start a render attempt: release the current viewport and clear the output.
    pub fn begin(&mut self) -> RenderTicket {
        self.latest += 1;
        self.replace_output(OutputArea::Pending);
        crate::perf::log_event("render.begin", format!("ticket={}", self.latest));
        RenderTicket(self.latest)
    }

    /// Deliver the engine's answer for `ticket`.
    ///
    /// Returns `None` when a newer render has been started since; the answer
    /// is dropped and the output area is left alone.
    pub fn finish(
        &mut self,
        ticket: RenderTicket,
        result: Result<String, RenderError>,
    ) -> Option<RenderOutcome> {
        if ticket.0 != self.latest {
            debug!(ticket = ticket.0, latest = self.latest, "discarding stale render");
            crate::perf::log_event(
                "render.stale",
                format!("ticket={} latest={}", ticket.0, self.latest),
            );
            return None;
        }

        let outcome = match result {
            Ok(svg) => {
                self.release_viewport();
                let svg: Arc<str> = Arc::from(svg);
                let viewport = match self.view_sync.attach(&svg) {
                    Ok(handle) => Some(handle),
                    Err(err) => {
                        warn!(error = %err, "showing diagram without pan/zoom");
                        None
                    }
                };
                self.replace_output(OutputArea::Diagram(RenderSession {
                    svg: Arc::clone(&svg),
                    viewport,
                }));
                RenderOutcome::Success(svg)
            }
            Err(err) => {
                let message = failure_message(&err);
                debug!(%message, "render failed");
                self.replace_output(OutputArea::Failed(message.clone()));
                RenderOutcome::Failure(message)
            }
        };
        crate::perf::log_event(
            "render.finish",
            format!(
                "ticket={} ok={}",
                ticket.0,
                matches!(outcome, RenderOutcome::Success(_))
            ),
        );
        Some(outcome)
    }

    /// Render `state` synchronously.
    pub fn render(&mut self, state: &ViewState) -> RenderOutcome {
        let _scope = crate::perf::scope("render.sync");
        let ticket = self.begin();
        let config = RenderConfig::from_options(state.options());
        let result = self.renderer.render(state.content(), &config);
        // The ticket was just issued, so it is always current.
        self.finish(ticket, result)
            .unwrap_or_else(|| RenderOutcome::Failure(format!("{FAILURE_PREFIX}: superseded")))
    }

    /// Forward a container resize to the displayed diagram's viewport.
    pub fn on_container_resize(&mut self, size: Size) {
        let handle = match &mut self.output {
            OutputArea::Diagram(session) => session.viewport.as_mut(),
            _ => None,
        };
        self.view_sync.on_container_resize(size, handle);
    }

    fn release_viewport(&mut self) {
        if let OutputArea::Diagram(session) = &mut self.output
            && let Some(handle) = session.viewport.take()
        {
            self.view_sync.detach(handle);
        }
    }

    /// Swap in `next`, detaching the viewport of any diagram it replaces.
    fn replace_output(&mut self, next: OutputArea) {
        let previous = std::mem::replace(&mut self.output, next);
        if let OutputArea::Diagram(RenderSession {
            viewport: Some(handle),
            ..
        }) = previous
        {
            self.view_sync.detach(handle);
        }
        self.generation += 1;
    }
}

fn failure_message(err: &RenderError) -> String {
    let detail = err.to_string();
    let detail = detail.trim();
    if detail.is_empty() {
        format!("{FAILURE_PREFIX}: unknown error")
    } else {
        format!("{FAILURE_PREFIX}: {detail}")
    }
}
