//! Signal routing between the editor, the URL and the output area.
//!
//! Every content or option signal produces a new [`ViewState`]; the router
//! renders it and then persists it. Resize signals only touch the viewport.
//! Back/forward navigation re-reads the token and re-renders without
//! writing the URL.
//!
//! Work may run inline or on worker threads ([`Execution`]). Off-thread
//! results come back over a channel and are applied by [`Router::pump`];
//! stale ones are dropped by the orchestrator's ticket check and the
//! binding's stamp check, so the newest state always wins.

mod debounce;

pub use debounce::EditDebouncer;

use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};

use tracing::debug;

use crate::binding::{Navigation, PersistStamp, UrlBinding};
use crate::codec::Token;
use crate::export::{ExportError, export_svg};
use crate::render::{
    DiagramRenderer, OutputArea, RenderConfig, RenderError, RenderOrchestrator, RenderTicket,
};
use crate::state::ViewState;
use crate::viewport::Size;

/// Default quiet period before an edit is rendered.
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// Direction of a history navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Back,
    Forward,
}

/// Inputs the router reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    /// The editor's text changed.
    ContentChanged(String),
    /// A display option selector changed.
    OptionChanged { key: String, value: String },
    /// The output container changed size.
    ContainerResized(Size),
    /// The user moved through history.
    Navigated(Direction),
}

/// Where render and encode work runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Execution {
    /// On the caller's thread, before `handle` returns.
    Inline,
    /// On worker threads; results are applied by [`Router::pump`].
    Background,
}

enum Completion {
    Rendered {
        ticket: RenderTicket,
        result: Result<String, RenderError>,
    },
    Encoded {
        stamp: PersistStamp,
        token: Token,
    },
}

pub struct Router<R> {
    state: Arc<ViewState>,
    binding: UrlBinding,
    orchestrator: RenderOrchestrator<R>,
    edits: EditDebouncer,
    execution: Execution,
    tx: Sender<Completion>,
    rx: Receiver<Completion>,
    in_flight: usize,
}

impl<R: DiagramRenderer + 'static> Router<R> {
    /// Build a router whose state comes from the binding's current location,
    /// or the default state when the location carries no readable token.
    pub fn load(binding: UrlBinding, orchestrator: RenderOrchestrator<R>) -> Self {
        let state = binding.load_from_location().unwrap_or_default();
        Self::with_state(binding, orchestrator, state)
    }

    /// Build a router around an explicit starting state.
    pub fn with_state(
        binding: UrlBinding,
        orchestrator: RenderOrchestrator<R>,
        state: ViewState,
    ) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            state: Arc::new(state),
            binding,
            orchestrator,
            edits: EditDebouncer::new(DEFAULT_DEBOUNCE_MS),
            execution: Execution::Inline,
            tx,
            rx,
            in_flight: 0,
        }
    }

    #[must_use]
    pub fn with_execution(mut self, execution: Execution) -> Self {
        self.execution = execution;
        self
    }

    /// Set the edit debounce. Zero renders every edit immediately.
    #[must_use]
    pub fn with_debounce_ms(mut self, delay_ms: u64) -> Self {
        self.edits = EditDebouncer::new(delay_ms);
        self
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub const fn binding(&self) -> &UrlBinding {
        &self.binding
    }

    pub const fn binding_mut(&mut self) -> &mut UrlBinding {
        &mut self.binding
    }

    pub const fn orchestrator(&self) -> &RenderOrchestrator<R> {
        &self.orchestrator
    }

    pub const fn output(&self) -> &OutputArea {
        self.orchestrator.output()
    }

    pub fn url(&self) -> String {
        self.binding.url()
    }

    pub const fn has_pending_edit(&self) -> bool {
        self.edits.is_pending()
    }

    pub const fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Render the current state as on first page load. The URL is left alone.
    pub fn start(&mut self) {
        crate::perf::log_event("router.start", self.state.to_string());
        self.dispatch_render();
    }

    /// React to one signal. `now_ms` is a monotonic clock used for debouncing.
    pub fn handle(&mut self, signal: Signal, now_ms: u64) {
        match signal {
            Signal::ContentChanged(content) => {
                if self.edits.delay_ms() == 0 {
                    self.apply_content(content);
                } else {
                    self.edits.queue(content, now_ms);
                }
            }
            Signal::OptionChanged { key, value } => {
                self.flush_edit();
                let next = self.state.with_option(&key, &value);
                self.transition(next);
            }
            Signal::ContainerResized(size) => {
                self.orchestrator.on_container_resize(size);
            }
            Signal::Navigated(direction) => {
                self.flush_edit();
                let navigation = match direction {
                    Direction::Back => self.binding.back(),
                    Direction::Forward => self.binding.forward(),
                };
                match navigation {
                    Navigation::Restored(state) => self.restore(state),
                    Navigation::Defaulted => self.restore(ViewState::default()),
                    Navigation::AtEdge => {}
                }
            }
        }
    }

    /// Release a debounced edit whose quiet period has passed, then apply
    /// any finished background work.
    pub fn tick(&mut self, now_ms: u64) {
        if let Some(content) = self.edits.take_ready(now_ms) {
            self.apply_content(content);
        }
        self.pump();
    }

    /// Apply a pending edit immediately.
    pub fn flush_edit(&mut self) {
        if let Some(content) = self.edits.take() {
            self.apply_content(content);
        }
    }

    /// Make `next` the current state: render it, then persist it.
    ///
    /// Returns `false` when `next` equals the current state and nothing ran.
    pub fn replace_state(&mut self, next: ViewState) -> bool {
        self.transition(next)
    }

    /// Apply every background result that has arrived. Returns how many.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.rx.try_recv() {
            self.complete(completion);
            applied += 1;
        }
        applied
    }

    /// Block until all background work has been applied.
    pub fn wait_idle(&mut self) {
        while self.in_flight > 0 {
            // Never fails: the router holds a sender itself.
            let Ok(completion) = self.rx.recv() else {
                break;
            };
            self.complete(completion);
        }
    }

    /// Export the displayed diagram into `dir`.
    ///
    /// # Errors
    ///
    /// See [`export_svg`].
    pub fn export(&self, dir: &Path) -> Result<PathBuf, ExportError> {
        export_svg(self.orchestrator.output(), dir)
    }

    fn apply_content(&mut self, content: String) {
        let next = self.state.with_content(content);
        self.transition(next);
    }

    fn transition(&mut self, next: ViewState) -> bool {
        if next == *self.state {
            crate::perf::log_event("router.duplicate", next.to_string());
            return false;
        }
        crate::perf::log_event("router.transition", next.to_string());
        self.state = Arc::new(next);
        self.dispatch_render();
        self.dispatch_persist();
        true
    }

    fn restore(&mut self, state: ViewState) {
        if state == *self.state {
            return;
        }
        debug!(%state, "restoring state from history");
        self.state = Arc::new(state);
        self.dispatch_render();
    }

    fn dispatch_render(&mut self) {
        match self.execution {
            Execution::Inline => {
                self.orchestrator.render(&self.state);
            }
            Execution::Background => {
                let ticket = self.orchestrator.begin();
                let renderer = self.orchestrator.renderer();
                let state = Arc::clone(&self.state);
                let tx = self.tx.clone();
                self.in_flight += 1;
                std::thread::spawn(move || {
                    let config = RenderConfig::from_options(state.options());
                    // A panicking engine must still report, or wait_idle never returns.
                    let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
                        renderer.render(state.content(), &config)
                    }))
                    .unwrap_or_else(|_| Err(RenderError::Diagram("renderer panicked".into())));
                    let _ = tx.send(Completion::Rendered { ticket, result });
                });
            }
        }
    }

    fn dispatch_persist(&mut self) {
        match self.execution {
            Execution::Inline => self.binding.persist(&self.state),
            Execution::Background => {
                let stamp = self.binding.begin_persist();
                let codec = self.binding.codec();
                let state = Arc::clone(&self.state);
                let tx = self.tx.clone();
                self.in_flight += 1;
                std::thread::spawn(move || {
                    let token = codec.encode(&state);
                    let _ = tx.send(Completion::Encoded { stamp, token });
                });
            }
        }
    }

    fn complete(&mut self, completion: Completion) {
        self.in_flight = self.in_flight.saturating_sub(1);
        match completion {
            Completion::Rendered { ticket, result } => {
                self.orchestrator.finish(ticket, result);
            }
            Completion::Encoded { stamp, token } => {
                self.binding.apply_token(stamp, &token);
            }
        }
    }
}

#[cfg(test)]
mod tests;
