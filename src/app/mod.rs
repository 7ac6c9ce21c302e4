//! Session driver for the command-line front end.
//!
//! Plays the page around the router: the source file is the editor, its
//! saves are content-changed signals, `chart.svg` in the output directory
//! is the output area, and every new share link is printed like an address
//! bar update.

mod event_loop;

pub use event_loop::RunSummary;

use std::path::PathBuf;
use std::time::Duration;

use crate::config::DEFAULT_BASE_URL;
use crate::router::DEFAULT_DEBOUNCE_MS;
use crate::state::{LOOK_KEY, Look, THEME_KEY, Theme};
use crate::viewport::Size;

/// Container size assumed when none is given.
pub const DEFAULT_CONTAINER: Size = Size::new(1280.0, 800.0);

pub struct App {
    source_path: PathBuf,
    output_dir: PathBuf,
    watch_enabled: bool,
    debounce: Duration,
    base_url: String,
    container: Size,
    option_overrides: Vec<(String, String)>,
}

impl App {
    /// Create a session for the diagram source at `source_path`.
    ///
    /// Output goes next to the source file unless redirected.
    pub fn new(source_path: PathBuf) -> Self {
        let output_dir = source_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), std::path::Path::to_path_buf);
        Self {
            source_path,
            output_dir,
            watch_enabled: false,
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            base_url: DEFAULT_BASE_URL.to_string(),
            container: DEFAULT_CONTAINER,
            option_overrides: Vec::new(),
        }
    }

    /// Keep running and re-render on every save.
    #[must_use]
    pub fn with_watch(mut self, enabled: bool) -> Self {
        self.watch_enabled = enabled;
        self
    }

    #[must_use]
    pub fn with_output_dir(mut self, dir: PathBuf) -> Self {
        self.output_dir = dir;
        self
    }

    /// Quiet period before a burst of saves is rendered.
    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_container(mut self, container: Size) -> Self {
        self.container = container;
        self
    }

    /// Set a display option on the initial state.
    #[must_use]
    pub fn with_option(mut self, key: &str, value: &str) -> Self {
        self.option_overrides.push((key.to_string(), value.to_string()));
        self
    }

    #[must_use]
    pub fn with_theme(self, theme: Option<Theme>) -> Self {
        match theme {
            Some(theme) => self.with_option(THEME_KEY, theme.name()),
            None => self,
        }
    }

    #[must_use]
    pub fn with_look(self, look: Option<Look>) -> Self {
        match look {
            Some(look) => self.with_option(LOOK_KEY, look.name()),
            None => self,
        }
    }
}
