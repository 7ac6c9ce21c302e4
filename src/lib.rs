// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. render::RenderError)
    clippy::module_name_repetitions
)]

//! # Livechart
//!
//! Live Mermaid diagram editing with shareable links.
//!
//! The whole editing session (diagram text plus display options) lives in
//! one URL query parameter, so a link reproduces exactly what its author saw.
//!
//! ## Flow
//!
//! Every change goes through the same path:
//! - a [`router::Signal`] arrives (edit, option change, resize, navigation)
//! - the router derives a new immutable [`state::ViewState`]
//! - the [`render::RenderOrchestrator`] renders it into the output area
//! - the [`binding::UrlBinding`] encodes it into the location, replacing
//!   the current history entry
//!
//! ## Modules
//!
//! - [`state`]: the view state and its display options
//! - [`codec`]: state to URL-safe token and back
//! - [`location`]: URLs and replace-semantics history
//! - [`binding`]: keeps the location in step with the state
//! - [`render`]: render orchestration and the Mermaid CLI engine
//! - [`viewport`]: pan/zoom attached to the displayed diagram
//! - [`export`]: writes the displayed diagram to `chart.svg`
//! - [`router`]: routes signals to render and persist
//! - [`watcher`]: turns saves of the source file into edits
//! - [`app`]: the command-line session loop

pub mod app;
pub mod binding;
pub mod codec;
pub mod config;
pub mod export;
pub mod location;
pub mod perf;
pub mod render;
pub mod router;
pub mod state;
pub mod viewport;
pub mod watcher;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::app::App;
    pub use crate::binding::UrlBinding;
    pub use crate::codec::{Codec, Token, TokenFormat};
    pub use crate::location::Location;
    pub use crate::render::{DiagramRenderer, MmdcRenderer, RenderOrchestrator};
    pub use crate::router::{Router, Signal};
    pub use crate::state::ViewState;
}
