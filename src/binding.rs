//! URL binding: the `state` query parameter of the current history entry.
//!
//! Persisting rewrites the current entry in place (replace semantics) so
//! edits never pile up history entries. Encodes may finish out of order when
//! they run on worker threads; each one is stamped when it is started and
//! only a stamp newer than the last applied one may touch the location.

use tracing::{debug, warn};

use crate::codec::{Codec, Token};
use crate::location::{History, Location};
use crate::state::ViewState;

/// Query parameter carrying the token.
pub const STATE_PARAM: &str = "state";

/// Ordering stamp handed out by [`UrlBinding::begin_persist`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PersistStamp(u64);

/// Result of moving through history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// The entry moved to carried a readable token.
    Restored(ViewState),
    /// The entry moved to had no token, or an unreadable one.
    Defaulted,
    /// Already at the end of history in that direction.
    AtEdge,
}

#[derive(Debug, Clone)]
pub struct UrlBinding {
    history: History,
    codec: Codec,
    next_stamp: u64,
    applied: Option<PersistStamp>,
}

impl UrlBinding {
    pub fn new(location: Location, codec: Codec) -> Self {
        Self {
            history: History::new(location),
            codec,
            next_stamp: 0,
            applied: None,
        }
    }

    pub const fn codec(&self) -> Codec {
        self.codec
    }

    pub const fn history(&self) -> &History {
        &self.history
    }

    pub fn location(&self) -> &Location {
        self.history.current()
    }

    pub fn url(&self) -> String {
        self.history.current().to_string()
    }

    /// Read and decode the token of the current entry.
    ///
    /// A missing or unreadable token both yield `None`; the latter is logged.
    pub fn load_from_location(&self) -> Option<ViewState> {
        read_state(self.codec, self.history.current())
    }

    /// Encode `state` and write it into the current entry.
    pub fn persist(&mut self, state: &ViewState) {
        let stamp = self.begin_persist();
        let token = self.codec.encode(state);
        self.apply_token(stamp, &token);
    }

    /// Reserve a stamp for an encode that will complete later.
    pub const fn begin_persist(&mut self) -> PersistStamp {
        self.next_stamp += 1;
        PersistStamp(self.next_stamp)
    }

    /// Write a finished token unless a newer one has already been written.
    ///
    /// Returns `true` when the location was updated.
    pub fn apply_token(&mut self, stamp: PersistStamp, token: &Token) -> bool {
        if self.applied.is_some_and(|applied| applied >= stamp) {
            debug!(?stamp, applied = ?self.applied, "discarding superseded token");
            crate::perf::log_event("persist.stale", format!("stamp={}", stamp.0));
            return false;
        }
        self.applied = Some(stamp);
        let next = self
            .history
            .current()
            .with_param(STATE_PARAM, token.as_str());
        self.history.replace(next);
        crate::perf::log_event(
            "persist.apply",
            format!("stamp={} token_len={}", stamp.0, token.as_str().len()),
        );
        true
    }

    /// Add a new history entry (a fresh page visit).
    pub fn push(&mut self, location: Location) {
        self.history.push(location);
        self.supersede_pending();
    }

    /// Go back one entry and decode it.
    pub fn back(&mut self) -> Navigation {
        if self.history.back().is_none() {
            return Navigation::AtEdge;
        }
        self.supersede_pending();
        navigation_for(self.codec, self.history.current())
    }

    /// Go forward one entry and decode it.
    pub fn forward(&mut self) -> Navigation {
        if self.history.forward().is_none() {
            return Navigation::AtEdge;
        }
        self.supersede_pending();
        navigation_for(self.codec, self.history.current())
    }

    /// Encodes started for the entry just left must not land on the new one.
    const fn supersede_pending(&mut self) {
        self.applied = Some(PersistStamp(self.next_stamp));
    }
}

fn navigation_for(codec: Codec, location: &Location) -> Navigation {
    read_state(codec, location).map_or(Navigation::Defaulted, Navigation::Restored)
}

fn read_state(codec: Codec, location: &Location) -> Option<ViewState> {
    let token = location.param(STATE_PARAM)?;
    match codec.decode(token) {
        Ok(state) => Some(state),
        Err(err) => {
            warn!(error = %err, token_len = token.len(), "ignoring unreadable state token");
            crate::perf::log_event("decode.error", err.to_string());
            None
        }
    }
}
