/// Coalesces bursts of content edits into the last one.
///
/// A queued edit replaces any edit still waiting, and is released once no
/// newer edit has arrived for `delay_ms`.
#[derive(Debug)]
pub struct EditDebouncer {
    delay_ms: u64,
    pending: Option<(String, u64)>,
}

impl EditDebouncer {
    pub const fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            pending: None,
        }
    }

    pub const fn delay_ms(&self) -> u64 {
        self.delay_ms
    }

    pub fn queue(&mut self, content: String, now_ms: u64) {
        self.pending = Some((content, now_ms));
    }

    pub fn take_ready(&mut self, now_ms: u64) -> Option<String> {
        let queued_at = self.pending.as_ref()?.1;
        if now_ms.saturating_sub(queued_at) >= self.delay_ms {
            self.take()
        } else {
            None
        }
    }

    /// Release the pending edit regardless of the delay.
    pub fn take(&mut self) -> Option<String> {
        self.pending.take().map(|(content, _)| content)
    }

    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
