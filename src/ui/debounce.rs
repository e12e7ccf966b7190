use super::{Button, ButtonEvent};

/// Timestamp-window debouncer with one independent timer per button.
///
/// Runs in the edge handler: O(1), never blocks, never touches storage or
/// the display. A second edge inside the window is dropped, not queued.
pub struct Debouncer {
    window_ms: u64,
    last_accepted: [u64; Button::COUNT],
}

impl Debouncer {
    pub const fn new(window_ms: u64) -> Self {
        Self {
            window_ms,
            last_accepted: [0; Button::COUNT],
        }
    }

    /// Feed one raw edge. Returns the event to enqueue, if accepted.
    pub fn on_edge(&mut self, button: Button, timestamp_ms: u64) -> Option<ButtonEvent> {
        let last = &mut self.last_accepted[button.index()];
        if timestamp_ms.saturating_sub(*last) > self.window_ms {
            *last = timestamp_ms;
            Some(ButtonEvent {
                button,
                timestamp_ms,
            })
        } else {
            None
        }
    }
}
