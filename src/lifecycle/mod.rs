//! Sampling / mount lifecycle state machine.
//!
//! One owned [`Lifecycle`] aggregate holds every piece of mutable state:
//! mount state and intent, sampling state, menu page, counters, the
//! message queue and the heartbeat timer. The poll loop calls
//! [`Lifecycle::tick`] once per iteration with the current time, the
//! button events drained from the channel, and the collaborators.
//!
//! ```text
//! Idle --(start)--> Running --(stop)--> Stopping --(file closed)--> Idle
//! Running --(open failure)--> Idle
//! ```
//!
//! Mount and unmount are only accepted while sampling is `Idle`.

#[cfg(test)]
mod tests;

use heapless::{Deque, Vec};

use crate::config::{KeyColumn, LoggerConfig, RenderPolicy, MESSAGE_QUEUE_DEPTH, STOP_TONES};
use crate::csv;
use crate::peripherals::{
    Devices, DisplayRenderer, Indicator, LedColor, SensorReader, StorageSession,
};
use crate::ui::menu::{self, messages, ActionMessage};
use crate::ui::{Button, ButtonEvent, MenuPage};
use crate::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MountState {
    Unmounted,
    Mounted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SamplingState {
    Idle,
    Running,
    Stopping,
}

/// A sampling state change observed during a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Transition {
    pub from: SamplingState,
    pub to: SamplingState,
}

/// Upper bound of transitions in one tick: a burst of queued start/stop
/// presses plus the automatic exit from `Stopping`.
pub const MAX_TRANSITIONS_PER_TICK: usize = 8;

/// What a single [`Lifecycle::tick`] did.
#[derive(Clone, Debug, Default)]
pub struct TickReport {
    pub transitions: Vec<Transition, MAX_TRANSITIONS_PER_TICK>,
    /// The tick was swallowed by an on-screen action message.
    pub held: bool,
}

/// Read-only view of the state shown on screen and over serial.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusSnapshot {
    pub mount: MountState,
    pub sampling: SamplingState,
    pub page: MenuPage,
    pub samples: u32,
    pub lines: u32,
    pub failed_writes: u32,
    pub failed_reads: u32,
}

#[derive(Clone, Copy, Debug)]
struct ShownMessage {
    message: ActionMessage,
    until_ms: u64,
}

pub struct Lifecycle {
    config: LoggerConfig,

    mount: MountState,
    /// Intent flipped by the mount button; acted on by `tick_mount`.
    mount_requested: bool,

    sampling: SamplingState,
    file_open: bool,
    session_start_ms: u64,
    samples: u32,
    lines: u32,
    failed_writes: u32,
    failed_reads: u32,

    page: MenuPage,
    redraw: bool,

    led_lit: bool,
    last_blink_ms: Option<u64>,

    shown: Option<ShownMessage>,
    queued: Deque<ActionMessage, MESSAGE_QUEUE_DEPTH>,
}

impl Lifecycle {
    pub fn new(config: LoggerConfig) -> Self {
        Self {
            config,
            mount: MountState::Unmounted,
            mount_requested: false,
            sampling: SamplingState::Idle,
            file_open: false,
            session_start_ms: 0,
            samples: 0,
            lines: 0,
            failed_writes: 0,
            failed_reads: 0,
            page: MenuPage::Main,
            redraw: true,
            led_lit: false,
            last_blink_ms: None,
            shown: None,
            queued: Deque::new(),
        }
    }

    /// Run one poll iteration.
    ///
    /// While an action message is on screen nothing else happens and
    /// `events` is left untouched, so presses stay queued in the channel.
    pub fn tick<S, R, D, I, E>(
        &mut self,
        now_ms: u64,
        events: E,
        devices: &mut Devices<S, R, D, I>,
    ) -> TickReport
    where
        S: StorageSession,
        R: SensorReader,
        D: DisplayRenderer,
        I: Indicator,
        E: IntoIterator<Item = ButtonEvent>,
    {
        let mut report = TickReport::default();

        if self.hold_for_message(now_ms, &mut devices.display, &mut devices.indicator) {
            report.held = true;
            return report;
        }

        self.handle_events(now_ms, events, &mut report);
        self.tick_mount(&mut devices.storage, &mut devices.indicator);
        self.tick_sampling(
            now_ms,
            &mut devices.storage,
            &mut devices.sensor,
            &mut devices.indicator,
            &mut report,
        );
        self.tick_heartbeat(now_ms, &mut devices.indicator);
        self.render_if_needed(now_ms, &mut devices.display, &mut devices.indicator);

        debug_assert!(
            self.sampling != SamplingState::Idle || !self.file_open,
            "log file left open while idle"
        );
        report
    }

    /// Queue an action message. It pre-empts the menu on the next render.
    pub fn show(&mut self, message: ActionMessage) {
        if self.queued.is_full() {
            warn!("message queue full, dropping oldest");
            self.queued.pop_front();
        }
        let _ = self.queued.push_back(message);
    }

    /// Stream the log file into `sink`. Only while idle and mounted.
    pub fn dump<S: StorageSession>(
        &self,
        storage: &mut S,
        sink: &mut dyn FnMut(&[u8]),
    ) -> Result<usize, Error> {
        if self.sampling != SamplingState::Idle {
            return Err(Error::Busy);
        }
        if self.mount != MountState::Mounted {
            return Err(Error::NotMounted);
        }
        let bytes = storage.read_file(self.config.file_name, sink)?;
        info!("dumped {} bytes of {}", bytes, self.config.file_name);
        Ok(bytes)
    }

    pub fn status(&self) -> StatusSnapshot {
        StatusSnapshot {
            mount: self.mount,
            sampling: self.sampling,
            page: self.page,
            samples: self.samples,
            lines: self.lines,
            failed_writes: self.failed_writes,
            failed_reads: self.failed_reads,
        }
    }

    /// When the message currently on screen expires, if any.
    pub fn message_deadline(&self) -> Option<u64> {
        self.shown.as_ref().map(|s| s.until_ms)
    }

    pub fn active_message(&self) -> Option<&ActionMessage> {
        self.shown.as_ref().map(|s| &s.message)
    }

    pub fn mount_state(&self) -> MountState {
        self.mount
    }

    pub fn mount_requested(&self) -> bool {
        self.mount_requested
    }

    pub fn sampling_state(&self) -> SamplingState {
        self.sampling
    }

    pub fn page(&self) -> MenuPage {
        self.page
    }

    pub fn sample_count(&self) -> u32 {
        self.samples
    }

    pub fn line_count(&self) -> u32 {
        self.lines
    }

    pub fn failed_writes(&self) -> u32 {
        self.failed_writes
    }

    pub fn failed_reads(&self) -> u32 {
        self.failed_reads
    }

    pub fn is_file_open(&self) -> bool {
        self.file_open
    }

    // ── message gate ────────────────────────────────────────────────────

    /// Returns true when the tick must stop here because a message owns
    /// the screen.
    fn hold_for_message<D: DisplayRenderer, I: Indicator>(
        &mut self,
        now_ms: u64,
        display: &mut D,
        indicator: &mut I,
    ) -> bool {
        if let Some(shown) = &self.shown {
            if now_ms < shown.until_ms {
                return true;
            }
            trace!("message expired at {}", now_ms);
            self.shown = None;
            self.led_lit = false;
            indicator.set_color(LedColor::Off);
            self.redraw = true;
        }
        self.show_next_message(now_ms, display, indicator)
    }

    fn show_next_message<D: DisplayRenderer, I: Indicator>(
        &mut self,
        now_ms: u64,
        display: &mut D,
        indicator: &mut I,
    ) -> bool {
        let Some(message) = self.queued.pop_front() else {
            return false;
        };
        let duration = message.duration_ms.unwrap_or(self.config.message_duration_ms);
        debug!("showing message {} for {} ms", message.lines, duration);
        menu::draw_message(display, &message);
        indicator.set_color(message.color);
        self.shown = Some(ShownMessage {
            message,
            until_ms: now_ms.saturating_add(duration),
        });
        true
    }

    // ── button events ───────────────────────────────────────────────────

    fn handle_events<E>(&mut self, now_ms: u64, events: E, report: &mut TickReport)
    where
        E: IntoIterator<Item = ButtonEvent>,
    {
        let mut pending = [0u8; Button::COUNT];
        for event in events {
            debug!("button {} pressed at {}", event.button, event.timestamp_ms);
            let slot = &mut pending[event.button.index()];
            *slot = slot.saturating_add(1);
        }

        for button in Button::PRIORITY {
            for _ in 0..pending[button.index()] {
                self.apply(button, now_ms, report);
            }
        }
    }

    fn apply(&mut self, button: Button, now_ms: u64, report: &mut TickReport) {
        match button {
            Button::StartStop => match self.sampling {
                SamplingState::Idle => {
                    self.reset_counters();
                    self.session_start_ms = now_ms;
                    self.last_blink_ms = None;
                    self.transition(SamplingState::Running, report);
                }
                SamplingState::Running => self.transition(SamplingState::Stopping, report),
                SamplingState::Stopping => debug!("start/stop ignored while stopping"),
            },
            Button::MountToggle => {
                if self.sampling == SamplingState::Idle {
                    self.mount_requested = !self.mount_requested;
                    info!("mount requested: {}", self.mount_requested);
                } else {
                    warn!("mount toggle refused while sampling is {}", self.sampling);
                    self.show(messages::STOP_FIRST);
                }
            }
            Button::PageCycle => {
                self.page = self.page.next();
                self.redraw = true;
                debug!("page -> {}", self.page);
            }
        }
    }

    // ── storage mount ───────────────────────────────────────────────────

    fn tick_mount<S: StorageSession, I: Indicator>(&mut self, storage: &mut S, indicator: &mut I) {
        let mounted = self.mount == MountState::Mounted;
        if self.mount_requested == mounted {
            return;
        }

        indicator.set_color(LedColor::Blue);
        if self.mount_requested {
            info!("mounting sd card");
            match storage.mount() {
                Ok(()) => {
                    self.mount = MountState::Mounted;
                    info!("sd card mounted");
                    self.show(messages::MOUNT_OK);
                }
                Err(e) => {
                    self.mount_requested = false;
                    warn!("mount failed: {}", e);
                    self.show(messages::MOUNT_FAILED);
                    self.show(messages::RETRY_TOGGLE);
                }
            }
        } else {
            info!("unmounting sd card");
            match storage.unmount() {
                Ok(()) => {
                    self.mount = MountState::Unmounted;
                    info!("sd card unmounted");
                    self.show(messages::UNMOUNT_OK);
                }
                Err(e) => {
                    self.mount_requested = true;
                    warn!("unmount failed: {}", e);
                    self.show(messages::UNMOUNT_FAILED);
                    self.show(messages::RETRY_TOGGLE);
                }
            }
        }
        self.redraw = true;
    }

    // ── sampling ────────────────────────────────────────────────────────

    fn tick_sampling<S, R, I>(
        &mut self,
        now_ms: u64,
        storage: &mut S,
        sensor: &mut R,
        indicator: &mut I,
        report: &mut TickReport,
    ) where
        S: StorageSession,
        R: SensorReader,
        I: Indicator,
    {
        match self.sampling {
            SamplingState::Idle => {}
            SamplingState::Running => self.log_sample(now_ms, storage, sensor, report),
            SamplingState::Stopping => self.finish_session(storage, indicator, report),
        }
    }

    fn log_sample<S: StorageSession, R: SensorReader>(
        &mut self,
        now_ms: u64,
        storage: &mut S,
        sensor: &mut R,
        report: &mut TickReport,
    ) {
        if !self.file_open {
            if let Err(e) = storage.open_write(self.config.file_name) {
                error!("cannot open {}: {}", self.config.file_name, e);
                self.show(messages::START_FAILED);
                self.show(messages::MOUNT_FIRST);
                self.reset_counters();
                self.transition(SamplingState::Idle, report);
                return;
            }
            info!("opened {}", self.config.file_name);
            self.file_open = true;
        }

        // First line of every session is the header; no sample this tick.
        if self.lines == 0 {
            match storage.append(csv::header(self.config.key_column).as_bytes()) {
                Ok(()) => self.lines = 1,
                Err(e) => self.record_write_failure(e),
            }
            return;
        }

        let sample = match sensor.read() {
            Ok(sample) => sample,
            Err(e) => {
                self.failed_reads = self.failed_reads.saturating_add(1);
                warn!("sensor read failed: {} ({} so far)", e, self.failed_reads);
                self.touch_status_page();
                return;
            }
        };

        self.samples = self.samples.saturating_add(1);
        let key = match self.config.key_column {
            KeyColumn::ElapsedMs => now_ms.saturating_sub(self.session_start_ms),
            KeyColumn::SampleIndex => u64::from(self.samples),
        };

        match csv::format_row(key, &sample).and_then(|row| storage.append(row.as_bytes())) {
            Ok(()) => self.lines = self.lines.saturating_add(1),
            Err(e) => self.record_write_failure(e),
        }
        self.touch_status_page();
    }

    fn finish_session<S: StorageSession, I: Indicator>(
        &mut self,
        storage: &mut S,
        indicator: &mut I,
        report: &mut TickReport,
    ) {
        let saved = self.file_open;
        if saved {
            if let Err(e) = storage.close() {
                warn!("closing {} failed: {}", self.config.file_name, e);
            }
            self.file_open = false;
            info!(
                "session closed: {} lines, {} failed writes",
                self.lines,
                self.failed_writes
            );
        } else {
            debug!("session stopped before the log file was opened");
        }

        self.reset_counters();
        self.transition(SamplingState::Idle, report);

        // Nothing was written, so there is nothing to confirm.
        if saved {
            for (freq_hz, duration_ms) in STOP_TONES {
                indicator.tone(freq_hz, duration_ms);
            }
            self.show(messages::SESSION_SAVED);
        }
    }

    fn record_write_failure(&mut self, e: Error) {
        self.failed_writes = self.failed_writes.saturating_add(1);
        warn!("write failed: {} ({} so far)", e, self.failed_writes);
    }

    fn reset_counters(&mut self) {
        self.samples = 0;
        self.lines = 0;
        self.failed_writes = 0;
        self.failed_reads = 0;
    }

    fn transition(&mut self, to: SamplingState, report: &mut TickReport) {
        let from = self.sampling;
        info!("sampling {} -> {}", from, to);
        self.sampling = to;
        self.redraw = true;
        if report.transitions.push(Transition { from, to }).is_err() {
            warn!("transition log full");
        }
    }

    // ── feedback ────────────────────────────────────────────────────────

    fn tick_heartbeat<I: Indicator>(&mut self, now_ms: u64, indicator: &mut I) {
        if self.sampling == SamplingState::Running {
            let due = self
                .last_blink_ms
                .map_or(true, |last| now_ms.saturating_sub(last) >= self.config.blink_period_ms);
            if due {
                self.led_lit = !self.led_lit;
                indicator.set_color(if self.led_lit { LedColor::Blue } else { LedColor::Off });
                self.last_blink_ms = Some(now_ms);
            }
        } else if self.led_lit {
            self.led_lit = false;
            indicator.set_color(LedColor::Off);
        }
    }

    fn touch_status_page(&mut self) {
        if self.page == MenuPage::SamplingStatus {
            self.redraw = true;
        }
    }

    fn render_if_needed<D: DisplayRenderer, I: Indicator>(
        &mut self,
        now_ms: u64,
        display: &mut D,
        indicator: &mut I,
    ) {
        if self.show_next_message(now_ms, display, indicator) {
            return;
        }
        if self.redraw || self.config.render_policy == RenderPolicy::Always {
            menu::draw_page(display, self.page, &self.status());
            self.redraw = false;
        }
    }
}
