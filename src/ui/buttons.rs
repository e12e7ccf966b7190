//! GPIO button input.
//!
//! Three physical buttons (active-low with internal pull-up):
//!   - Joystick push - start / stop sampling
//!   - Button B      - mount / unmount the SD card
//!   - Button A      - cycle menu pages
//!
//! Each button is handled by an async task that waits for a falling edge,
//! runs it through the shared [`Debouncer`] and, if accepted, pushes a
//! `ButtonEvent` into the lifecycle channel without waiting.

use core::cell::RefCell;

use embassy_rp::gpio::Input;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::Sender;
use embassy_time::Instant;

use crate::config::EVENT_QUEUE_DEPTH;
use crate::ui::debounce::Debouncer;
use crate::ui::{Button, ButtonEvent};

/// Debouncer shared by all button tasks.
pub type SharedDebouncer = Mutex<CriticalSectionRawMutex, RefCell<Debouncer>>;

/// Run a single button edge loop.
pub async fn button_task(
    mut pin: Input<'static>,
    button: Button,
    debouncer: &'static SharedDebouncer,
    tx: Sender<'static, CriticalSectionRawMutex, ButtonEvent, EVENT_QUEUE_DEPTH>,
) -> ! {
    loop {
        // Wait for falling edge (button press, active-low).
        pin.wait_for_falling_edge().await;

        let now_ms = Instant::now().as_millis();
        let accepted = debouncer.lock(|d| d.borrow_mut().on_edge(button, now_ms));
        let Some(event) = accepted else {
            continue;
        };

        debug!("Button: {}", event);
        if tx.try_send(event).is_err() {
            warn!("Button: event queue full, dropping {}", button);
        }
    }
}
