//! User interface subsystem - OLED display + physical buttons.
//!
//! ## Components
//!
//! - **Debounce**: timestamp window per button, shared with edge handlers
//! - **Menu**: decides which text lines each page and message shows
//! - **Display**: SSD1306 128×64 OLED via I²C (embedded only)
//! - **Buttons**: 3 tactile switches feeding the event channel (embedded only)

#[cfg(feature = "embedded")]
pub mod buttons;
pub mod debounce;
#[cfg(feature = "embedded")]
pub mod display;
pub mod menu;

/// Physical buttons, listed in the order their events are applied when
/// several are pending in the same tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Button {
    /// Joystick push - start or stop a sampling session.
    StartStop,
    /// Button B - mount or unmount the SD card.
    MountToggle,
    /// Button A - cycle menu pages.
    PageCycle,
}

impl Button {
    pub const COUNT: usize = 3;

    /// Priority order used when applying simultaneous events.
    pub const PRIORITY: [Button; Button::COUNT] =
        [Button::StartStop, Button::MountToggle, Button::PageCycle];

    pub const fn index(self) -> usize {
        match self {
            Button::StartStop => 0,
            Button::MountToggle => 1,
            Button::PageCycle => 2,
        }
    }
}

/// Button press accepted by the debouncer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonEvent {
    pub button: Button,
    pub timestamp_ms: u64,
}

/// Single-producer/single-consumer channel between the edge handler and
/// the poll loop on host builds. Holds one event per button.
pub type EventQueue = heapless::spsc::Queue<ButtonEvent, { Button::COUNT + 1 }>;

/// Menu pages, cycled by [`Button::PageCycle`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MenuPage {
    Main,
    SamplingStatus,
}

impl MenuPage {
    pub const ALL: [MenuPage; MenuPage::COUNT] = [MenuPage::Main, MenuPage::SamplingStatus];
    pub const COUNT: usize = 2;

    pub fn next(self) -> Self {
        match self {
            MenuPage::Main => MenuPage::SamplingStatus,
            MenuPage::SamplingStatus => MenuPage::Main,
        }
    }
}
