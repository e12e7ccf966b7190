//! What the display shows - not how it is drawn.
//!
//! Pages are composed from a [`StatusSnapshot`] into three text lines;
//! action messages are fixed three-line texts with an LED color. The
//! [`DisplayRenderer`] collaborator turns either into pixels.

use core::fmt::Write;

use heapless::String;

use super::MenuPage;
use crate::lifecycle::{MountState, SamplingState, StatusSnapshot};
use crate::peripherals::{DisplayRenderer, LedColor};

/// Characters that fit on one 128 px row with the 6x10 font.
pub const LINE_CHARS: usize = 21;

/// Left margin of every text line (px).
pub const LINE_X: i32 = 5;

/// Baseline of each of the three text rows (px).
pub const LINE_Y: [i32; 3] = [16, 30, 44];

pub type Line = String<LINE_CHARS>;

/// Transient three-line status text shown instead of the menu.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ActionMessage {
    pub lines: [&'static str; 3],
    pub color: LedColor,
    /// Overrides the configured message duration when set.
    pub duration_ms: Option<u64>,
}

impl ActionMessage {
    pub const fn new(lines: [&'static str; 3], color: LedColor) -> Self {
        Self {
            lines,
            color,
            duration_ms: None,
        }
    }
}

/// Fixed message catalogue.
pub mod messages {
    use super::ActionMessage;
    use crate::config::SPLASH_DURATION_MS;
    use crate::peripherals::LedColor;

    pub const BOOT_SPLASH: ActionMessage = ActionMessage {
        lines: ["DATA LOGGER", "INICIALIZADO", ""],
        color: LedColor::Off,
        duration_ms: Some(SPLASH_DURATION_MS),
    };

    pub const MOUNT_OK: ActionMessage =
        ActionMessage::new(["Cartao SD", "Montado com", "Sucesso"], LedColor::Green);
    pub const MOUNT_FAILED: ActionMessage =
        ActionMessage::new(["Falha ao", "Montar o", "Cartao SD"], LedColor::Red);
    pub const UNMOUNT_OK: ActionMessage =
        ActionMessage::new(["Cartao SD", "Desmontado", "com Sucesso"], LedColor::Green);
    pub const UNMOUNT_FAILED: ActionMessage =
        ActionMessage::new(["Falha ao", "Desmontar o", "Cartao SD"], LedColor::Red);
    pub const RETRY_TOGGLE: ActionMessage =
        ActionMessage::new(["Pressione B", "para Tentar", "Novamente"], LedColor::Red);

    pub const START_FAILED: ActionMessage =
        ActionMessage::new(["Erro ao", "Iniciar", "Coleta"], LedColor::Red);
    pub const MOUNT_FIRST: ActionMessage =
        ActionMessage::new(["Realize a", "Montagem", "do Cartao SD"], LedColor::Red);
    pub const STOP_FIRST: ActionMessage =
        ActionMessage::new(["Finalize a", "Coleta", "Primeiro"], LedColor::Red);
    pub const SESSION_SAVED: ActionMessage =
        ActionMessage::new(["Coleta", "Finalizada", "Dados Salvos"], LedColor::Green);
}

/// Compose the three lines of a menu page.
pub fn page_lines(page: MenuPage, status: &StatusSnapshot) -> [Line; 3] {
    let mut lines: [Line; 3] = Default::default();
    match page {
        MenuPage::Main => {
            let _ = lines[0].push_str("DATA LOGGER");
            let _ = lines[1].push_str(match status.mount {
                MountState::Mounted => "SD: MONTADO",
                MountState::Unmounted => "SD: DESMONTADO",
            });
            let _ = lines[2].push_str(match status.sampling {
                SamplingState::Idle => "COLETA: PARADA",
                SamplingState::Running => "COLETA: ATIVA",
                SamplingState::Stopping => "COLETA: SALVANDO",
            });
        }
        MenuPage::SamplingStatus => {
            let _ = lines[0].push_str("AMOSTRAGEM");
            let _ = write!(lines[1], "Amostras: {}", status.samples);
            let _ = write!(
                lines[2],
                "Falhas: {}",
                status.failed_writes.saturating_add(status.failed_reads)
            );
        }
    }
    lines
}

/// Clear the screen, draw three lines and push them to the panel.
pub fn draw_lines<D: DisplayRenderer>(display: &mut D, lines: &[&str; 3]) {
    display.clear();
    for (text, y) in lines.iter().zip(LINE_Y) {
        if !text.is_empty() {
            display.draw_line(text, LINE_X, y);
        }
    }
    if let Err(e) = display.flush() {
        warn!("display flush failed: {}", e);
    }
}

pub fn draw_page<D: DisplayRenderer>(display: &mut D, page: MenuPage, status: &StatusSnapshot) {
    let lines = page_lines(page, status);
    draw_lines(display, &[lines[0].as_str(), lines[1].as_str(), lines[2].as_str()]);
}

pub fn draw_message<D: DisplayRenderer>(display: &mut D, message: &ActionMessage) {
    draw_lines(display, &message.lines);
}
