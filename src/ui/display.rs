//! SSD1306 OLED display wrapper.

use embedded_graphics::mono_font::ascii::FONT_6X10;
use embedded_graphics::mono_font::{MonoTextStyle, MonoTextStyleBuilder};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::text::Text;
use ssd1306::mode::BufferedGraphicsMode;
use ssd1306::prelude::*;
use ssd1306::I2CDisplayInterface;
use ssd1306::Ssd1306;

use crate::peripherals::DisplayRenderer;
use crate::Error;

/// Type alias for the concrete display driver.
///
/// Generic over the I²C implementation so callers pass in their HAL's
/// I²C peripheral.
pub type Display<I2C> =
    Ssd1306<I2CInterface<I2C>, DisplaySize128x64, BufferedGraphicsMode<DisplaySize128x64>>;

fn text_style() -> MonoTextStyle<'static, BinaryColor> {
    MonoTextStyleBuilder::new()
        .font(&FONT_6X10)
        .text_color(BinaryColor::On)
        .build()
}

/// Buffered renderer: lines are drawn into RAM and pushed on `flush`.
pub struct Ssd1306Renderer<I2C> {
    display: Display<I2C>,
}

impl<I2C> Ssd1306Renderer<I2C>
where
    I2C: embedded_hal::i2c::I2c,
{
    /// Initialise the panel and blank it.
    pub fn init(i2c: I2C) -> Self {
        let interface = I2CDisplayInterface::new(i2c);
        let mut display = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
            .into_buffered_graphics_mode();
        if display.init().is_err() {
            warn!("SSD1306: init failed");
        }
        display.clear_buffer();
        let _ = display.flush();
        Self { display }
    }
}

impl<I2C> DisplayRenderer for Ssd1306Renderer<I2C>
where
    I2C: embedded_hal::i2c::I2c,
{
    fn clear(&mut self) {
        self.display.clear_buffer();
    }

    fn draw_line(&mut self, text: &str, x: i32, y: i32) {
        let _ = Text::new(text, Point::new(x, y), text_style()).draw(&mut self.display);
    }

    fn flush(&mut self) -> Result<(), Error> {
        self.display.flush().map_err(|_| Error::Display)
    }
}
