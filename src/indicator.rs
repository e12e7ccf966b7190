//! RGB status LED and PWM buzzer.

use embassy_rp::gpio::Output;
use embassy_rp::pwm::{self, Pwm};
use embassy_time::{block_for, Duration};
use fixed::types::U12F4;

use crate::peripherals::{Indicator, LedColor};

/// PWM counter clock after the divider: 125 MHz / 125.
const PWM_TICK_HZ: u32 = 1_000_000;

/// System clock divider that yields [`PWM_TICK_HZ`].
const PWM_DIVIDER: u8 = 125;

pub struct RgbBuzzer {
    red: Output<'static>,
    green: Output<'static>,
    blue: Output<'static>,
    buzzer: Pwm<'static>,
    pwm_config: pwm::Config,
}

impl RgbBuzzer {
    pub fn new(
        red: Output<'static>,
        green: Output<'static>,
        blue: Output<'static>,
        buzzer: Pwm<'static>,
    ) -> Self {
        let mut pwm_config = pwm::Config::default();
        pwm_config.divider = U12F4::from_num(PWM_DIVIDER);
        pwm_config.compare_b = 0;
        pwm_config.enable = false;

        let mut this = Self {
            red,
            green,
            blue,
            buzzer,
            pwm_config,
        };
        this.buzzer.set_config(&this.pwm_config);
        this.set_color(LedColor::Off);
        this
    }
}

impl Indicator for RgbBuzzer {
    fn set_color(&mut self, color: LedColor) {
        let (r, g, b) = match color {
            LedColor::Off => (false, false, false),
            LedColor::Red => (true, false, false),
            LedColor::Green => (false, true, false),
            LedColor::Blue => (false, false, true),
        };
        self.red.set_level(r.into());
        self.green.set_level(g.into());
        self.blue.set_level(b.into());
    }

    /// Square wave at `freq_hz` for `duration_ms`. Blocks the caller.
    fn tone(&mut self, freq_hz: u32, duration_ms: u32) {
        let period = (PWM_TICK_HZ / freq_hz.max(1)).clamp(2, u32::from(u16::MAX));
        let top = (period - 1) as u16;

        self.pwm_config.top = top;
        self.pwm_config.compare_b = top / 2;
        self.pwm_config.enable = true;
        self.buzzer.set_config(&self.pwm_config);

        block_for(Duration::from_millis(u64::from(duration_ms)));

        self.pwm_config.compare_b = 0;
        self.pwm_config.enable = false;
        self.buzzer.set_config(&self.pwm_config);
    }
}
