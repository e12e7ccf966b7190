//! IMU data logger firmware entry point.
//!
//! Wires the BitDogLab peripherals to the lifecycle state machine and runs
//! the cooperative poll loop. Button edges and serial commands arrive
//! through channels fed by their own tasks; everything else happens in
//! `main`, one tick every `POLL_INTERVAL_MS`.

#![no_std]
#![no_main]

use core::cell::RefCell;
use core::fmt::{self, Write};

use defmt::{info, unwrap, warn};
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::i2c::{self, I2c};
use embassy_rp::peripherals::UART1;
use embassy_rp::pwm::{self, Pwm};
use embassy_rp::spi::{self, Spi};
use embassy_rp::uart::{self, Uart, UartRx, UartTx};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::Channel;
use embassy_time::{Delay, Instant, Timer};
use embedded_hal_bus::spi::ExclusiveDevice;
use embedded_sdmmc::SdCard;
use {defmt_rtt as _, panic_probe as _};

use datalogger::command::{write_status, Command, LineBuffer};
use datalogger::config::{
    LoggerConfig, BUTTON_DEBOUNCE_MS, COMMAND_LINE_LEN, EVENT_QUEUE_DEPTH, POLL_INTERVAL_MS,
    UART_BAUD_RATE,
};
use datalogger::indicator::RgbBuzzer;
use datalogger::peripherals::{Devices, StorageSession};
use datalogger::sensor::Mpu6050;
use datalogger::storage::SdCardSession;
use datalogger::ui::buttons::{button_task, SharedDebouncer};
use datalogger::ui::debounce::Debouncer;
use datalogger::ui::display::Ssd1306Renderer;
use datalogger::ui::menu::messages;
use datalogger::{Button, ButtonEvent, Lifecycle};

bind_interrupts!(struct Irqs {
    UART1_IRQ => uart::InterruptHandler<UART1>;
});

/// SPI clock during card initialisation; SD cards require <= 400 kHz.
const SD_SPI_HZ: u32 = 400_000;

static DEBOUNCER: SharedDebouncer =
    Mutex::new(RefCell::new(Debouncer::new(BUTTON_DEBOUNCE_MS)));

static BUTTON_EVENTS: Channel<CriticalSectionRawMutex, ButtonEvent, EVENT_QUEUE_DEPTH> =
    Channel::new();

static COMMANDS: Channel<CriticalSectionRawMutex, Command, 2> = Channel::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_rp::init(Default::default());
    info!("datalogger v{} starting", env!("CARGO_PKG_VERSION"));

    // Serial console
    let mut uart_config = uart::Config::default();
    uart_config.baudrate = UART_BAUD_RATE;
    let uart = Uart::new(
        p.UART1, p.PIN_8, p.PIN_9, Irqs, p.DMA_CH0, p.DMA_CH1, uart_config,
    );
    let (tx, rx) = uart.split();
    let mut console = Console(tx);

    // IMU on I²C0, display on I²C1
    let imu_i2c = I2c::new_blocking(p.I2C0, p.PIN_1, p.PIN_0, i2c::Config::default());
    let mut imu = Mpu6050::new(imu_i2c);
    if let Err(e) = imu.reset(&mut Delay) {
        warn!("MPU6050 reset failed: {}", e);
    }

    let display_i2c = I2c::new_blocking(p.I2C1, p.PIN_15, p.PIN_14, i2c::Config::default());
    let display = Ssd1306Renderer::init(display_i2c);

    // SD card on SPI0
    let mut spi_config = spi::Config::default();
    spi_config.frequency = SD_SPI_HZ;
    let spi = Spi::new_blocking(p.SPI0, p.PIN_18, p.PIN_19, p.PIN_16, spi_config);
    let cs = Output::new(p.PIN_17, Level::High);
    let sd_device = unwrap!(ExclusiveDevice::new(spi, cs, Delay));
    let storage = SdCardSession::new(SdCard::new(sd_device, Delay));

    // RGB LED + buzzer
    let indicator = RgbBuzzer::new(
        Output::new(p.PIN_13, Level::Low),
        Output::new(p.PIN_11, Level::Low),
        Output::new(p.PIN_12, Level::Low),
        Pwm::new_output_b(p.PWM_SLICE2, p.PIN_21, pwm::Config::default()),
    );

    let mut devices = Devices {
        storage,
        sensor: imu,
        display,
        indicator,
    };

    unwrap!(spawner.spawn(button(Input::new(p.PIN_22, Pull::Up), Button::StartStop)));
    unwrap!(spawner.spawn(button(Input::new(p.PIN_6, Pull::Up), Button::MountToggle)));
    unwrap!(spawner.spawn(button(Input::new(p.PIN_5, Pull::Up), Button::PageCycle)));
    unwrap!(spawner.spawn(console_rx(rx)));

    let mut lifecycle = Lifecycle::new(LoggerConfig::default());
    lifecycle.show(messages::BOOT_SPLASH);
    info!("entering poll loop");

    loop {
        let now_ms = Instant::now().as_millis();
        lifecycle.tick(
            now_ms,
            core::iter::from_fn(|| BUTTON_EVENTS.try_receive().ok()),
            &mut devices,
        );

        while let Ok(command) = COMMANDS.try_receive() {
            run_command(command, &lifecycle, &mut devices.storage, &mut console);
        }

        Timer::after_millis(POLL_INTERVAL_MS).await;
    }
}

#[embassy_executor::task(pool_size = 3)]
async fn button(pin: Input<'static>, which: Button) {
    button_task(pin, which, &DEBOUNCER, BUTTON_EVENTS.sender()).await
}

#[embassy_executor::task]
async fn console_rx(mut rx: UartRx<'static, UART1, uart::Async>) {
    let mut line: LineBuffer<COMMAND_LINE_LEN> = LineBuffer::new();
    let mut byte = [0u8; 1];
    loop {
        if let Err(e) = rx.read(&mut byte).await {
            warn!("UART rx error: {}", e);
            continue;
        }
        if let Some(command) = line.push(byte[0]) {
            if COMMANDS.try_send(command).is_err() {
                warn!("command dropped, console busy");
            }
        }
    }
}

/// Blocking UART writer usable with `write!`.
struct Console(UartTx<'static, UART1, uart::Async>);

impl Console {
    fn write_bytes(&mut self, bytes: &[u8]) {
        if self.0.blocking_write(bytes).is_err() {
            warn!("UART tx error");
        }
    }
}

impl Write for Console {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write_bytes(s.as_bytes());
        Ok(())
    }
}

fn run_command<S: StorageSession>(
    command: Command,
    lifecycle: &Lifecycle,
    storage: &mut S,
    console: &mut Console,
) {
    info!("console command: {}", command);
    match command {
        Command::Dump => {
            let result = lifecycle.dump(storage, &mut |chunk| console.write_bytes(chunk));
            let _ = match result {
                Ok(bytes) => write!(console, "-- {} bytes --\r\n", bytes),
                Err(e) => write!(console, "error: {}\r\n", e.as_str()),
            };
        }
        Command::Status => {
            let _ = write_status(console, &lifecycle.status());
        }
        Command::Unknown => {
            let _ = console.write_str("commands: d = dump log, s = status\r\n");
        }
    }
}
