//! MPU6050 accelerometer / gyroscope over blocking I²C.
//!
//! Default full-scale ranges are kept (±2 g, ±250 °/s); scaling to
//! physical units happens in [`SensorSample::from_raw`].

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::peripherals::{SensorReader, SensorSample};
use crate::Error;

/// 7-bit address with AD0 tied low.
pub const MPU6050_ADDR: u8 = 0x68;

const REG_PWR_MGMT_1: u8 = 0x6B;
const REG_ACCEL_XOUT_H: u8 = 0x3B;
const REG_WHO_AM_I: u8 = 0x75;

const PWR_RESET: u8 = 0x80;
const PWR_WAKE: u8 = 0x00;

/// accel (6) + temperature (2) + gyro (6), big-endian.
const BURST_LEN: usize = 14;

pub struct Mpu6050<I2C> {
    i2c: I2C,
    addr: u8,
}

impl<I2C: I2c> Mpu6050<I2C> {
    pub fn new(i2c: I2C) -> Self {
        Self {
            i2c,
            addr: MPU6050_ADDR,
        }
    }

    /// Reset the chip and take it out of sleep mode.
    pub fn reset(&mut self, delay: &mut impl DelayNs) -> Result<(), Error> {
        self.write_reg(REG_PWR_MGMT_1, PWR_RESET)?;
        delay.delay_ms(100);
        self.write_reg(REG_PWR_MGMT_1, PWR_WAKE)?;
        delay.delay_ms(10);

        let mut who = [0u8; 1];
        self.i2c
            .write_read(self.addr, &[REG_WHO_AM_I], &mut who)
            .map_err(|_| Error::SensorRead)?;
        info!("MPU6050: WHO_AM_I = {=u8:#x}", who[0]);
        Ok(())
    }

    fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), Error> {
        self.i2c
            .write(self.addr, &[reg, value])
            .map_err(|_| Error::SensorRead)
    }
}

impl<I2C: I2c> SensorReader for Mpu6050<I2C> {
    fn read(&mut self) -> Result<SensorSample, Error> {
        let mut buf = [0u8; BURST_LEN];
        self.i2c
            .write_read(self.addr, &[REG_ACCEL_XOUT_H], &mut buf)
            .map_err(|_| Error::SensorRead)?;

        let word = |i: usize| i16::from_be_bytes([buf[i], buf[i + 1]]);
        Ok(SensorSample::from_raw(
            [word(0), word(2), word(4)],
            [word(8), word(10), word(12)],
        ))
    }
}
