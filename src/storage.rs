//! SD card storage for the CSV log.
//!
//! Uses `embedded-sdmmc` with the raw (handle based) API so the volume,
//! root directory and log file can be held across poll ticks:
//!   - `mount` re-initialises the card, then opens volume 0 and its root
//!     directory.
//!   - `open_write` creates or truncates the log file.
//!   - `append` writes straight through; `close` flushes the directory entry.
//!   - `unmount` releases the directory and the volume.

use embedded_hal::delay::DelayNs;
use embedded_hal::spi::SpiDevice;
use embedded_sdmmc::{
    BlockDevice, Mode, RawDirectory, RawFile, RawVolume, SdCard, TimeSource, Timestamp,
    VolumeIdx, VolumeManager,
};

use crate::config::DUMP_CHUNK_SIZE;
use crate::peripherals::StorageSession;
use crate::Error;

/// The board has no RTC; every file gets the FAT epoch as its timestamp.
pub struct FixedClock;

impl TimeSource for FixedClock {
    fn get_timestamp(&self) -> Timestamp {
        Timestamp {
            year_since_1970: 0,
            zero_indexed_month: 0,
            zero_indexed_day: 0,
            hours: 0,
            minutes: 0,
            seconds: 0,
        }
    }
}

/// A block device whose medium can be swapped while powered.
pub trait RemovableCard: BlockDevice {
    /// Forget the negotiated card state so the next access runs the full
    /// init sequence again.
    fn mark_uninit(&self);
}

impl<SPI, DELAY> RemovableCard for SdCard<SPI, DELAY>
where
    SPI: SpiDevice<u8>,
    DELAY: DelayNs,
{
    fn mark_uninit(&self) {
        self.mark_card_uninit();
    }
}

#[cfg(feature = "defmt")]
fn detail<E: core::fmt::Debug>(e: &E) -> defmt::Debug2Format<'_, E> {
    defmt::Debug2Format(e)
}

#[cfg(not(feature = "defmt"))]
fn detail<E>(e: &E) -> &E {
    e
}

/// Handles that exist only while the card is mounted.
#[derive(Clone, Copy)]
struct Mounted {
    volume: RawVolume,
    root: RawDirectory,
}

pub struct CardSession<D: RemovableCard> {
    volumes: VolumeManager<D, FixedClock>,
    mounted: Option<Mounted>,
    file: Option<RawFile>,
}

/// The board's SPI SD card slot.
pub type SdCardSession<SPI, DELAY> = CardSession<SdCard<SPI, DELAY>>;

impl<D: RemovableCard> CardSession<D> {
    pub fn new(card: D) -> Self {
        Self {
            volumes: VolumeManager::new(card, FixedClock),
            mounted: None,
            file: None,
        }
    }

    fn root(&self) -> Result<RawDirectory, Error> {
        self.mounted.map(|m| m.root).ok_or(Error::NotMounted)
    }
}

impl<D: RemovableCard> StorageSession for CardSession<D> {
    fn mount(&mut self) -> Result<(), Error> {
        if self.mounted.is_some() {
            return Ok(());
        }

        // A card inserted since the last mount powers up in SD mode and
        // ignores SPI commands until it is initialised again.
        self.volumes.device().mark_uninit();

        let volume = self.volumes.open_raw_volume(VolumeIdx(0)).map_err(|e| {
            error!("SD: open volume failed: {}", detail(&e));
            Error::MountFailed
        })?;

        let root = match self.volumes.open_root_dir(volume) {
            Ok(root) => root,
            Err(e) => {
                error!("SD: open root dir failed: {}", detail(&e));
                let _ = self.volumes.close_volume(volume);
                return Err(Error::MountFailed);
            }
        };

        self.mounted = Some(Mounted { volume, root });
        info!("SD: volume 0 mounted");
        Ok(())
    }

    fn unmount(&mut self) -> Result<(), Error> {
        let Some(mounted) = self.mounted else {
            return Ok(());
        };
        if let Some(file) = self.file.take() {
            warn!("SD: closing log file left open before unmount");
            let _ = self.volumes.close_file(file);
        }

        self.volumes.close_dir(mounted.root).map_err(|e| {
            error!("SD: close root dir failed: {}", detail(&e));
            Error::UnmountFailed
        })?;
        // The directory handle is gone now, so a volume failure still
        // leaves us unmounted.
        self.mounted = None;
        self.volumes.close_volume(mounted.volume).map_err(|e| {
            error!("SD: close volume failed: {}", detail(&e));
            Error::UnmountFailed
        })?;

        info!("SD: volume 0 unmounted");
        Ok(())
    }

    fn open_write(&mut self, name: &str) -> Result<(), Error> {
        let root = self.root()?;
        if let Some(file) = self.file.take() {
            let _ = self.volumes.close_file(file);
        }
        let file = self
            .volumes
            .open_file_in_dir(root, name, Mode::ReadWriteCreateOrTruncate)
            .map_err(|e| {
                error!("SD: open {} failed: {}", name, detail(&e));
                Error::FileOpen
            })?;
        self.file = Some(file);
        Ok(())
    }

    fn append(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let file = self.file.ok_or(Error::Write)?;
        self.volumes.write(file, bytes).map_err(|e| {
            warn!("SD: write failed: {}", detail(&e));
            Error::Write
        })
    }

    fn close(&mut self) -> Result<(), Error> {
        // The handle is released even when the card reports an error.
        let Some(file) = self.file.take() else {
            return Ok(());
        };
        self.volumes.close_file(file).map_err(|e| {
            warn!("SD: close failed: {}", detail(&e));
            Error::Close
        })
    }

    fn read_file(&mut self, name: &str, sink: &mut dyn FnMut(&[u8])) -> Result<usize, Error> {
        let root = self.root()?;
        let file = self
            .volumes
            .open_file_in_dir(root, name, Mode::ReadOnly)
            .map_err(|e| {
                warn!("SD: open {} for reading failed: {}", name, detail(&e));
                Error::FileOpen
            })?;

        let mut buf = [0u8; DUMP_CHUNK_SIZE];
        let mut total = 0;
        let result = loop {
            match self.volumes.read(file, &mut buf) {
                Ok(0) => break Ok(total),
                Ok(n) => {
                    sink(&buf[..n]);
                    total += n;
                }
                Err(e) => {
                    warn!("SD: read failed after {} bytes: {}", total, detail(&e));
                    break Err(Error::Read);
                }
            }
        };

        if self.volumes.close_file(file).is_err() {
            warn!("SD: closing {} after read failed", name);
        }
        result
    }
}
