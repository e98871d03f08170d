// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! GD-ROM drive controller
//!
//! The drive speaks ATA with the ATAPI packet extension. The guest writes an
//! ATA command into the command register; for `PACKET` it then writes a
//! 12-byte packet through the data register, two bytes at a time. Responses
//! are staged in the [`Bufq`] and leave the drive either through PIO reads of
//! the data register or through a G1 DMA started by writing `GDST`.
//!
//! # State machine
//!
//! ```text
//!            PACKET                 12 bytes received
//!   NORM ───────────────► INPUT_PKT ──────────────────► dispatch ──► NORM
//!    ▲                                                      │
//!    │        data_byte_count bytes received                │ SET_MODE
//!    └───────────────────────────────────────────── SET_MODE ◄┘
//! ```
//!
//! # ATA commands
//!
//! | Command | Name        | Description                              |
//! |---------|-------------|------------------------------------------|
//! | 0x00    | NOP         | Logged only                              |
//! | 0x08    | SOFT_RESET  | Reinitialize the drive registers         |
//! | 0x90    | DIAG        | Logged only                              |
//! | 0xA0    | PACKET      | Receive a 12-byte packet command         |
//! | 0xA1    | IDENTIFY    | Stage the 80-byte identify block         |
//! | 0xEF    | SET_FEATURES| Select a transfer mode                   |
//!
//! # Example
//!
//! ```no_run
//! use gdrom::core::gdrom::Gdrom;
//! use gdrom::core::host::RamHost;
//!
//! let mut drive = Gdrom::new(RamHost::new());
//! drive.mount_image("game.gdi").unwrap();
//!
//! // PACKET, then TEST_UNIT
//! drive.write_reg(0x005F709C, 1, 0xA0).unwrap();
//! for _ in 0..6 {
//!     drive.write_reg(0x005F7080, 2, 0).unwrap();
//! }
//! let status = drive.read_reg(0x005F709C, 1).unwrap();
//! assert_eq!(status & 1, 0);
//! ```

use std::path::{Path, PathBuf};

use crate::core::cdrom::DiscType;
use crate::core::error::{AdditionalSense, GdromError, Result, SenseError, SenseKey};
use crate::core::host::GdromHost;
use crate::core::memory::IODevice;
use crate::core::mount::{self, Disc, Mount};

pub mod bufq;
mod commands;
pub mod dma;
mod packets;
pub mod registers;
#[cfg(test)]
mod tests;

pub use bufq::{Bufq, BufqNode};
pub use commands::{
    ATA_CMD_DIAG, ATA_CMD_IDENTIFY, ATA_CMD_NOP, ATA_CMD_PACKET, ATA_CMD_SET_FEATURES,
    ATA_CMD_SOFT_RESET,
};
pub use dma::DmaRegs;
pub use packets::{
    PKT_CD_READ, PKT_GET_SCD, PKT_GET_TOC, PKT_REQ_ERROR, PKT_REQ_MODE, PKT_REQ_SES,
    PKT_REQ_STAT, PKT_SET_MODE, PKT_START_DISK, PKT_TEST_UNIT, PKT_UNKNOWN_71,
};
pub use registers::*;

/// Bytes in an ATAPI packet
pub const PACKET_LEN: usize = 12;

/// Size of the mode page reachable through REQ_MODE / SET_MODE
pub const MODE_PAGE_SIZE: usize = 32;

/// Power-on contents of the mode page, as little-endian words
///
/// Bytes 0x10.. carry the drive's identification ("SE      Rev 6.43990408").
const MODE_PAGE_DEFAULT: [u16; MODE_PAGE_SIZE / 2] = [
    0x0000, 0x0000, 0xB400, 0x0019, 0x0800, 0x4553, 0x2020, 0x2020, 0x2020, 0x6552, 0x2076,
    0x2E36, 0x3334, 0x3939, 0x3430, 0x3830,
];

fn default_mode_page() -> [u8; MODE_PAGE_SIZE] {
    let mut page = [0u8; MODE_PAGE_SIZE];
    for (bytes, word) in page.chunks_exact_mut(2).zip(MODE_PAGE_DEFAULT) {
        bytes.copy_from_slice(&word.to_le_bytes());
    }
    page
}

/// Controller state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GdromState {
    /// Ready for a new ATA command
    Norm,
    /// Accumulating a 12-byte packet
    InputPkt,
    /// Receiving a SET_MODE payload
    SetMode,
}

impl GdromState {
    pub(crate) fn to_bits(self) -> u8 {
        match self {
            GdromState::Norm => 0,
            GdromState::InputPkt => 1,
            GdromState::SetMode => 2,
        }
    }

    pub(crate) fn from_bits(value: u8) -> Option<Self> {
        match value {
            0 => Some(GdromState::Norm),
            1 => Some(GdromState::InputPkt),
            2 => Some(GdromState::SetMode),
            _ => None,
        }
    }
}

/// GD-ROM drive controller
///
/// Owns the mount registry and talks to the rest of the machine through `H`.
pub struct Gdrom<H: GdromHost> {
    host: H,
    mount: Mount,
    image_path: Option<PathBuf>,

    pub(crate) state: GdromState,
    pub(crate) status: Status,
    pub(crate) error: ErrorReg,
    pub(crate) features: Features,
    pub(crate) int_reason: IntReason,
    pub(crate) dev_ctrl: DevCtrl,
    pub(crate) sect_cnt: u8,
    pub(crate) drive_sel: u8,
    pub(crate) data_byte_count: u16,
    pub(crate) additional_sense: AdditionalSense,

    pub(crate) pkt_buf: [u8; PACKET_LEN],
    pub(crate) n_bytes_received: usize,

    /// Next mode page byte a SET_MODE payload writes
    pub(crate) set_mode_offset: usize,
    /// SET_MODE payload bytes still expected
    pub(crate) set_mode_remaining: usize,

    /// Mode number selected for each [`TransferMode`] family
    pub(crate) trans_modes: [u8; TRANSFER_MODE_COUNT],
    pub(crate) mode_page: [u8; MODE_PAGE_SIZE],

    /// FAD just past the last sector read
    pub(crate) cur_fad: u32,

    pub(crate) bufq: Bufq,
    pub(crate) dma: DmaRegs,
}

impl<H: GdromHost> Gdrom<H> {
    pub fn new(host: H) -> Self {
        Self {
            host,
            mount: Mount::new(),
            image_path: None,
            state: GdromState::Norm,
            status: Status::DRDY,
            error: ErrorReg::default(),
            features: Features::default(),
            int_reason: IntReason::default(),
            dev_ctrl: DevCtrl::default(),
            sect_cnt: 0,
            drive_sel: 0,
            data_byte_count: 0,
            additional_sense: AdditionalSense::None,
            pkt_buf: [0; PACKET_LEN],
            n_bytes_received: 0,
            set_mode_offset: 0,
            set_mode_remaining: 0,
            trans_modes: [0; TRANSFER_MODE_COUNT],
            mode_page: default_mode_page(),
            cur_fad: 0,
            bufq: Bufq::new(),
            dma: DmaRegs::default(),
        }
    }

    /// Reinitialize every ATA register, the state machine and the bufq
    ///
    /// The mounted disc and the G1 DMA registers are left alone.
    pub fn reset(&mut self) {
        log::debug!("GD-ROM: Reset");
        self.state = GdromState::Norm;
        self.status = Status::DRDY;
        self.error = ErrorReg::default();
        self.features = Features::default();
        self.int_reason = IntReason::default();
        self.dev_ctrl = DevCtrl::default();
        self.sect_cnt = 0;
        self.drive_sel = 0;
        self.data_byte_count = 0;
        self.additional_sense = AdditionalSense::None;
        self.pkt_buf = [0; PACKET_LEN];
        self.n_bytes_received = 0;
        self.set_mode_offset = 0;
        self.set_mode_remaining = 0;
        self.trans_modes = [0; TRANSFER_MODE_COUNT];
        self.mode_page = default_mode_page();
        self.cur_fad = 0;
        self.bufq.clear();
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn mount(&self) -> &Mount {
        &self.mount
    }

    pub fn mount_mut(&mut self) -> &mut Mount {
        &mut self.mount
    }

    /// Insert an already opened disc
    pub fn insert_disc(&mut self, disc: Box<dyn Disc>) {
        self.image_path = None;
        self.mount.insert(disc);
    }

    /// Open the image at `path` and insert it
    pub fn mount_image<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.mount_image_with(path, mount::chd::DEFAULT_HUNK_CACHE)
    }

    /// Like [`Gdrom::mount_image`], with an explicit CHD hunk cache size
    pub fn mount_image_with<P: AsRef<Path>>(&mut self, path: P, chd_hunk_cache: usize) -> Result<()> {
        let path = path.as_ref();
        let disc = mount::open_image_with(path, chd_hunk_cache)?;
        self.mount.insert(disc);
        self.image_path = Some(path.to_path_buf());
        Ok(())
    }

    pub fn eject(&mut self) {
        self.mount.eject();
        self.image_path = None;
    }

    /// Path of the mounted image, when it was mounted from a file
    pub fn image_path(&self) -> Option<&Path> {
        self.image_path.as_deref()
    }

    pub(crate) fn set_image_path(&mut self, path: Option<PathBuf>) {
        self.image_path = path;
    }

    pub fn state(&self) -> GdromState {
        self.state
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn int_reason(&self) -> IntReason {
        self.int_reason
    }

    pub fn error_reg(&self) -> ErrorReg {
        self.error
    }

    pub fn additional_sense(&self) -> AdditionalSense {
        self.additional_sense
    }

    pub fn data_byte_count(&self) -> u16 {
        self.data_byte_count
    }

    pub fn bufq(&self) -> &Bufq {
        &self.bufq
    }

    pub fn dma_regs(&self) -> &DmaRegs {
        &self.dma
    }

    /// Mode number currently selected for `family`
    pub fn transfer_mode(&self, family: TransferMode) -> u8 {
        self.trans_modes[family as usize]
    }

    /// Raise the external interrupt unless the guest masked it
    pub(crate) fn raise_interrupt(&mut self) {
        if self.dev_ctrl.contains(DevCtrl::NIEN) {
            log::trace!("GD-ROM: Interrupt masked by nIEN");
        } else {
            self.host.raise_ext_interrupt();
        }
    }

    /// Latch a guest-visible error into the sense registers
    pub(crate) fn set_sense(&mut self, sense: SenseError) {
        log::debug!("GD-ROM: Sense {:?}/{:?}", sense.key, sense.asc);
        self.error.sense_key = sense.key;
        self.additional_sense = sense.asc;
        self.status.insert(Status::CHECK);
    }

    pub(crate) fn clear_sense(&mut self) {
        self.error.sense_key = SenseKey::NoSense;
        self.additional_sense = AdditionalSense::None;
        self.status.remove(Status::CHECK);
    }

    /// Drive status and disc type nibbles of the sector number register
    pub fn sector_number(&self) -> u8 {
        let (drive, disc) = match self.mount.get_disc_type() {
            Ok(disc_type) => (DriveStatus::Pause, disc_type),
            Err(_) => (DriveStatus::NoDisc, DiscType::CdDa),
        };
        (drive as u8) | (disc as u8) << 4
    }

    /// Drain up to `buf.len()` bytes through PIO
    ///
    /// Bytes past the end of the staged data read as zero. When the bufq runs
    /// dry during a data phase, the phase completes and the interrupt fires.
    pub fn read_data(&mut self, buf: &mut [u8]) {
        let copied = self.bufq.read_into(buf);
        log::trace!("GD-ROM: PIO read {} of {} bytes", copied, buf.len());

        if self.bufq.is_empty() && self.status.contains(Status::DRQ) {
            self.complete_data_phase();
        }
    }

    /// Feed bytes written to the data register into the state machine
    pub fn write_data(&mut self, bytes: &[u8]) -> Result<()> {
        for &byte in bytes {
            match self.state {
                GdromState::InputPkt => {
                    self.pkt_buf[self.n_bytes_received] = byte;
                    self.n_bytes_received += 1;
                    if self.n_bytes_received == PACKET_LEN {
                        self.packet_received()?;
                    }
                }
                GdromState::SetMode => self.set_mode_byte(byte),
                GdromState::Norm => {
                    return Err(GdromError::Unimplemented {
                        feature: "data register write outside a packet or SET_MODE",
                    })
                }
            }
        }
        Ok(())
    }

    /// Start a device-to-host data phase for whatever the bufq holds
    pub(crate) fn begin_data_in(&mut self) {
        self.state = GdromState::Norm;
        if self.bufq.is_empty() {
            self.complete_data_phase();
            return;
        }
        self.data_byte_count = self.bufq.byte_len() as u16;
        self.status.remove(Status::BSY);
        self.status.insert(Status::DRQ);
        self.int_reason = IntReason::IO;
    }

    /// End the current data phase and report command completion
    pub(crate) fn complete_data_phase(&mut self) {
        self.state = GdromState::Norm;
        self.status.remove(Status::DRQ | Status::BSY);
        self.status.insert(Status::DRDY);
        self.int_reason = IntReason::COD | IntReason::IO;
        self.raise_interrupt();
    }

    /// Finish a packet that has no data phase
    pub(crate) fn finish_no_data(&mut self) {
        self.state = GdromState::Norm;
        self.status.remove(Status::DRQ | Status::BSY);
        self.status.insert(Status::DRDY);
        self.int_reason = IntReason::COD | IntReason::IO;
    }

    /// Read a register at physical address `addr`
    pub fn read_reg(&mut self, addr: u32, size: u8) -> Result<u32> {
        match addr.checked_sub(GDROM_REG_BASE) {
            Some(offset) if addr <= GDROM_REG_LAST => self.read_register(offset, size),
            _ => Err(GdromError::InvalidRegisterAccess { address: addr, size }),
        }
    }

    /// Write a register at physical address `addr`
    pub fn write_reg(&mut self, addr: u32, size: u8, value: u32) -> Result<()> {
        match addr.checked_sub(GDROM_REG_BASE) {
            Some(offset) if addr <= GDROM_REG_LAST => self.write_register(offset, size, value),
            _ => Err(GdromError::InvalidRegisterAccess { address: addr, size }),
        }
    }

    fn invalid(offset: u32, size: u8) -> GdromError {
        GdromError::InvalidRegisterAccess {
            address: GDROM_REG_BASE + offset,
            size,
        }
    }
}

impl<H: GdromHost> IODevice for Gdrom<H> {
    fn address_range(&self) -> (u32, u32) {
        (GDROM_REG_BASE, GDROM_REG_LAST)
    }

    fn read_register(&mut self, offset: u32, size: u8) -> Result<u32> {
        if !matches!(size, 1 | 2 | 4) {
            return Err(Self::invalid(offset, size));
        }

        let value = match offset {
            REG_DATA => {
                let mut bytes = [0u8; 4];
                self.read_data(&mut bytes[..size as usize]);
                u32::from_le_bytes(bytes)
            }
            REG_ALT_STATUS => self.status.bits() as u32,
            REG_STATUS => {
                self.host.clear_ext_interrupt();
                self.status.bits() as u32
            }
            REG_ERROR => self.error.bits() as u32,
            REG_INT_REASON => self.int_reason.bits() as u32,
            REG_SECTOR_NUMBER => self.sector_number() as u32,
            REG_BYTE_COUNT_LOW => (self.data_byte_count & 0xFF) as u32,
            REG_BYTE_COUNT_HIGH => (self.data_byte_count >> 8) as u32,
            REG_DRIVE_SELECT => self.drive_sel as u32,
            REG_GDSTAR | REG_GDLEN | REG_GDDIR | REG_GDEN | REG_GDST | REG_GDAPRO
            | REG_GDSTARD | REG_GDLEND => self.dma.read(offset),
            _ => {
                log::warn!("GD-ROM: Read from unknown register +0x{:03X}", offset);
                return Err(Self::invalid(offset, size));
            }
        };

        log::trace!("GD-ROM: Read{} +0x{:03X} -> 0x{:X}", size * 8, offset, value);
        Ok(value)
    }

    fn write_register(&mut self, offset: u32, size: u8, value: u32) -> Result<()> {
        if !matches!(size, 1 | 2 | 4) {
            return Err(Self::invalid(offset, size));
        }
        log::trace!("GD-ROM: Write{} +0x{:03X} <- 0x{:X}", size * 8, offset, value);

        let byte = value as u8;
        match offset {
            REG_DATA => {
                let bytes = value.to_le_bytes();
                self.write_data(&bytes[..size as usize])?;
            }
            REG_DEV_CTRL => {
                self.dev_ctrl = DevCtrl::from_bits_truncate(byte);
                if self.dev_ctrl.contains(DevCtrl::SRST) {
                    self.reset();
                }
            }
            REG_FEATURES => self.features.write(byte),
            REG_SECTOR_COUNT => self.sect_cnt = byte,
            REG_SECTOR_NUMBER => {
                log::warn!("GD-ROM: Ignoring write of 0x{:02X} to sector number", byte);
            }
            REG_BYTE_COUNT_LOW => {
                self.data_byte_count = (self.data_byte_count & 0xFF00) | byte as u16;
            }
            REG_BYTE_COUNT_HIGH => {
                self.data_byte_count = (self.data_byte_count & 0x00FF) | (byte as u16) << 8;
            }
            REG_DRIVE_SELECT => self.drive_sel = byte,
            REG_COMMAND => self.ata_command(byte)?,
            REG_GDST => {
                self.dma.status = value & 1;
                if self.dma.status != 0 {
                    self.start_dma()?;
                }
            }
            REG_GDSTAR | REG_GDLEN | REG_GDDIR | REG_GDEN | REG_GDAPRO | REG_GDSTARD
            | REG_GDLEND => self.dma.write(offset, value),
            _ => {
                log::warn!("GD-ROM: Write to unknown register +0x{:03X}", offset);
                return Err(Self::invalid(offset, size));
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "GD-ROM"
    }
}
