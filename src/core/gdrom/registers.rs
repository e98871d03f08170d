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

//! GD-ROM register map and bitfield layouts
//!
//! All offsets are relative to [`GDROM_REG_BASE`]. The ATA block occupies
//! `0x18..=0x9C`; the G1 DMA registers that belong to the drive sit at
//! `0x404..=0x4F8`.
//!
//! | Offset | Read           | Write          |
//! |--------|----------------|----------------|
//! | 0x18   | Alt status     | Device control |
//! | 0x80   | Data           | Data           |
//! | 0x84   | Error          | Features       |
//! | 0x88   | Interrupt reason | Sector count |
//! | 0x8C   | Sector number  | -              |
//! | 0x90   | Byte count low | Byte count low |
//! | 0x94   | Byte count high| Byte count high|
//! | 0x98   | Drive select   | Drive select   |
//! | 0x9C   | Status         | Command        |

use bitflags::bitflags;

use crate::core::error::{GdromError, Result, SenseKey};

/// Base physical address of the GD-ROM register block
pub const GDROM_REG_BASE: u32 = 0x005F_7000;

/// Last physical address routed to the drive
pub const GDROM_REG_LAST: u32 = 0x005F_74FF;

pub const REG_ALT_STATUS: u32 = 0x18;
pub const REG_DATA: u32 = 0x80;
pub const REG_ERROR: u32 = 0x84;
pub const REG_INT_REASON: u32 = 0x88;
pub const REG_SECTOR_NUMBER: u32 = 0x8C;
pub const REG_BYTE_COUNT_LOW: u32 = 0x90;
pub const REG_BYTE_COUNT_HIGH: u32 = 0x94;
pub const REG_DRIVE_SELECT: u32 = 0x98;
pub const REG_STATUS: u32 = 0x9C;

/// Write-side aliases
pub const REG_DEV_CTRL: u32 = REG_ALT_STATUS;
pub const REG_FEATURES: u32 = REG_ERROR;
pub const REG_SECTOR_COUNT: u32 = REG_INT_REASON;
pub const REG_COMMAND: u32 = REG_STATUS;

pub const REG_GDSTAR: u32 = 0x404;
pub const REG_GDLEN: u32 = 0x408;
pub const REG_GDDIR: u32 = 0x40C;
pub const REG_GDEN: u32 = 0x414;
pub const REG_GDST: u32 = 0x418;
pub const REG_GDAPRO: u32 = 0x4B8;
pub const REG_GDSTARD: u32 = 0x4F4;
pub const REG_GDLEND: u32 = 0x4F8;

bitflags! {
    /// ATA status register
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Status: u8 {
        const BSY = 1 << 7;
        const DRDY = 1 << 6;
        const DF = 1 << 5;
        const DSC = 1 << 4;
        const DRQ = 1 << 3;
        const CORR = 1 << 2;
        const CHECK = 1 << 0;
    }
}

bitflags! {
    /// ATAPI interrupt reason register
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct IntReason: u8 {
        /// Command (1) or data (0) transfer
        const COD = 1 << 0;
        /// Device-to-host (1) or host-to-device (0)
        const IO = 1 << 1;
    }
}

bitflags! {
    /// ATA device control register
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DevCtrl: u8 {
        /// Mask the interrupt line
        const NIEN = 1 << 1;
        /// Software reset
        const SRST = 1 << 2;
    }
}

/// ATA error register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ErrorReg {
    pub sense_key: SenseKey,
    /// Media change requested
    pub mcr: bool,
    /// Command aborted
    pub abrt: bool,
    /// End of media
    pub eomf: bool,
    /// Illegal length
    pub ili: bool,
}

impl ErrorReg {
    pub fn bits(&self) -> u8 {
        ((self.sense_key as u8) << 4)
            | (self.mcr as u8) << 3
            | (self.abrt as u8) << 2
            | (self.eomf as u8) << 1
            | self.ili as u8
    }

    pub fn from_bits(value: u8) -> Self {
        Self {
            sense_key: SenseKey::from_bits(value >> 4),
            mcr: value & (1 << 3) != 0,
            abrt: value & (1 << 2) != 0,
            eomf: value & (1 << 1) != 0,
            ili: value & 1 != 0,
        }
    }
}

/// ATA features register
///
/// Only two things are latched: the DMA bit used by packet commands, and
/// whether the last write selected the "set transfer mode" subcommand that
/// `SET_FEATURES` requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Features {
    pub dma: bool,
    pub set_feat_enable: bool,
}

impl Features {
    pub fn write(&mut self, value: u8) {
        self.dma = value & 1 != 0;
        self.set_feat_enable = value & 0x7F == 3;
    }
}

/// Transfer mode families selectable through `SET_FEATURES`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum TransferMode {
    PioDefault = 0,
    PioFlowControl = 1,
    SingleWordDma = 2,
    MultiWordDma = 3,
    PseudoDma = 4,
}

/// Number of entries in the per-family transfer mode table
pub const TRANSFER_MODE_COUNT: usize = 5;

impl TransferMode {
    /// Decode the sector count value of a `SET_FEATURES` command
    ///
    /// Returns the family and the mode number within it.
    pub fn decode(value: u8) -> Result<(Self, u8)> {
        let mode = value & 0x07;
        match value {
            0x00 | 0x01 => Ok((TransferMode::PioDefault, value)),
            0x08..=0x0F => Ok((TransferMode::PioFlowControl, mode)),
            0x10..=0x17 => Ok((TransferMode::SingleWordDma, mode)),
            0x18..=0x1F => Ok((TransferMode::PseudoDma, mode)),
            0x20..=0x27 => Ok((TransferMode::MultiWordDma, mode)),
            _ => Err(GdromError::InvalidTransferMode { value }),
        }
    }
}

/// Drive state reported in the low nibble of the sector number register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DriveStatus {
    Busy = 0,
    Pause = 1,
    Standby = 2,
    Play = 3,
    Seek = 4,
    Scan = 5,
    Open = 6,
    NoDisc = 7,
    Retry = 8,
    Error = 9,
}

/// Unlock key in the upper half of a GDAPRO write
pub const GDAPRO_KEY: u16 = 0x8843;

/// GDAPRO value the drive starts out with
pub const GDAPRO_DEFAULT: u32 = 0x8843_407F;

/// Guest address window GD-ROM DMA may write to, both ends inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmaProtection {
    pub top: u32,
    pub bot: u32,
}

impl DmaProtection {
    /// Decode a GDAPRO write, or `None` if the unlock key is missing
    pub fn decode(value: u32) -> Option<Self> {
        if (value >> 16) as u16 != GDAPRO_KEY {
            return None;
        }
        Some(Self {
            top: 0x0800_0000 | ((value >> 8) & 0x7F) << 20,
            bot: 0x080F_FFFF | (value & 0x7F) << 20,
        })
    }

    /// Intersect `[addr, addr + len)` with the window
    ///
    /// Returns the clipped start address and length, if any byte survives.
    pub fn clip(&self, addr: u32, len: u32) -> Option<(u32, u32)> {
        if len == 0 {
            return None;
        }
        let last = addr.saturating_add(len - 1);
        let start = addr.max(self.top);
        let end = last.min(self.bot);
        (start <= end).then(|| (start, end - start + 1))
    }
}

impl Default for DmaProtection {
    fn default() -> Self {
        Self {
            top: 0x0C00_0000,
            bot: 0x0FFF_FFFF,
        }
    }
}
