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

//! Controller snapshots
//!
//! A [`GdromSnapshot`] captures everything the guest can observe in the
//! drive: ATA registers, the state machine with any partial packet, sense
//! data, transfer modes, the mode page, G1 DMA registers and the bytes still
//! staged in the bufq. The mounted disc itself is not serialized; the image
//! path is recorded so the host can mount it again before restoring.
//!
//! Snapshots are encoded with bincode.
//!
//! # Example
//!
//! ```no_run
//! use gdrom::core::gdrom::Gdrom;
//! use gdrom::core::host::RamHost;
//! use gdrom::core::save_state::GdromSnapshot;
//!
//! let drive = Gdrom::new(RamHost::new());
//! GdromSnapshot::capture(&drive).save_to_file("drive.state").unwrap();
//!
//! let mut restored = Gdrom::new(RamHost::new());
//! GdromSnapshot::load_from_file("drive.state")
//!     .unwrap()
//!     .restore(&mut restored)
//!     .unwrap();
//! ```

use bincode::{config, Decode, Encode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::core::error::{AdditionalSense, GdromError, Result};
use crate::core::gdrom::{
    DevCtrl, DmaProtection, DmaRegs, ErrorReg, Features, Gdrom, GdromState, IntReason, Status,
    MODE_PAGE_SIZE, PACKET_LEN, TRANSFER_MODE_COUNT,
};
use crate::core::host::GdromHost;

/// Snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
#[bincode(encode_bounds = "", decode_bounds = "")]
pub struct GdromSnapshot {
    pub version: u32,

    #[bincode(with_serde)]
    pub timestamp: DateTime<Utc>,

    /// Image mounted when the snapshot was taken
    pub image: Option<String>,

    pub registers: AtaRegisterState,

    pub dma: DmaState,

    /// Unconsumed bufq bytes, one entry per node
    pub bufq: Vec<Vec<u8>>,
}

/// ATA side of the drive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct AtaRegisterState {
    pub state: u8,
    pub status: u8,
    pub error: u8,
    pub additional_sense: u8,
    pub features_dma: bool,
    pub set_feat_enable: bool,
    pub int_reason: u8,
    pub dev_ctrl: u8,
    pub sect_cnt: u8,
    pub drive_sel: u8,
    pub data_byte_count: u16,
    pub pkt_buf: [u8; PACKET_LEN],
    pub n_bytes_received: u32,
    pub set_mode_offset: u32,
    pub set_mode_remaining: u32,
    pub trans_modes: [u8; TRANSFER_MODE_COUNT],
    pub mode_page: [u8; MODE_PAGE_SIZE],
    pub cur_fad: u32,
}

/// G1 DMA registers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct DmaState {
    pub start: u32,
    pub len: u32,
    pub dir: u32,
    pub enable: u32,
    pub status: u32,
    pub gdapro: u32,
    pub prot_top: u32,
    pub prot_bot: u32,
    pub start_done: u32,
    pub len_done: u32,
}

impl GdromSnapshot {
    /// Capture the current state of `drive`
    pub fn capture<H: GdromHost>(drive: &Gdrom<H>) -> Self {
        let dma = &drive.dma;
        Self {
            version: SNAPSHOT_VERSION,
            timestamp: Utc::now(),
            image: drive
                .image_path()
                .map(|p| p.to_string_lossy().into_owned()),
            registers: AtaRegisterState {
                state: drive.state.to_bits(),
                status: drive.status.bits(),
                error: drive.error.bits(),
                additional_sense: drive.additional_sense as u8,
                features_dma: drive.features.dma,
                set_feat_enable: drive.features.set_feat_enable,
                int_reason: drive.int_reason.bits(),
                dev_ctrl: drive.dev_ctrl.bits(),
                sect_cnt: drive.sect_cnt,
                drive_sel: drive.drive_sel,
                data_byte_count: drive.data_byte_count,
                pkt_buf: drive.pkt_buf,
                n_bytes_received: drive.n_bytes_received as u32,
                set_mode_offset: drive.set_mode_offset as u32,
                set_mode_remaining: drive.set_mode_remaining as u32,
                trans_modes: drive.trans_modes,
                mode_page: drive.mode_page,
                cur_fad: drive.cur_fad,
            },
            dma: DmaState {
                start: dma.start,
                len: dma.len,
                dir: dma.dir,
                enable: dma.enable,
                status: dma.status,
                gdapro: dma.gdapro,
                prot_top: dma.prot.top,
                prot_bot: dma.prot.bot,
                start_done: dma.start_done,
                len_done: dma.len_done,
            },
            bufq: drive.bufq.snapshot(),
        }
    }

    /// Write this snapshot's state into `drive`
    ///
    /// The disc is left as it is; mount [`GdromSnapshot::image`] first if the
    /// guest expects it.
    pub fn restore<H: GdromHost>(&self, drive: &mut Gdrom<H>) -> Result<()> {
        let regs = &self.registers;
        let state = GdromState::from_bits(regs.state)
            .ok_or_else(|| GdromError::SaveState(format!("invalid FSM state {}", regs.state)))?;
        if regs.n_bytes_received as usize >= PACKET_LEN {
            return Err(GdromError::SaveState(format!(
                "partial packet of {} bytes",
                regs.n_bytes_received
            )));
        }

        drive.state = state;
        drive.status = Status::from_bits_truncate(regs.status);
        drive.error = ErrorReg::from_bits(regs.error);
        drive.additional_sense = AdditionalSense::from_bits(regs.additional_sense);
        drive.features = Features {
            dma: regs.features_dma,
            set_feat_enable: regs.set_feat_enable,
        };
        drive.int_reason = IntReason::from_bits_truncate(regs.int_reason);
        drive.dev_ctrl = DevCtrl::from_bits_truncate(regs.dev_ctrl);
        drive.sect_cnt = regs.sect_cnt;
        drive.drive_sel = regs.drive_sel;
        drive.data_byte_count = regs.data_byte_count;
        drive.pkt_buf = regs.pkt_buf;
        drive.n_bytes_received = regs.n_bytes_received as usize;
        drive.set_mode_offset = regs.set_mode_offset as usize;
        drive.set_mode_remaining = regs.set_mode_remaining as usize;
        drive.trans_modes = regs.trans_modes;
        drive.mode_page = regs.mode_page;
        drive.cur_fad = regs.cur_fad;

        drive.dma = DmaRegs {
            start: self.dma.start,
            len: self.dma.len,
            dir: self.dma.dir,
            enable: self.dma.enable,
            status: self.dma.status,
            gdapro: self.dma.gdapro,
            prot: DmaProtection {
                top: self.dma.prot_top,
                bot: self.dma.prot_bot,
            },
            start_done: self.dma.start_done,
            len_done: self.dma.len_done,
        };

        drive.bufq.restore(&self.bufq);
        if drive.image_path().is_none() {
            drive.set_image_path(self.image.as_ref().map(PathBuf::from));
        }

        log::info!("GD-ROM: Restored snapshot from {}", self.timestamp);
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::encode_to_vec(self, config::standard())
            .map_err(|e| GdromError::SaveState(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (snapshot, _): (GdromSnapshot, usize) =
            bincode::decode_from_slice(bytes, config::standard())
                .map_err(|e| GdromError::SaveState(e.to_string()))?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(GdromError::SaveState(format!(
                "incompatible snapshot version: expected {}, got {}",
                SNAPSHOT_VERSION, snapshot.version
            )));
        }
        Ok(snapshot)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let encoded = self.to_bytes()?;
        let mut file = File::create(path)?;
        file.write_all(&encoded)?;
        Ok(())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)?;
        Self::from_bytes(&buffer)
    }
}
