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

//! ATA command implementations

use super::{Gdrom, GdromState, IntReason, Status, TransferMode};
use crate::core::error::{GdromError, Result};
use crate::core::host::GdromHost;

pub const ATA_CMD_NOP: u8 = 0x00;
pub const ATA_CMD_SOFT_RESET: u8 = 0x08;
pub const ATA_CMD_DIAG: u8 = 0x90;
pub const ATA_CMD_PACKET: u8 = 0xA0;
pub const ATA_CMD_IDENTIFY: u8 = 0xA1;
pub const ATA_CMD_SET_FEATURES: u8 = 0xEF;

/// Length of the IDENTIFY response
pub const IDENTIFY_LEN: usize = 80;

/// Build the IDENTIFY block: manufacturer, model, firmware revision and date
fn identify_block() -> [u8; IDENTIFY_LEN] {
    let mut block = [0u8; IDENTIFY_LEN];
    let fields: [(usize, &str); 4] = [
        (8, "SE"),
        (24, "CD-ROM DRIVE"),
        (40, "6.43"),
        (56, "990408"),
    ];
    for (start, text) in fields {
        let field = &mut block[start..start + 16];
        field.fill(b' ');
        field[..text.len()].copy_from_slice(text.as_bytes());
    }
    block
}

impl<H: GdromHost> Gdrom<H> {
    /// Execute an ATA command written to the command register
    pub fn ata_command(&mut self, cmd: u8) -> Result<()> {
        log::debug!("GD-ROM: ATA command 0x{:02X}", cmd);

        if self.state != GdromState::Norm && cmd != ATA_CMD_SOFT_RESET {
            log::error!(
                "GD-ROM: ATA command 0x{:02X} received in state {:?}",
                cmd,
                self.state
            );
            return Err(GdromError::Unimplemented {
                feature: "ATA command while a packet or SET_MODE payload is pending",
            });
        }

        match cmd {
            ATA_CMD_NOP => log::debug!("GD-ROM: NOP"),
            ATA_CMD_DIAG => log::debug!("GD-ROM: DIAG (not modelled)"),
            ATA_CMD_SOFT_RESET => self.cmd_soft_reset(),
            ATA_CMD_PACKET => self.cmd_packet(),
            ATA_CMD_IDENTIFY => self.cmd_identify(),
            ATA_CMD_SET_FEATURES => self.cmd_set_features()?,
            _ => return Err(GdromError::UnknownAtaCommand { command: cmd }),
        }
        Ok(())
    }

    fn cmd_soft_reset(&mut self) {
        self.reset();
        self.raise_interrupt();
    }

    /// Command 0xA0: PACKET
    ///
    /// Arms the drive to receive a 12-byte packet through the data register.
    fn cmd_packet(&mut self) {
        self.status.remove(Status::CHECK);
        self.status.insert(Status::DRQ);
        self.int_reason = IntReason::COD;
        self.n_bytes_received = 0;
        self.state = GdromState::InputPkt;
    }

    /// Command 0xA1: IDENTIFY
    fn cmd_identify(&mut self) {
        self.bufq.clear();
        self.bufq.push(&identify_block());
        self.begin_data_in();
    }

    /// Command 0xEF: SET_FEATURES
    ///
    /// Only the "set transfer mode" subcommand exists on this drive; the
    /// mode value comes from the sector count register.
    fn cmd_set_features(&mut self) -> Result<()> {
        if !self.features.set_feat_enable {
            return Err(GdromError::Unimplemented {
                feature: "SET_FEATURES subcommand other than set transfer mode",
            });
        }

        let (family, mode) = TransferMode::decode(self.sect_cnt)?;
        log::debug!("GD-ROM: Transfer mode {:?} {}", family, mode);
        self.trans_modes[family as usize] = mode;

        self.status.insert(Status::DRDY);
        self.status.remove(Status::BSY);
        self.raise_interrupt();
        Ok(())
    }
}
