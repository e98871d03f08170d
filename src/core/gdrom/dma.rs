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

//! G1 bus DMA for the GD-ROM drive
//!
//! Writing 1 to `GDST` moves the staged bufq into guest memory starting at
//! `GDSTAR`. Every byte outside the window programmed through `GDAPRO` is
//! dropped; `GDLEND` reports how many bytes actually landed.

use super::{DmaProtection, Gdrom, GDAPRO_DEFAULT, REG_GDAPRO, REG_GDDIR, REG_GDEN, REG_GDLEN,
    REG_GDLEND, REG_GDST, REG_GDSTAR, REG_GDSTARD};
use crate::core::error::{GdromError, Result};
use crate::core::host::GdromHost;

/// G1 DMA register file for the GD-ROM channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DmaRegs {
    /// GDSTAR: guest start address
    pub start: u32,
    /// GDLEN: requested length
    pub len: u32,
    /// GDDIR: 1 = drive to memory
    pub dir: u32,
    /// GDEN
    pub enable: u32,
    /// GDST
    pub status: u32,
    /// Last accepted GDAPRO value
    pub gdapro: u32,
    pub prot: DmaProtection,
    /// GDSTARD: address following the last byte transferred
    pub start_done: u32,
    /// GDLEND: bytes transferred
    pub len_done: u32,
}

impl Default for DmaRegs {
    fn default() -> Self {
        Self {
            start: 0,
            len: 0,
            dir: 0,
            enable: 0,
            status: 0,
            gdapro: GDAPRO_DEFAULT,
            prot: DmaProtection::default(),
            start_done: 0,
            len_done: 0,
        }
    }
}

impl DmaRegs {
    pub fn read(&self, offset: u32) -> u32 {
        match offset {
            REG_GDSTAR => self.start,
            REG_GDLEN => self.len,
            REG_GDDIR => self.dir,
            REG_GDEN => self.enable,
            REG_GDST => self.status,
            REG_GDAPRO => self.gdapro,
            REG_GDSTARD => self.start_done,
            REG_GDLEND => self.len_done,
            _ => 0,
        }
    }

    /// Write any DMA register except `GDST`, which starts a transfer
    pub fn write(&mut self, offset: u32, value: u32) {
        match offset {
            REG_GDSTAR => self.start = value & 0x1FFF_FFE0,
            REG_GDLEN => self.len = value,
            REG_GDDIR => self.dir = value & 1,
            REG_GDEN => self.enable = value & 1,
            REG_GDAPRO => match DmaProtection::decode(value) {
                Some(prot) => {
                    log::debug!(
                        "GD-ROM: DMA window 0x{:08X}..=0x{:08X}",
                        prot.top,
                        prot.bot
                    );
                    self.gdapro = value;
                    self.prot = prot;
                }
                None => log::warn!("GD-ROM: Ignoring locked GDAPRO write 0x{:08X}", value),
            },
            REG_GDSTARD | REG_GDLEND => {
                log::warn!("GD-ROM: Ignoring write to read-only DMA register +0x{:03X}", offset);
            }
            _ => {}
        }
    }
}

impl<H: GdromHost> Gdrom<H> {
    /// Run a DMA transfer after `GDST` was set
    pub(crate) fn start_dma(&mut self) -> Result<()> {
        if self.dma.dir == 0 {
            return Err(GdromError::Unimplemented {
                feature: "GD-ROM DMA from memory to drive",
            });
        }
        if self.dma.enable == 0 {
            log::warn!(
                "GD-ROM: GDST written with GDEN clear, dropping {} staged bytes",
                self.bufq.byte_len()
            );
            self.bufq.clear();
            self.dma.start_done = self.dma.start;
            self.dma.len_done = 0;
            self.dma.status = 0;
            self.complete_data_phase();
            self.host_mut().raise_dma_complete();
            return Ok(());
        }

        let prot = self.dma.prot;
        let mut addr = self.dma.start;
        let mut transferred = 0u32;

        let nodes: Vec<_> = self.bufq.drain_nodes().collect();
        for node in &nodes {
            let chunk = node.remaining();
            if let Some((dst, len)) = prot.clip(addr, chunk.len() as u32) {
                let skip = (dst - addr) as usize;
                self.host_mut()
                    .dma_write(dst, &chunk[skip..skip + len as usize])?;
                transferred += len;
            } else {
                log::warn!(
                    "GD-ROM: Dropping {} DMA bytes at 0x{:08X} outside the protected window",
                    chunk.len(),
                    addr
                );
            }
            addr = addr.wrapping_add(chunk.len() as u32);
        }

        log::debug!(
            "GD-ROM: DMA {} bytes to 0x{:08X}",
            transferred,
            self.dma.start
        );
        self.dma.start_done = addr;
        self.dma.len_done = transferred;
        self.dma.status = 0;

        self.complete_data_phase();
        self.host_mut().raise_dma_complete();
        Ok(())
    }
}
