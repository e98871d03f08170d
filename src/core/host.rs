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

//! Collaborators the drive needs from the rest of the machine
//!
//! The controller does not know about the CPU, the memory map or the
//! interrupt controller. It reaches them only through [`GdromHost`]: a DMA
//! copy into guest memory and the two interrupt lines (the external GD-ROM
//! interrupt and the G1 "DMA complete" event).

use crate::core::error::{GdromError, Result};

/// Services the host machine provides to the drive
pub trait GdromHost {
    /// Copy `data` into guest memory at physical address `addr`
    fn dma_write(&mut self, addr: u32, data: &[u8]) -> Result<()>;

    /// Assert the external GD-ROM interrupt line
    fn raise_ext_interrupt(&mut self);

    /// Deassert the external GD-ROM interrupt line
    fn clear_ext_interrupt(&mut self);

    /// Signal completion of a G1 DMA transfer
    fn raise_dma_complete(&mut self);
}

/// Start of Dreamcast system RAM
pub const RAM_BASE: u32 = 0x0C00_0000;

/// Size of Dreamcast system RAM (16MB)
pub const RAM_SIZE: usize = 16 * 1024 * 1024;

/// Last address of the area that mirrors system RAM
const RAM_MIRROR_END: u32 = 0x0FFF_FFFF;

/// Standalone host: a flat copy of system RAM plus interrupt counters
///
/// Used by the `gdinfo` tool, tests and benchmarks to drive the controller
/// without a full machine around it.
#[derive(Debug, Clone)]
pub struct RamHost {
    ram: Vec<u8>,
    /// Whether the external interrupt line is currently asserted
    pub ext_interrupt: bool,
    /// Times the external interrupt was raised
    pub ext_interrupt_count: u32,
    /// Times a DMA-complete event was raised
    pub dma_complete_count: u32,
}

impl RamHost {
    pub fn new() -> Self {
        Self {
            ram: vec![0; RAM_SIZE],
            ext_interrupt: false,
            ext_interrupt_count: 0,
            dma_complete_count: 0,
        }
    }

    fn ram_offset(addr: u32) -> Option<usize> {
        if (RAM_BASE..=RAM_MIRROR_END).contains(&addr) {
            Some((addr - RAM_BASE) as usize % RAM_SIZE)
        } else {
            None
        }
    }

    /// Read `len` bytes of guest RAM starting at `addr`
    pub fn read(&self, addr: u32, len: usize) -> Option<&[u8]> {
        let offset = Self::ram_offset(addr)?;
        self.ram.get(offset..offset.checked_add(len)?)
    }
}

impl Default for RamHost {
    fn default() -> Self {
        Self::new()
    }
}

impl GdromHost for RamHost {
    fn dma_write(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        let out_of_range = || GdromError::DmaOutOfRange {
            address: addr,
            len: data.len(),
        };
        let offset = Self::ram_offset(addr).ok_or_else(out_of_range)?;
        let dest = self
            .ram
            .get_mut(offset..offset + data.len())
            .ok_or_else(out_of_range)?;

        dest.copy_from_slice(data);
        log::trace!("HOST: DMA {} bytes to 0x{:08X}", data.len(), addr);
        Ok(())
    }

    fn raise_ext_interrupt(&mut self) {
        self.ext_interrupt = true;
        self.ext_interrupt_count += 1;
    }

    fn clear_ext_interrupt(&mut self) {
        self.ext_interrupt = false;
    }

    fn raise_dma_complete(&mut self) {
        self.dma_complete_count += 1;
    }
}
