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

//! I/O device trait for memory-mapped peripherals
//!
//! The machine's memory map routes every access inside a device's physical
//! range to that device, together with the access width. Devices see offsets
//! relative to their base address.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              Memory Map (host)              │
//! ├─────────────────────────────────────────────┤
//! │  read(addr, size) {                         │
//! │    if device.contains(addr) {               │
//! │      device.read_register(offset, size)     │
//! │    }                                        │
//! │  }                                          │
//! └─────────────────────────────────────────────┘
//!                      ▲
//!                      │
//!               ┌──────┴──────┐
//!               │   GD-ROM    │
//!               │ (IODevice)  │
//!               └─────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use gdrom::core::memory::IODevice;
//! use gdrom::core::error::Result;
//!
//! struct Latch {
//!     value: u32,
//! }
//!
//! impl IODevice for Latch {
//!     fn address_range(&self) -> (u32, u32) {
//!         (0x005F_6800, 0x005F_6803)
//!     }
//!
//!     fn read_register(&mut self, _offset: u32, _size: u8) -> Result<u32> {
//!         Ok(self.value)
//!     }
//!
//!     fn write_register(&mut self, _offset: u32, _size: u8, value: u32) -> Result<()> {
//!         self.value = value;
//!         Ok(())
//!     }
//! }
//! ```

use crate::core::error::Result;

/// Trait for memory-mapped I/O devices
///
/// Register reads take `&mut self` because reading a register can have side
/// effects: the GD-ROM data register pops its FIFO and the status register
/// acknowledges the interrupt.
///
/// # Access Width
///
/// `size` is the access width in bytes (1, 2 or 4). Devices reject widths
/// their registers do not support.
pub trait IODevice {
    /// Physical address range this device responds to, both ends inclusive
    fn address_range(&self) -> (u32, u32);

    /// Check if this device contains the given address
    fn contains(&self, addr: u32) -> bool {
        let (start, end) = self.address_range();
        addr >= start && addr <= end
    }

    /// Read `size` bytes from the register at `offset`
    ///
    /// # Errors
    ///
    /// Returns an error if the offset does not name a register or the width
    /// is not supported.
    fn read_register(&mut self, offset: u32, size: u8) -> Result<u32>;

    /// Write the low `size` bytes of `value` to the register at `offset`
    fn write_register(&mut self, offset: u32, size: u8, value: u32) -> Result<()>;

    fn read_register8(&mut self, offset: u32) -> Result<u8> {
        Ok(self.read_register(offset, 1)? as u8)
    }

    fn read_register16(&mut self, offset: u32) -> Result<u16> {
        Ok(self.read_register(offset, 2)? as u16)
    }

    fn read_register32(&mut self, offset: u32) -> Result<u32> {
        self.read_register(offset, 4)
    }

    fn write_register8(&mut self, offset: u32, value: u8) -> Result<()> {
        self.write_register(offset, 1, value as u32)
    }

    fn write_register16(&mut self, offset: u32, value: u16) -> Result<()> {
        self.write_register(offset, 2, value as u32)
    }

    fn write_register32(&mut self, offset: u32, value: u32) -> Result<()> {
        self.write_register(offset, 4, value)
    }

    /// Device name for debugging
    fn name(&self) -> &str {
        "Unknown Device"
    }
}
