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

//! Sega Dreamcast GD-ROM drive emulation
//!
//! This library emulates the GD-ROM drive as seen from the SH-4: the ATA
//! register file, the ATAPI packet commands the BIOS and games issue, PIO and
//! G1 DMA data transfers, and the GDI, CDI and CHD disc image formats.
//!
//! # Example
//!
//! ```no_run
//! use gdrom::core::gdrom::{Gdrom, GDROM_REG_BASE, REG_STATUS};
//! use gdrom::core::host::RamHost;
//!
//! let mut drive = Gdrom::new(RamHost::new());
//! drive.mount_image("game.gdi").unwrap();
//!
//! let status = drive.read_reg(GDROM_REG_BASE + REG_STATUS, 1).unwrap();
//! assert_eq!(status & 0x40, 0x40); // DRDY
//! ```

pub mod core;
