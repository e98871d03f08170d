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

//! Drive emulation components
//!
//! - CD-ROM addressing helpers
//! - Disc image backends and the mount registry
//! - The GD-ROM controller (ATA/ATAPI state machine, bufq, G1 DMA)
//! - Host callbacks for DMA and interrupts
//! - Configuration and controller snapshots

pub mod cdrom;
pub mod config;
pub mod error;
pub mod gdrom;
pub mod host;
pub mod memory;
pub mod mount;
pub mod save_state;

// Re-export commonly used types
pub use config::GdromConfig;
pub use error::{DiscError, GdromError, Result, SenseError};
pub use gdrom::Gdrom;
pub use host::{GdromHost, RamHost};
pub use mount::{open_image, Disc, Mount, MountRegion};
pub use save_state::GdromSnapshot;
