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

//! CD-ROM addressing helpers shared by the drive and the disc backends
//!
//! GD-ROM addresses sectors by FAD (Frame ADdress), which is the LBA shifted
//! by the 150-frame (2 second) lead-in. MSF (Minute:Second:Frame) is only used
//! for display.

/// Raw CD frame size in bytes (sync + header + user data + EDC/ECC)
pub const CDROM_FRAME_SIZE: usize = 2352;

/// User data bytes per Mode 1 / Mode 2 Form 1 sector
pub const GDROM_SECTOR_SIZE: usize = 2048;

/// Raw Mode 2 sector without sync and header
pub const CDROM_MODE2_SIZE: usize = 2336;

/// Maximum number of tracks on a disc
pub const CDROM_MAX_TRACKS: usize = 99;

/// Size of the encoded TOC returned by `READ_TOC`
pub const CDROM_TOC_SIZE: usize = (CDROM_MAX_TRACKS + 3) * 4;

/// Frames between LBA 0 and FAD 0
pub const FAD_OFFSET: u32 = 150;

/// First FAD of the high-density area of a GD-ROM
pub const GDROM_HD_AREA_FAD: u32 = 45150;

/// Frames per second of audio time
pub const FRAMES_PER_SECOND: u32 = 75;

/// Convert a logical block address to a frame address
#[inline]
pub fn cdrom_lba_to_fad(lba: u32) -> u32 {
    lba + FAD_OFFSET
}

/// First FAD a 24-bit packet address cannot reach
pub const CDROM_FAD_LIMIT: u32 = 0x0100_0000;

/// [`cdrom_lba_to_fad`] for LBAs read from image files
///
/// Returns `None` when the FAD would not be addressable.
pub fn checked_lba_to_fad(lba: u32) -> Option<u32> {
    lba.checked_add(FAD_OFFSET)
        .filter(|&fad| fad < CDROM_FAD_LIMIT)
}

/// End FAD (exclusive) of a track of `len` frames starting at `fad_start`
///
/// Returns `None` when the track runs past [`CDROM_FAD_LIMIT`].
pub fn checked_track_end(fad_start: u32, len: u32) -> Option<u32> {
    fad_start
        .checked_add(len)
        .filter(|&end| end <= CDROM_FAD_LIMIT)
}

/// Convert a frame address to a logical block address
///
/// FADs inside the lead-in have no LBA and saturate to 0.
#[inline]
pub fn cdrom_fad_to_lba(fad: u32) -> u32 {
    fad.saturating_sub(FAD_OFFSET)
}

/// Position in MSF format, decimal (not BCD)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Msf {
    pub minute: u8,
    pub second: u8,
    pub frame: u8,
}

impl Msf {
    pub fn new(minute: u8, second: u8, frame: u8) -> Self {
        Self {
            minute,
            second,
            frame,
        }
    }

    /// MSF of an absolute frame address
    pub fn from_fad(fad: u32) -> Self {
        let minute = (fad / FRAMES_PER_SECOND / 60) as u8;
        let second = ((fad / FRAMES_PER_SECOND) % 60) as u8;
        let frame = (fad % FRAMES_PER_SECOND) as u8;
        Self::new(minute, second, frame)
    }

    pub fn to_fad(&self) -> u32 {
        (self.minute as u32 * 60 + self.second as u32) * FRAMES_PER_SECOND + self.frame as u32
    }
}

impl std::fmt::Display for Msf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.minute, self.second, self.frame)
    }
}

/// Disc format, reported in the upper nibble of the sector-number register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DiscType {
    CdDa = 0x0,
    CdRom = 0x1,
    CdRomXa = 0x2,
    CdI = 0x3,
    GdRom = 0x8,
}

impl std::fmt::Display for DiscType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DiscType::CdDa => "CD-DA",
            DiscType::CdRom => "CD-ROM",
            DiscType::CdRomXa => "CD-ROM XA",
            DiscType::CdI => "CD-i",
            DiscType::GdRom => "GD-ROM",
        };
        f.write_str(name)
    }
}

/// Control nibble of a data track
pub const TRACK_CTRL_DATA: u8 = 4;

/// Control nibble of an audio track
pub const TRACK_CTRL_AUDIO: u8 = 0;
