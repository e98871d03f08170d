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

//! Disc image fixtures written into temporary directories

use std::path::{Path, PathBuf};

/// Title stored in the fixture's Dreamcast header
pub const FIXTURE_TITLE: &str = "INTEGRATION DISC";

/// First FAD of the high-density data track
pub const HD_DATA_FAD: u32 = 45150;

/// Sectors in the high-density data track
pub const HD_DATA_FRAMES: u32 = 24;

/// User-data byte `i` of the sector at `fad`
pub fn sector_byte(fad: u32, i: usize) -> u8 {
    ((fad as usize * 13) ^ i) as u8
}

/// 256-byte Dreamcast header
pub fn dreamcast_header() -> Vec<u8> {
    let fields: [(usize, &str); 6] = [
        (0x00, "SEGA SEGAKATANA "),
        (0x10, "SEGA ENTERPRISES"),
        (0x30, "JUE     "),
        (0x40, "T-00000   "),
        (0x60, "1ST_READ.BIN    "),
        (0x80, FIXTURE_TITLE),
    ];
    let mut header = vec![b' '; 256];
    for (offset, text) in fields {
        header[offset..offset + text.len()].copy_from_slice(text.as_bytes());
    }
    header
}

fn user_data(fad: u32) -> Vec<u8> {
    (0..2048).map(|i| sector_byte(fad, i)).collect()
}

fn raw_sector(user: &[u8]) -> Vec<u8> {
    let mut sector = vec![0u8; 2352];
    sector[1..11].fill(0xFF);
    sector[15] = 1;
    sector[16..16 + user.len()].copy_from_slice(user);
    sector
}

/// Write a three-track GD-ROM image and return the `.gdi` path
///
/// Track 1 is a 2048-byte cooked data track, track 2 a short audio track,
/// and track 3 the raw high-density data track whose first sector starts
/// with the Dreamcast header.
pub fn write_gdi_image(dir: &Path) -> PathBuf {
    let track1: Vec<u8> = (150..158).flat_map(user_data).collect();
    std::fs::write(dir.join("track01.iso"), track1).unwrap();

    std::fs::write(dir.join("track02.raw"), vec![0u8; 2352 * 4]).unwrap();

    let mut track3 = Vec::new();
    for fad in HD_DATA_FAD..HD_DATA_FAD + HD_DATA_FRAMES {
        let mut user = user_data(fad);
        if fad == HD_DATA_FAD {
            user[..256].copy_from_slice(&dreamcast_header());
        }
        track3.extend(raw_sector(&user));
    }
    std::fs::write(dir.join("track03.bin"), track3).unwrap();

    let gdi = dir.join("game.gdi");
    std::fs::write(
        &gdi,
        "3\n\
         1 0 4 2048 track01.iso 0\n\
         2 308 0 2352 track02.raw 0\n\
         3 45000 4 2352 \"track03.bin\" 0\n",
    )
    .unwrap();
    gdi
}
