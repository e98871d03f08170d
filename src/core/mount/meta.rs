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

//! Dreamcast disc header (IP.BIN) metadata

/// Size of the header block read by `get_meta`
pub const DISC_META_SIZE: usize = 256;

/// Fields of the 256-byte header found at the start of the first data track
/// of the high-density area
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DiscMeta {
    /// "SEGA SEGAKATANA " on genuine discs
    pub hardware: String,
    pub maker: String,
    pub device_info: String,
    pub area_symbols: String,
    pub peripherals: String,
    pub product_number: String,
    pub version: String,
    pub release_date: String,
    pub boot_file: String,
    pub company: String,
    pub title: String,
}

impl DiscMeta {
    /// Parse the raw header block
    pub fn parse(raw: &[u8; DISC_META_SIZE]) -> Self {
        let field = |start: usize, len: usize| -> String {
            String::from_utf8_lossy(&raw[start..start + len])
                .trim_end_matches(['\0', ' '])
                .to_string()
        };

        Self {
            hardware: field(0x00, 16),
            maker: field(0x10, 16),
            device_info: field(0x20, 16),
            area_symbols: field(0x30, 8),
            peripherals: field(0x38, 8),
            product_number: field(0x40, 10),
            version: field(0x4A, 6),
            release_date: field(0x50, 16),
            boot_file: field(0x60, 16),
            company: field(0x70, 16),
            title: field(0x80, 128),
        }
    }

    /// Whether the hardware identifier matches a Dreamcast disc
    pub fn is_dreamcast(&self) -> bool {
        self.hardware.starts_with("SEGA SEGAKATANA")
    }
}

#[cfg(test)]
pub(crate) fn sample_header(title: &str) -> [u8; DISC_META_SIZE] {
    let mut raw = [b' '; DISC_META_SIZE];
    let mut put = |start: usize, text: &str| {
        raw[start..start + text.len()].copy_from_slice(text.as_bytes());
    };
    put(0x00, "SEGA SEGAKATANA ");
    put(0x10, "SEGA ENTERPRISES");
    put(0x20, "0000 GD-ROM1/1  ");
    put(0x30, "JUE     ");
    put(0x40, "MK-51000  ");
    put(0x4A, "V1.000");
    put(0x50, "19990909        ");
    put(0x60, "1ST_READ.BIN    ");
    put(0x70, "SEGA LC-T-00    ");
    put(0x80, title);
    raw
}
