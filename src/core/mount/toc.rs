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

//! Table of contents and its CD-ROM wire encoding
//!
//! # Encoded Layout
//!
//! ```text
//! slot 0..=98   track 1..=99   [ctrl<<4 | adr, fad[23:16], fad[15:8], fad[7:0]]
//!                              (all 0xFF when the track is absent)
//! slot 99       first track    [ctrl<<4 | adr, track number, 0, 0]
//! slot 100      last track     [ctrl<<4 | adr, track number, 0, 0]
//! slot 101      lead-out       [last ctrl<<4 | adr, fad[23:16], fad[15:8], fad[7:0]]
//! ```

use crate::core::cdrom::{CDROM_MAX_TRACKS, CDROM_TOC_SIZE};

/// One track slot of a TOC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TocTrack {
    pub valid: bool,
    pub fad: u32,
    pub ctrl: u8,
    pub adr: u8,
}

/// Table of contents for one region of the disc
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toc {
    /// Track slots, index 0 is track 1
    pub tracks: [TocTrack; CDROM_MAX_TRACKS],
    pub first_track: u8,
    pub last_track: u8,
    pub leadout: u32,
    pub leadout_adr: u8,
}

impl Default for Toc {
    fn default() -> Self {
        Self {
            tracks: [TocTrack::default(); CDROM_MAX_TRACKS],
            first_track: 0,
            last_track: 0,
            leadout: 0,
            leadout_adr: 1,
        }
    }
}

impl Toc {
    /// Mark 1-indexed `track_no` as present
    ///
    /// Track numbers outside 1..=99 are ignored.
    pub fn set_track(&mut self, track_no: usize, fad: u32, ctrl: u8) {
        if let Some(slot) = track_no
            .checked_sub(1)
            .and_then(|idx| self.tracks.get_mut(idx))
        {
            *slot = TocTrack {
                valid: true,
                fad,
                ctrl: ctrl & 0x0F,
                adr: 1,
            };
        }
    }

    /// Slot for 1-indexed `track_no`
    pub fn track(&self, track_no: u8) -> Option<&TocTrack> {
        (track_no as usize)
            .checked_sub(1)
            .and_then(|idx| self.tracks.get(idx))
    }

    /// Iterate `(track number, slot)` over the valid slots
    pub fn valid_tracks(&self) -> impl Iterator<Item = (u8, &TocTrack)> {
        self.tracks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.valid)
            .map(|(idx, t)| (idx as u8 + 1, t))
    }

    fn ctrl_adr(&self, track_no: u8) -> u8 {
        self.track(track_no)
            .filter(|t| t.valid)
            .map(|t| (t.ctrl << 4) | (t.adr & 0x0F))
            .unwrap_or(0)
    }
}

#[inline]
fn fad_be(fad: u32) -> [u8; 3] {
    [(fad >> 16) as u8, (fad >> 8) as u8, fad as u8]
}

/// Serialize a TOC into the 408-byte `READ_TOC` response
pub fn encode_toc(toc: &Toc) -> [u8; CDROM_TOC_SIZE] {
    let mut out = [0xFFu8; CDROM_TOC_SIZE];

    for (slot, track) in out.chunks_exact_mut(4).zip(toc.tracks.iter()) {
        if track.valid {
            let fad = fad_be(track.fad);
            slot[0] = (track.ctrl << 4) | (track.adr & 0x0F);
            slot[1..4].copy_from_slice(&fad);
        }
    }

    let base = CDROM_MAX_TRACKS * 4;
    out[base..base + 4].copy_from_slice(&[toc.ctrl_adr(toc.first_track), toc.first_track, 0, 0]);
    out[base + 4..base + 8].copy_from_slice(&[toc.ctrl_adr(toc.last_track), toc.last_track, 0, 0]);

    // The lead-out borrows the last track's control nibble
    let last_ctrl = toc
        .track(toc.last_track)
        .filter(|t| t.valid)
        .map(|t| t.ctrl)
        .unwrap_or(0);
    let leadout = fad_be(toc.leadout);
    out[base + 8] = (last_ctrl << 4) | (toc.leadout_adr & 0x0F);
    out[base + 9..base + 12].copy_from_slice(&leadout);

    out
}

/// Parse a `READ_TOC` response back into a [`Toc`]
///
/// Slots that are all `0xFF` decode as absent tracks.
pub fn decode_toc(bytes: &[u8; CDROM_TOC_SIZE]) -> Toc {
    let mut toc = Toc::default();

    for (slot, track) in bytes.chunks_exact(4).zip(toc.tracks.iter_mut()) {
        if slot == [0xFF; 4] {
            continue;
        }
        *track = TocTrack {
            valid: true,
            fad: u32::from_be_bytes([0, slot[1], slot[2], slot[3]]),
            ctrl: slot[0] >> 4,
            adr: slot[0] & 0x0F,
        };
    }

    let base = CDROM_MAX_TRACKS * 4;
    toc.first_track = bytes[base + 1];
    toc.last_track = bytes[base + 5];
    toc.leadout_adr = bytes[base + 8] & 0x0F;
    toc.leadout = u32::from_be_bytes([0, bytes[base + 9], bytes[base + 10], bytes[base + 11]]);
    toc
}
