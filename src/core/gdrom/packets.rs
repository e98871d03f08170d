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

//! ATAPI packet command implementations
//!
//! | Opcode | Name       | Data phase                          |
//! |--------|------------|-------------------------------------|
//! | 0x00   | TEST_UNIT  | none                                |
//! | 0x10   | REQ_STAT   | 10-byte drive status                |
//! | 0x11   | REQ_MODE   | window of the 32-byte mode page     |
//! | 0x12   | SET_MODE   | host writes into the mode page      |
//! | 0x13   | REQ_ERROR  | 10-byte sense packet                |
//! | 0x14   | GET_TOC    | 408-byte table of contents          |
//! | 0x15   | REQ_SES    | 6-byte session info                 |
//! | 0x30   | CD_READ    | 2048 bytes per sector, PIO or DMA   |
//! | 0x40   | GET_SCD    | zero-filled subcode placeholder     |
//! | 0x70   | START_DISK | none                                |
//! | 0x71   | -          | 960 bytes recorded from hardware    |

use super::{DriveStatus, Gdrom, GdromState, IntReason, Status, MODE_PAGE_SIZE};
use crate::core::cdrom::{CDROM_TOC_SIZE, GDROM_SECTOR_SIZE};
use crate::core::error::{GdromError, Result, SenseError};
use crate::core::host::GdromHost;
use crate::core::mount::{Mount, MountRegion};

pub const PKT_TEST_UNIT: u8 = 0x00;
pub const PKT_REQ_STAT: u8 = 0x10;
pub const PKT_REQ_MODE: u8 = 0x11;
pub const PKT_SET_MODE: u8 = 0x12;
pub const PKT_REQ_ERROR: u8 = 0x13;
pub const PKT_GET_TOC: u8 = 0x14;
pub const PKT_REQ_SES: u8 = 0x15;
pub const PKT_CD_READ: u8 = 0x30;
pub const PKT_GET_SCD: u8 = 0x40;
pub const PKT_START_DISK: u8 = 0x70;
pub const PKT_UNKNOWN_71: u8 = 0x71;

/// Length of the REQ_ERROR sense packet
pub const REQ_ERROR_LEN: usize = 10;

/// Length of the REQ_STAT status packet
pub const REQ_STAT_LEN: usize = 10;

/// Length of the REQ_SES session packet
pub const REQ_SES_LEN: usize = 6;

/// CD_READ data select value for "user data only"
const READ_DATA_SEL_DATA: u8 = 2;

/// Response to packet 0x71, recorded from a real drive
#[rustfmt::skip]
const PKT_71_RESPONSE: [u16; 480] = [
    0x0b96, 0xf045, 0xff7e, 0x063d, 0x7d4d, 0xbf10, 0x0007, 0xcf73, 0x009c, 0x0cbc,
    0xaf1c, 0x301c, 0xa7e7, 0xa803, 0x0098, 0x0fbd, 0x5bbd, 0x50aa, 0x3923, 0x1031,
    0x690e, 0xe513, 0xd200, 0x660d, 0xbf54, 0xfd5f, 0x7437, 0x5bf4, 0x0022, 0x09c6,
    0xca0f, 0xe893, 0xaba4, 0x6100, 0x2e0e, 0x4be1, 0x8b76, 0xa56a, 0xe69c, 0xc423,
    0x4b00, 0x1b06, 0x0191, 0xe200, 0xcf0d, 0x38ca, 0xb93a, 0x91e7, 0xefe5, 0x004b,
    0x09d6, 0x68d3, 0xc43e, 0x2daf, 0x2a00, 0xf90d, 0x78fc, 0xaeed, 0xb399, 0x5a32,
    0x00e7, 0x0a4c, 0x9722, 0x825b, 0x7a06, 0x004c, 0x0e42, 0x7857, 0xf546, 0xfc20,
    0xcb6b, 0x5b01, 0x0086, 0x0ee4, 0x26b2, 0x71cd, 0xa5e3, 0x0633, 0x9a8e, 0x0050,
    0x0707, 0x34f5, 0xe6ef, 0x3200, 0x130f, 0x5941, 0x0f56, 0x3802, 0x642a, 0x072a,
    0x003e, 0x1152, 0x1d2a, 0x765f, 0xa066, 0x2fb2, 0xc797, 0x6e5e, 0xe252, 0x5800,
    0xca09, 0xa589, 0x0adf, 0x00de, 0x0650, 0xb849, 0x00b4, 0x0577, 0xe824, 0xbb00,
    0x910c, 0xa289, 0x628b, 0x6ade, 0x60c6, 0xe700, 0x0f0f, 0x9611, 0xd255, 0xe6bf,
    0x0b48, 0xab5c, 0x00dc, 0x0aba, 0xd730, 0x0e48, 0x6378, 0x000c, 0x0dd2, 0x8afb,
    0xfea3, 0x3af8, 0x88dd, 0x4ba9, 0xa200, 0x750a, 0x0d5d, 0x2437, 0x9dc5, 0xf700,
    0x250b, 0xdbef, 0xe041, 0x3e52, 0x004e, 0x03b7, 0xe500, 0xb911, 0x5ade, 0xcf57,
    0x1ab9, 0x7ffc, 0xee26, 0xcd7b, 0x002b, 0x084b, 0x09b8, 0x6a70, 0x009f, 0x114b,
    0x158c, 0xa387, 0x4f05, 0x8e37, 0xde63, 0x39ef, 0x4bfc, 0xab00, 0x0b10, 0xaa91,
    0xe10f, 0xaee9, 0x3a69, 0x03f8, 0xd269, 0xe200, 0xc107, 0x3d5c, 0x0082, 0x08a9,
    0xc468, 0x2ead, 0x00d1, 0x0ef7, 0x47c6, 0xcdc8, 0x7c8e, 0x5c00, 0xb995, 0x00f4,
    0x04e3, 0x005b, 0x0774, 0xc765, 0x8e84, 0xc600, 0x6107, 0x4480, 0x003f, 0x0ec8,
    0x7872, 0xd347, 0x4dc2, 0xc0af, 0x1354, 0x0031, 0x0df7, 0xd848, 0x92e2, 0x7f9f,
    0x442f, 0x3368, 0x0d00, 0xab10, 0xeafe, 0x198e, 0xf881, 0x7c6f, 0xe1de, 0x06b3,
    0x4d00, 0x6611, 0x4cae, 0xb7f9, 0xee2f, 0x8eb0, 0xe17e, 0x958d, 0x006f, 0x0df4,
    0x9d88, 0xe3ca, 0xb2c4, 0xbb47, 0x69a0, 0xf300, 0x480b, 0x4117, 0xa064, 0x710e,
    0x0082, 0x1e34, 0x4d18, 0x8085, 0xa94c, 0x660b, 0x759b, 0x6113, 0x2770, 0x7a81,
    0xcd02, 0xab57, 0x02df, 0x5293, 0xdf83, 0xa848, 0x9ea6, 0x6f74, 0x0389, 0x2528,
    0x9652, 0x67ff, 0xd87a, 0xb13c, 0x462c, 0xef84, 0xc1e1, 0xc9c6, 0x96dc, 0xa9aa,
    0x82c4, 0x2758, 0x7557, 0x3467, 0x3bfb, 0xbf25, 0x3bfb, 0x13f6, 0x96ec, 0x16e5,
    0xfd26, 0xdaa8, 0xc61b, 0x7f50, 0xff47, 0x5508, 0xed08, 0x9300, 0xc49b, 0x6771,
    0xa6ec, 0x16cc, 0x8720, 0x0747, 0x00a6, 0x5d79, 0xab4f, 0x6fa1, 0x6b7a, 0xc427,
    0xa3da, 0x94c3, 0x7f4f, 0xe5f3, 0x6f1b, 0xe5cc, 0xe5f0, 0xc99d, 0xfdae, 0xac39,
    0xe54c, 0x8358, 0x6525, 0x7492, 0x819e, 0xb6a0, 0x02a9, 0x079b, 0xe7b6, 0x5779,
    0x4ad9, 0xface, 0x94b4, 0xcc05, 0x3c86, 0x06dd, 0xa6cd, 0x2424, 0xc1fa, 0x48f9,
    0x0cc9, 0xc46c, 0x8296, 0xf617, 0x0931, 0xe2c4, 0xfd77, 0x46cf, 0xb218, 0x015f,
    0xd16b, 0x567b, 0x94b8, 0xe54a, 0x196c, 0xc0f0, 0x70b6, 0xf793, 0xd1d3, 0x6e2b,
    0x537c, 0x856d, 0x0cd1, 0x778b, 0x90ee, 0x15da, 0xe055, 0x0958, 0xfc56, 0x9f31,
    0x46af, 0xc3cb, 0x718d, 0xf275, 0xc32c, 0xa1bb, 0xcfc4, 0x5627, 0x9b7c, 0xaffe,
    0x4e3e, 0xcdb4, 0xaa6a, 0xf3f5, 0x22e3, 0xe182, 0x68a5, 0xdbb3, 0x9e8f, 0x7b5e,
    0xf090, 0x3f79, 0x8c52, 0x8861, 0xae76, 0x6314, 0x0f19, 0xce1d, 0x63a1, 0xb210,
    0xd7e2, 0xb194, 0xcb33, 0x8528, 0x9b7d, 0xf4f5, 0x5025, 0xdb9b, 0xa535, 0x9cb0,
    0x9209, 0x31e3, 0xab40, 0xf44d, 0xe835, 0x0ab3, 0xc321, 0x9c86, 0x29cb, 0x77a4,
    0xbc57, 0xdad8, 0x82a5, 0xe880, 0x72cf, 0xad81, 0x282e, 0xd8ff, 0xd1b6, 0x972b,
    0xff00, 0x06e1, 0x3944, 0x4b1c, 0x19ab, 0x4d5b, 0x3ed6, 0x5c1b, 0xbb64, 0x6832,
    0x7cf5, 0x9ec9, 0xb4e8, 0x1b29, 0x4d7f, 0x8080, 0x8b7e, 0x0a1c, 0x9ae6, 0x49bf,
    0xc51e, 0x67b6, 0x057d, 0x90e4, 0x4b40, 0x9baf, 0xde52, 0x8017, 0x5681, 0x3aea,
    0x8253, 0x628c, 0x96fb, 0x6f97, 0x16c1, 0xd478, 0xe77b, 0x5ab9, 0xeb2a, 0x6887,
    0xd333, 0x4531, 0xfefa, 0x1cf4, 0x8690, 0x7773, 0xa9d9, 0x4ad1, 0xcf4a, 0x23ae,
    0xf9db, 0xd809, 0xdc18, 0x0d6a, 0x19e4, 0x658c, 0x64c6, 0xdcc7, 0xe3a9, 0xb191,
];

/// Bytes of the 0x71 response
pub const PKT_71_RESPONSE_LEN: usize = PKT_71_RESPONSE.len() * 2;

fn be24(bytes: &[u8]) -> u32 {
    (bytes[0] as u32) << 16 | (bytes[1] as u32) << 8 | bytes[2] as u32
}

fn fad_bytes(fad: u32) -> [u8; 3] {
    [(fad >> 16) as u8, (fad >> 8) as u8, fad as u8]
}

impl<H: GdromHost> Gdrom<H> {
    /// A full packet has arrived: acknowledge it and run it
    pub(crate) fn packet_received(&mut self) -> Result<()> {
        self.n_bytes_received = 0;
        self.status.remove(Status::DRQ | Status::BSY);
        self.raise_interrupt();
        self.state = GdromState::Norm;

        let pkt = self.pkt_buf;
        log::debug!("GD-ROM: Packet {:02X?}", pkt);

        match pkt[0] {
            PKT_TEST_UNIT => self.pkt_test_unit(),
            PKT_REQ_STAT => self.pkt_req_stat(&pkt),
            PKT_REQ_MODE => self.pkt_req_mode(&pkt),
            PKT_SET_MODE => self.pkt_set_mode(&pkt)?,
            PKT_REQ_ERROR => self.pkt_req_error(&pkt),
            PKT_GET_TOC => self.pkt_get_toc(&pkt),
            PKT_REQ_SES => self.pkt_req_ses(&pkt),
            PKT_CD_READ => self.pkt_cd_read(&pkt)?,
            PKT_GET_SCD => self.pkt_get_scd(&pkt),
            PKT_START_DISK => {
                log::debug!("GD-ROM: START_DISK");
                self.finish_no_data();
            }
            PKT_UNKNOWN_71 => self.pkt_71(),
            opcode => return Err(GdromError::UnimplementedPacket { opcode }),
        }
        Ok(())
    }

    /// Report a recoverable failure and end the packet without data
    fn fail_packet(&mut self, sense: SenseError) {
        self.set_sense(sense);
        self.finish_no_data();
    }

    /// Stage `bytes` truncated to `len` and start the data phase
    fn respond(&mut self, bytes: &[u8], len: usize) {
        self.bufq.clear();
        self.bufq.push(&bytes[..len.min(bytes.len())]);
        self.begin_data_in();
    }

    /// Packet 0x00: TEST_UNIT
    fn pkt_test_unit(&mut self) {
        self.status.insert(Status::DRDY);
        if self.mount().check() {
            self.clear_sense();
        } else {
            self.set_sense(SenseError::no_disc());
        }
        self.finish_no_data();
    }

    /// Packet 0x10: REQ_STAT
    fn pkt_req_stat(&mut self, pkt: &[u8]) {
        let len = pkt[4] as usize;
        let mounted = self.mount().check();
        let drive = if mounted {
            DriveStatus::Pause
        } else {
            DriveStatus::NoDisc
        };
        let disc_type = self.mount().get_disc_type().map(|t| t as u8).unwrap_or(0);
        let track = self.track_of(self.cur_fad);
        let fad = fad_bytes(self.cur_fad);

        let reply: [u8; REQ_STAT_LEN] = [
            drive as u8,
            disc_type << 4,
            0x04,
            track,
            1,
            fad[0],
            fad[1],
            fad[2],
            0,
            0,
        ];
        self.respond(&reply, len);
    }

    /// Number of the track containing `fad`, or 0 when unknown
    fn track_of(&mut self, fad: u32) -> u8 {
        let mut found = 0;
        for region in [MountRegion::LowDensity, MountRegion::HighDensity] {
            if let Ok(toc) = self.mount_mut().read_toc(region) {
                for (number, track) in toc.valid_tracks() {
                    if track.fad <= fad {
                        found = number;
                    }
                }
            }
        }
        found
    }

    /// Packet 0x11: REQ_MODE
    fn pkt_req_mode(&mut self, pkt: &[u8]) {
        let start = (pkt[2] as usize).min(MODE_PAGE_SIZE);
        let end = (start + pkt[4] as usize).min(MODE_PAGE_SIZE);
        let window = self.mode_page[start..end].to_vec();
        self.respond(&window, window.len());
    }

    /// Packet 0x12: SET_MODE
    ///
    /// The payload length is taken from the byte count register.
    fn pkt_set_mode(&mut self, pkt: &[u8]) -> Result<()> {
        if self.features.dma {
            return Err(GdromError::Unimplemented {
                feature: "SET_MODE with DMA transfer",
            });
        }

        self.set_mode_offset = pkt[2] as usize;
        self.set_mode_remaining = self.data_byte_count as usize;
        log::debug!(
            "GD-ROM: SET_MODE {} bytes at offset {}",
            self.set_mode_remaining,
            self.set_mode_offset
        );

        if self.set_mode_remaining == 0 {
            self.complete_data_phase();
            return Ok(());
        }
        self.state = GdromState::SetMode;
        self.status.insert(Status::DRQ);
        self.int_reason = IntReason::empty();
        Ok(())
    }

    /// One byte of a SET_MODE payload
    pub(crate) fn set_mode_byte(&mut self, byte: u8) {
        if let Some(slot) = self.mode_page.get_mut(self.set_mode_offset) {
            *slot = byte;
        }
        self.set_mode_offset += 1;
        self.set_mode_remaining = self.set_mode_remaining.saturating_sub(1);

        if self.set_mode_remaining == 0 {
            self.complete_data_phase();
        }
    }

    /// Packet 0x13: REQ_ERROR
    fn pkt_req_error(&mut self, pkt: &[u8]) {
        let mut reply = [0u8; REQ_ERROR_LEN];
        reply[0] = 0xF0;
        reply[2] = self.error.sense_key as u8;
        reply[8] = self.additional_sense as u8;
        self.respond(&reply, pkt[4] as usize);
    }

    /// Packet 0x14: GET_TOC
    fn pkt_get_toc(&mut self, pkt: &[u8]) {
        let region = MountRegion::from_session_bit(pkt[1]);
        let len = u16::from_be_bytes([pkt[3], pkt[4]]) as usize;

        match self.mount_mut().read_toc(region) {
            Ok(toc) => {
                let encoded = Mount::encode_toc(&toc);
                self.respond(&encoded, len.min(CDROM_TOC_SIZE));
            }
            Err(sense) => self.fail_packet(sense),
        }
    }

    /// Packet 0x15: REQ_SES
    fn pkt_req_ses(&mut self, pkt: &[u8]) {
        let session = pkt[2] as usize;
        let len = pkt[4] as usize;

        if !self.mount().check() {
            self.fail_packet(SenseError::no_disc());
            return;
        }
        let status = DriveStatus::Pause as u8;

        let reply = if session == 0 {
            let count = self.mount().session_count().unwrap_or(0) as u8;
            let leadout = fad_bytes(self.mount().get_leadout().unwrap_or(0));
            [status, 0, count, leadout[0], leadout[1], leadout[2]]
        } else {
            match self.mount().get_session_start(session - 1) {
                Ok(Some(start)) => {
                    let fad = fad_bytes(start.fad);
                    [status, 0, start.first_track, fad[0], fad[1], fad[2]]
                }
                _ => {
                    self.fail_packet(SenseError::illegal_request());
                    return;
                }
            }
        };
        self.respond(&reply, len);
    }

    /// Packet 0x30: CD_READ
    fn pkt_cd_read(&mut self, pkt: &[u8]) -> Result<()> {
        let param_tp = pkt[1] & 1;
        let data_sel = pkt[1] >> 4;
        if param_tp != 0 {
            return Err(GdromError::Unimplemented {
                feature: "CD_READ with MSF addressing",
            });
        }
        if data_sel != READ_DATA_SEL_DATA {
            return Err(GdromError::Unimplemented {
                feature: "CD_READ of headers or subheaders",
            });
        }

        let fad = be24(&pkt[2..5]);
        let count = be24(&pkt[8..11]);
        log::debug!("GD-ROM: CD_READ FAD {} count {}", fad, count);

        self.bufq.clear();
        self.data_byte_count = (GDROM_SECTOR_SIZE as u32).wrapping_mul(count) as u16;

        if !self.mount().check() {
            self.fail_packet(SenseError::no_disc());
            return Ok(());
        }
        let leadout = self.mount().get_leadout()?;
        if fad.checked_add(count).is_none_or(|end| end > leadout) {
            log::warn!(
                "GD-ROM: CD_READ of {} sectors at FAD {} runs past leadout {}",
                count,
                fad,
                leadout
            );
            self.fail_packet(SenseError::illegal_request());
            return Ok(());
        }

        let mut sector = [0u8; GDROM_SECTOR_SIZE];
        for f in fad..fad + count {
            if let Err(sense) = self.mount_mut().read_sectors(&mut sector, f, 1) {
                self.bufq.clear();
                self.fail_packet(sense);
                return Ok(());
            }
            self.bufq.push_sectors(&sector);
        }
        self.cur_fad = fad + count;

        if self.features.dma {
            log::debug!("GD-ROM: CD_READ waiting for GDST");
        } else {
            self.begin_data_in();
        }
        Ok(())
    }

    /// Packet 0x40: GET_SCD
    fn pkt_get_scd(&mut self, pkt: &[u8]) {
        let len = u16::from_be_bytes([pkt[3], pkt[4]]) as usize;
        self.respond(&vec![0u8; len], len);
    }

    /// Packet 0x71
    fn pkt_71(&mut self) {
        let bytes: Vec<u8> = PKT_71_RESPONSE
            .iter()
            .flat_map(|w| w.to_le_bytes())
            .collect();
        self.respond(&bytes, bytes.len());
    }
}
