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

//! Register-level driving helpers and assertions

use gdrom::core::gdrom::{
    Gdrom, Status, ATA_CMD_PACKET, GDROM_REG_BASE, PACKET_LEN, REG_COMMAND, REG_DATA, REG_ERROR,
    REG_STATUS,
};
use gdrom::core::host::RamHost;

/// Read an 8-bit drive register
#[allow(dead_code)]
pub fn read8(drive: &mut Gdrom<RamHost>, offset: u32) -> u8 {
    drive
        .read_reg(GDROM_REG_BASE + offset, 1)
        .expect("register read failed") as u8
}

/// Write an 8-bit drive register
#[allow(dead_code)]
pub fn write8(drive: &mut Gdrom<RamHost>, offset: u32, value: u8) {
    drive
        .write_reg(GDROM_REG_BASE + offset, 1, value as u32)
        .expect("register write failed");
}

/// Issue PACKET and write the 12 command bytes as six 16-bit words
#[allow(dead_code)]
pub fn send_packet(drive: &mut Gdrom<RamHost>, pkt: [u8; PACKET_LEN]) {
    write8(drive, REG_COMMAND, ATA_CMD_PACKET);
    for pair in pkt.chunks(2) {
        let word = u16::from_le_bytes([pair[0], pair[1]]);
        drive
            .write_reg(GDROM_REG_BASE + REG_DATA, 2, word as u32)
            .expect("packet write failed");
    }
}

/// Drain the data register while DRQ is set
#[allow(dead_code)]
pub fn drain_pio(drive: &mut Gdrom<RamHost>) -> Vec<u8> {
    let mut out = Vec::new();
    while Status::from_bits_truncate(read8(drive, REG_STATUS)).contains(Status::DRQ) {
        let word = drive
            .read_reg(GDROM_REG_BASE + REG_DATA, 2)
            .expect("data read failed") as u16;
        out.extend_from_slice(&word.to_le_bytes());
    }
    out
}

/// Assert the status register has CHECK clear and DRDY set
#[allow(dead_code)]
pub fn assert_ready(drive: &mut Gdrom<RamHost>) {
    let status = Status::from_bits_truncate(read8(drive, REG_STATUS));
    assert!(
        status.contains(Status::DRDY) && !status.contains(Status::CHECK),
        "drive not ready: status {:?}",
        status
    );
}

/// Assert CHECK is set and the error register carries `sense_key`
#[allow(dead_code)]
pub fn assert_check(drive: &mut Gdrom<RamHost>, sense_key: u8) {
    let status = Status::from_bits_truncate(read8(drive, REG_STATUS));
    assert!(status.contains(Status::CHECK), "CHECK not set: {:?}", status);

    let actual = read8(drive, REG_ERROR) >> 4;
    assert_eq!(
        actual, sense_key,
        "sense key mismatch: expected 0x{:X}, got 0x{:X}",
        sense_key, actual
    );
}
