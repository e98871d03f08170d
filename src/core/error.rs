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

//! Emulator error types
//!
//! Two tiers are kept strictly apart:
//!
//! - [`GdromError`] is host-fatal. It covers malformed image files, gaps in
//!   hardware modelling (unknown ATA commands, unimplemented packet features)
//!   and integrity violations. It propagates out of the register callbacks and
//!   the host must stop emulating.
//! - [`SenseError`] is guest-visible. It never leaves the controller as an
//!   `Err`; instead it is latched into the sense registers and reported through
//!   `status.check`, `TEST_UNIT` and `REQ_ERROR`.
//!
//! [`DiscError`] is what a disc backend reports for a single sector or header
//! read; the mount registry folds it into one of the two tiers.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for fatal GD-ROM operations
pub type Result<T> = std::result::Result<T, GdromError>;

/// Host-fatal error type
#[derive(Error, Debug)]
pub enum GdromError {
    #[error("Malformed disc image '{}': {}", .path.display(), .reason)]
    ImageFormat { path: PathBuf, reason: String },

    #[error("Unsupported disc image format: '{}'", .0.display())]
    UnsupportedImage(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Disc error: {0}")]
    Disc(#[from] DiscError),

    #[error("Unknown ATA command: {command:#04x}")]
    UnknownAtaCommand { command: u8 },

    #[error("Unimplemented packet command: {opcode:#04x}")]
    UnimplementedPacket { opcode: u8 },

    #[error("Unimplemented GD-ROM feature: {feature}")]
    Unimplemented { feature: &'static str },

    #[error("Unrecognized ATA transfer mode: {value:#04x}")]
    InvalidTransferMode { value: u8 },

    #[error("No disc mounted for {operation}")]
    NoMount { operation: &'static str },

    #[error("Invalid {size}-byte register access at 0x{address:08X}")]
    InvalidRegisterAccess { address: u32, size: u8 },

    #[error("DMA of {len} bytes to 0x{address:08X} is outside guest memory")]
    DmaOutOfRange { address: u32, len: usize },

    #[error("CHD error: {0}")]
    Chd(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Snapshot error: {0}")]
    SaveState(String),
}

impl GdromError {
    /// Build an [`GdromError::ImageFormat`] for the given image path
    pub fn image_format(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        GdromError::ImageFormat {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Failure of a single backend read
#[derive(Error, Debug)]
pub enum DiscError {
    #[error("FAD {fad} is not inside any track")]
    FadOutOfRange { fad: u32 },

    #[error("Disc has no {0}")]
    Missing(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CHD error: {0}")]
    Chd(String),
}

/// ATAPI sense key (upper nibble of the error register)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum SenseKey {
    #[default]
    NoSense = 0x0,
    Recovered = 0x1,
    NotReady = 0x2,
    Medium = 0x3,
    Hardware = 0x4,
    IllegalRequest = 0x5,
    UnitAttention = 0x6,
    DataProtect = 0x7,
    Aborted = 0xB,
}

impl SenseKey {
    /// Decode the low nibble of `value`; unknown keys collapse to `NoSense`
    pub fn from_bits(value: u8) -> Self {
        match value & 0x0F {
            0x1 => SenseKey::Recovered,
            0x2 => SenseKey::NotReady,
            0x3 => SenseKey::Medium,
            0x4 => SenseKey::Hardware,
            0x5 => SenseKey::IllegalRequest,
            0x6 => SenseKey::UnitAttention,
            0x7 => SenseKey::DataProtect,
            0xB => SenseKey::Aborted,
            _ => SenseKey::NoSense,
        }
    }
}

/// Additional sense code reported alongside the sense key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum AdditionalSense {
    #[default]
    None = 0x00,
    InvalidField = 0x24,
    NoDisc = 0x3A,
    IllegalMode = 0x64,
}

impl AdditionalSense {
    pub fn from_bits(value: u8) -> Self {
        match value {
            0x24 => AdditionalSense::InvalidField,
            0x3A => AdditionalSense::NoDisc,
            0x64 => AdditionalSense::IllegalMode,
            _ => AdditionalSense::None,
        }
    }
}

/// Guest-visible error latched into the sense registers
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("sense key {key:?}, additional sense {asc:?}")]
pub struct SenseError {
    pub key: SenseKey,
    pub asc: AdditionalSense,
}

impl SenseError {
    pub const fn new(key: SenseKey, asc: AdditionalSense) -> Self {
        Self { key, asc }
    }

    /// No disc in the drive
    pub const fn no_disc() -> Self {
        Self::new(SenseKey::NotReady, AdditionalSense::NoDisc)
    }

    /// Request parameters the disc cannot satisfy
    pub const fn illegal_request() -> Self {
        Self::new(SenseKey::IllegalRequest, AdditionalSense::InvalidField)
    }
}
