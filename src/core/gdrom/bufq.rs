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

//! Response byte queue
//!
//! Staged response data lives in a FIFO of fixed-capacity nodes. PIO reads
//! consume it a byte at a time from the front; a DMA transfer walks the nodes
//! in order and empties the queue.

use std::collections::VecDeque;

use crate::core::cdrom::{CDROM_FRAME_SIZE, GDROM_SECTOR_SIZE};

/// Largest payload a single node can hold
pub const BUFQ_NODE_CAPACITY: usize = CDROM_FRAME_SIZE;

/// One staged buffer with its read cursor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufqNode {
    data: Vec<u8>,
    cursor: usize,
}

impl BufqNode {
    /// Copy up to [`BUFQ_NODE_CAPACITY`] bytes of `bytes` into a new node
    pub fn new(bytes: &[u8]) -> Self {
        let len = bytes.len().min(BUFQ_NODE_CAPACITY);
        Self {
            data: bytes[..len].to_vec(),
            cursor: 0,
        }
    }

    /// Valid length of the node
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes not yet consumed
    pub fn remaining(&self) -> &[u8] {
        &self.data[self.cursor..]
    }

    fn is_drained(&self) -> bool {
        self.cursor >= self.data.len()
    }
}

/// FIFO of staged response nodes
#[derive(Debug, Default, Clone)]
pub struct Bufq {
    nodes: VecDeque<BufqNode>,
}

impl Bufq {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of nodes still queued
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Bytes still queued across all nodes
    pub fn byte_len(&self) -> usize {
        self.nodes.iter().map(|n| n.remaining().len()).sum()
    }

    /// Queue `bytes`, split into nodes of at most [`BUFQ_NODE_CAPACITY`]
    pub fn push(&mut self, bytes: &[u8]) {
        self.push_chunked(bytes, BUFQ_NODE_CAPACITY);
    }

    /// Queue sector data as one node per 2048-byte sector
    pub fn push_sectors(&mut self, bytes: &[u8]) {
        self.push_chunked(bytes, GDROM_SECTOR_SIZE);
    }

    fn push_chunked(&mut self, bytes: &[u8], chunk: usize) {
        self.nodes
            .extend(bytes.chunks(chunk).map(BufqNode::new).filter(|n| !n.is_empty()));
    }

    /// Pop the next byte in FIFO order
    pub fn pop_byte(&mut self) -> Option<u8> {
        let node = self.nodes.front_mut()?;
        let byte = node.data[node.cursor];
        node.cursor += 1;
        if node.is_drained() {
            self.nodes.pop_front();
        }
        Some(byte)
    }

    /// Fill `buf` from the queue, padding with zero once it runs dry
    ///
    /// Returns how many bytes actually came from the queue.
    pub fn read_into(&mut self, buf: &mut [u8]) -> usize {
        let mut copied = 0;
        for byte in buf.iter_mut() {
            match self.pop_byte() {
                Some(b) => {
                    *byte = b;
                    copied += 1;
                }
                None => *byte = 0,
            }
        }
        copied
    }

    /// Remove and return every queued node in order
    pub fn drain_nodes(&mut self) -> impl Iterator<Item = BufqNode> + '_ {
        self.nodes.drain(..)
    }

    /// Unconsumed bytes of each node, front first
    pub fn snapshot(&self) -> Vec<Vec<u8>> {
        self.nodes.iter().map(|n| n.remaining().to_vec()).collect()
    }

    /// Rebuild the queue from [`Bufq::snapshot`] output
    pub fn restore(&mut self, nodes: &[Vec<u8>]) {
        self.nodes = nodes
            .iter()
            .map(|n| BufqNode::new(n))
            .filter(|n| !n.is_empty())
            .collect();
    }
}
