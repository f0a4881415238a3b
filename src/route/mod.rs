/* Copyright (C) 2022 Antmicro
 * 
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 * 
 *     https://www.apache.org/licenses/LICENSE-2.0
 * 
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */


/* Single-pass reader of VPR routing traces (`.route`).
 *
 * The trace lists every net as a sequence of node records, each of the form
 * `Node: <id> <type> (<x>,<y>) <label> <index> [<port>] ...`. Every channel
 * record becomes one routing event carrying the code of the mux that drives
 * it, derived from the record that precedes it in the trace. */

pub mod switch;

#[cfg(test)]
mod tests;

use std::iter::{Enumerate, Peekable};
use std::str::Lines;
use crate::arch::Arch;
use crate::common::*;
use crate::error::{BitgenError, Result};
#[allow(unused)]
use crate::log::*;

const LOGIC_BLOCK_PREFIX: &str = "fpga_logic_block";
const MEMORY_BLOCK_PREFIX: &str = "fpga_memory_blck";
const BLOCK_INPUT_SIGNATURE: &str = ".logic_i[";

/* VPR gives every pad pin an input, an output and a clock pin */
const PAD_PIN_CLASSES: usize = 3;

/// A whitespace-split line of the trace.
#[derive(Clone, Debug)]
pub struct Record<'a> {
    pub line_no: usize,
    pub text: &'a str,
    pub fields: Vec<&'a str>,
}

impl<'a> Record<'a> {
    pub fn new(line_no: usize, text: &'a str) -> Self {
        Self { line_no, text, fields: text.split_whitespace().collect() }
    }

    fn field(&self, idx: usize) -> Option<&'a str> {
        self.fields.get(idx).copied()
    }

    pub fn error<S>(&self, reason: S) -> BitgenError where S: Into<String> {
        BitgenError::RouteTrace {
            line: self.line_no,
            record: self.text.trim().to_string(),
            reason: reason.into(),
        }
    }

    /* Re-raises an error from a lower layer in the context of this record */
    fn wrap(&self, err: BitgenError) -> BitgenError {
        match err {
            BitgenError::RouteTrace { .. } => err,
            other => self.error(other.message()),
        }
    }

    pub fn is_node(&self) -> bool {
        self.field(0).map(|f| f.contains("Node")).unwrap_or(false)
    }

    pub fn node_type(&self) -> Option<&'a str> {
        self.field(2)
    }

    pub fn is_chan(&self) -> bool {
        self.node_type().map(|t| t.contains("CHAN")).unwrap_or(false)
    }

    pub fn is_pad(&self) -> bool {
        self.field(4).map(|f| f.contains("Pad")).unwrap_or(false)
    }

    pub fn is_block(&self) -> bool {
        self.field(6)
            .map(|f| f.contains(LOGIC_BLOCK_PREFIX) || f.contains(MEMORY_BLOCK_PREFIX))
            .unwrap_or(false)
    }

    pub fn kind(&self) -> Result<ObjectKind> {
        if self.is_block() {
            Ok(ObjectKind::Block)
        } else if self.is_pad() {
            Ok(ObjectKind::Pad)
        } else {
            match self.node_type() {
                Some(t) if t.contains("CHANX") => Ok(ObjectKind::ChanX),
                Some(t) if t.contains("CHANY") => Ok(ObjectKind::ChanY),
                _ => Err(self.error("Failed to determine object from routing record")),
            }
        }
    }

    pub fn coord(&self) -> Result<Coord> {
        self.field(3)
            .and_then(coord_from_braces)
            .ok_or_else(|| self.error("Malformed node coordinates"))
    }

    fn number(&self, idx: usize, what: &str) -> Result<usize> {
        self.field(idx)
            .and_then(|f| f.parse().ok())
            .ok_or_else(|| self.error(format!("Malformed {}", what)))
    }

    pub fn node_id(&self) -> Result<usize> {
        self.number(1, "node id")
    }

    pub fn index(&self) -> Result<usize> {
        self.number(5, "pin/track index")
    }

    /// Pin number of a block port, e.g. `fpga_logic_block.logic_o[3]` -> 3.
    pub fn block_pin(&self) -> Result<usize> {
        self.field(6)
            .and_then(instance_number)
            .ok_or_else(|| self.error("Malformed block pin"))
    }

    /// Direction of a channel node. VPR numbers the nodes of a channel so that
    /// tracks running right or up get even ids.
    pub fn channel_dir(&self) -> Result<Direction> {
        let even = self.node_id()? % 2 == 0;
        match (self.kind()?, even) {
            (ObjectKind::ChanX, true) => Ok(Direction::Right),
            (ObjectKind::ChanX, false) => Ok(Direction::Left),
            (ObjectKind::ChanY, true) => Ok(Direction::Up),
            (ObjectKind::ChanY, false) => Ok(Direction::Down),
            (kind, _) => Err(self.error(format!("{:?} is not a channel", kind))),
        }
    }

    /// Track within the node's direction. VPR counts the tracks of both
    /// directions together.
    pub fn track(&self, arch: &Arch) -> Result<usize> {
        let track = self.index()? / 2;
        if track >= arch.tracks() {
            return Err(self.error(format!(
                "Wrong track number {} out of {}", track, arch.tracks()
            )));
        }
        Ok(track)
    }
}

/// A routing-node track configured by the trace.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct ChannelEvent {
    pub coord: Coord,
    pub dir: Direction,
    pub track: usize,
    pub source_mux: u32,
}

/// A logic-block input fed from a channel track.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct BlockTerminal {
    pub coord: Coord,
    pub input: usize,
    pub mux: u32,
}

/// An output pad fed from a channel track. `coord.sub` is the pad pin.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct PadTerminal {
    pub coord: Coord,
    pub mux: u32,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct RouteEvent {
    pub channel: Option<ChannelEvent>,
    pub block_in: Option<BlockTerminal>,
    pub pad_in: Option<PadTerminal>,
}

/// Stateful reader over a routing trace. Reads each line once, with a single
/// line of lookahead.
pub struct RouteReader<'a, 'r> {
    arch: &'r Arch,
    lines: Peekable<Enumerate<Lines<'a>>>,
    /* Record driving the next channel, with its position and direction */
    driver: Option<Record<'a>>,
    driver_coord: Option<Coord>,
    driver_dir: Option<Direction>,
    failed: bool,
}

impl<'a, 'r> RouteReader<'a, 'r> {
    pub fn new(arch: &'r Arch, text: &'a str) -> Self {
        Self {
            arch,
            lines: text.lines().enumerate().peekable(),
            driver: None,
            driver_coord: None,
            driver_dir: None,
            failed: false,
        }
    }

    fn next_record(&mut self) -> Option<Record<'a>> {
        self.lines.next().map(|(idx, text)| Record::new(idx + 1, text))
    }

    fn peek_record(&mut self) -> Option<Record<'a>> {
        self.lines.peek().copied().map(|(idx, text)| Record::new(idx + 1, text))
    }

    /// Returns the next routing event, or `None` once the trace is exhausted.
    pub fn next_channel(&mut self) -> Result<Option<RouteEvent>> {
        let mut coord = None;

        while let Some(record) = self.next_record() {
            if record.is_node() {
                coord = Some(record.coord()?);
            }

            if record.is_chan() {
                let coord = coord.ok_or_else(|| record.error("Channel outside of a node"))?;
                let dir = record.channel_dir()?;
                let track = record.track(self.arch)?;
                let source_mux = self.source_mux(&record, &coord, dir, track)?;
                let (block_in, pad_in) = self.peek_terminal(dir, track)?;

                dbg_log!(
                    DBG_EXTRA, "Line {}: {} {} track {} <- mux {}",
                    record.line_no, coord, dir, track, source_mux
                );

                self.driver = Some(record);
                self.driver_coord = Some(coord);
                self.driver_dir = Some(dir);

                return Ok(Some(RouteEvent {
                    channel: Some(ChannelEvent { coord, dir, track, source_mux }),
                    block_in,
                    pad_in,
                }));
            }

            match record.node_type() {
                Some("SINK") => if let Some(event) = self.branch()? {
                    return Ok(Some(event));
                },
                Some("IPIN") => (),
                _ if record.fields.len() > 4 => {
                    self.driver = Some(record);
                    self.driver_coord = coord;
                },
                _ => (),
            }
        }

        Ok(None)
    }

    /* A net continues after a SINK with a node it already went through. That node
     * becomes the driver of what follows. A channel branch point may feed a
     * terminal directly, which yields an event without a channel. */
    fn branch(&mut self) -> Result<Option<RouteEvent>> {
        let record = match self.next_record() {
            Some(record) => record,
            None => {
                self.driver = None;
                return Ok(None);
            },
        };

        if record.fields.len() > 4 && record.is_chan() {
            let dir = record.channel_dir()?;
            let track = record.track(self.arch)?;
            self.driver_coord = Some(record.coord()?);
            self.driver_dir = Some(dir);
            self.driver = Some(record);

            let (block_in, pad_in) = self.peek_terminal(dir, track)?;
            if block_in.is_some() || pad_in.is_some() {
                return Ok(Some(RouteEvent { channel: None, block_in, pad_in }));
            }
        } else {
            if record.fields.len() > 4 && (record.is_pad() || record.is_block()) {
                self.driver_coord = Some(record.coord()?);
            }
            self.driver = Some(record);
        }

        Ok(None)
    }

    /* Terminal fed by the channel, if the next record is one. Block and pad input
     * muxes select a track by its direction and number. */
    fn peek_terminal(&mut self, dir: Direction, track: usize)
        -> Result<(Option<BlockTerminal>, Option<PadTerminal>)>
    {
        let record = match self.peek_record() {
            Some(record) => record,
            None => return Ok((None, None)),
        };
        let mux = self.arch.binput_code(dir, track);

        if record.is_block() {
            let port = record.field(6).unwrap_or_default();
            if !port.contains(BLOCK_INPUT_SIGNATURE) {
                return Err(record.error("Channel feeds a block pin that is not an input"));
            }
            let input = record.block_pin()?;
            if input >= self.arch.block_inputs() {
                return Err(record.error(format!("Wrong block input number {}", input)));
            }
            let coord = record.coord()?;
            return Ok((Some(BlockTerminal { coord, input, mux }), None));
        }

        if record.fields.len() >= 5 && record.is_pad() {
            let pin = record.index()? / PAD_PIN_CLASSES;
            if pin >= self.arch.pins_per_pad() {
                return Err(record.error(format!("Wrong IO pin number {}", pin)));
            }
            let coord = record.coord()?;
            let coord = Coord::with_sub(coord.x, coord.y, pin);
            return Ok((None, Some(PadTerminal { coord, mux })));
        }

        Ok((None, None))
    }

    /* Mux code of the channel `record` derived from the latched driver */
    fn source_mux(&self, record: &Record<'a>, coord: &Coord, dir: Direction, track: usize)
        -> Result<u32>
    {
        let driver = self.driver.as_ref()
            .ok_or_else(|| record.error("Channel has no driver"))?;
        let driver_coord = self.driver_coord
            .ok_or_else(|| record.error("Driver has no coordinates"))?;

        if driver.is_pad() {
            let pin = driver.index()?.checked_sub(1)
                .map(|idx| idx / PAD_PIN_CLASSES)
                .ok_or_else(|| driver.error("Pad pin is not an output"))?;
            switch::block_output_mux(
                self.arch, ObjectKind::Pad, &driver_coord, coord, dir, pin
            ).map_err(|e| record.wrap(e))
        } else if driver.is_block() {
            let pin = driver.block_pin()?;
            switch::block_output_mux(
                self.arch, ObjectKind::Block, &driver_coord, coord, dir, pin
            ).map_err(|e| record.wrap(e))
        } else if driver.is_chan() {
            let src_dir = self.driver_dir
                .ok_or_else(|| record.error("Driving channel has no direction"))?;
            let src_track = driver.track(self.arch)?;
            switch::channel_mux(self.arch, src_dir, src_track, dir, track)
                .map_err(|e| record.wrap(e))
        } else {
            Err(record.error(format!(
                "Unexpected net source \"{}\" (line {})", driver.text.trim(), driver.line_no
            )))
        }
    }
}

impl<'a, 'r> Iterator for RouteReader<'a, 'r> {
    type Item = Result<RouteEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let next = self.next_channel();
        self.failed = next.is_err();
        next.transpose()
    }
}
