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


use serde::Serialize;
use crate::error::{BitgenError, Result};

#[derive(Copy, Clone, Hash, PartialEq, Eq, Debug, Serialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Self::Up, Self::Down, Self::Left, Self::Right];

    /* Position of the direction in per-direction tables (input mux bases, grids) */
    pub fn index(self) -> usize {
        match self {
            Self::Up => 0,
            Self::Down => 1,
            Self::Left => 2,
            Self::Right => 3,
        }
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, Self::Up | Self::Down)
    }

    /// Kind of channel a track running in this direction belongs to.
    pub fn channel_kind(self) -> ObjectKind {
        if self.is_vertical() { ObjectKind::ChanY } else { ObjectKind::ChanX }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Up => "UP",
            Self::Down => "DOWN",
            Self::Left => "LEFT",
            Self::Right => "RIGHT",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Classification of a routing-trace node record.
#[derive(Copy, Clone, Hash, PartialEq, Eq, Debug)]
pub enum ObjectKind {
    Block,
    ChanX,
    ChanY,
    Pad,
}

/// Grid coordinate. `sub` is context dependent: subblock index for placement
/// entries, pin number for pad terminals. It never takes part in direction
/// inference.
#[derive(Copy, Clone, Hash, PartialEq, Eq, Debug, Default, Serialize)]
pub struct Coord {
    pub x: usize,
    pub y: usize,
    pub sub: usize,
}

impl Coord {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y, sub: 0 }
    }

    pub fn with_sub(x: usize, y: usize, sub: usize) -> Self {
        Self { x, y, sub }
    }

    /// Returns the direction leading from `self` to `other`. Only defined when the
    /// coordinates differ along exactly one axis.
    pub fn direction_to(&self, other: &Coord) -> Result<Direction> {
        use std::cmp::Ordering::*;
        match (other.x.cmp(&self.x), other.y.cmp(&self.y)) {
            (Equal, Less) => Ok(Direction::Down),
            (Equal, Greater) => Ok(Direction::Up),
            (Less, Equal) => Ok(Direction::Left),
            (Greater, Equal) => Ok(Direction::Right),
            _ => Err(BitgenError::Topology(
                format!("Direction undefined: {} -> {}", self, other)
            )),
        }
    }

    /* Channels sit between tiles: CHANX half a tile above its coordinate, CHANY half
     * a tile to the right. Doubling the grid keeps all of that in integers. */
    fn doubled(&self, kind: ObjectKind) -> Coord {
        let (dx, dy) = match kind {
            ObjectKind::ChanX => (0, 1),
            ObjectKind::ChanY => (1, 0),
            ObjectKind::Block | ObjectKind::Pad => (0, 0),
        };
        Coord::new(2 * self.x + dx, 2 * self.y + dy)
    }

    /// Side of the tile at `self` on which the channel segment at `chan` lies.
    pub fn side_of_channel(&self, chan: &Coord, chan_kind: ObjectKind) -> Result<Direction> {
        self.doubled(ObjectKind::Block).direction_to(&chan.doubled(chan_kind))
            .map_err(|_| BitgenError::Topology(format!(
                "Channel {:?} at {} is not adjacent to tile {}", chan_kind, chan, self
            )))
    }
}

impl std::fmt::Display for Coord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{},{}]", self.x, self.y)
    }
}

/// Parses `(x,y)` or `(x,y,layer)` tokens. Extra components are ignored.
pub fn coord_from_braces(s: &str) -> Option<Coord> {
    let inner = s.trim_end_matches(',').strip_prefix('(')?.strip_suffix(')')?;
    let mut it = inner.split(',').map(|v| v.trim().parse::<usize>());
    let x = it.next()?.ok()?;
    let y = it.next()?.ok()?;
    Some(Coord::new(x, y))
}

/// Extracts the number between the first pair of square brackets, e.g.
/// `fpga_logic_cell[2].out[0]` -> 2.
pub fn instance_number(s: &str) -> Option<usize> {
    let start = s.find('[')? + 1;
    let end = start + s[start..].find(']')?;
    s[start..end].parse().ok()
}

/// Name of the instance type, i.e. everything before the first bracket.
pub fn instance_type(s: &str) -> &str {
    s.split('[').next().unwrap_or(s)
}

/// Number of bits needed to encode `states` distinct values.
pub fn bits_for(states: u64) -> u32 {
    if states <= 1 { 1 } else { 64 - (states - 1).leading_zeros() }
}
