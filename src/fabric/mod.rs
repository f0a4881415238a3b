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


/* Configuration model of the whole fabric: the tile grid (empty corners, I/O pads
 * on the edges, logic blocks inside) and four grids of directional routing nodes
 * sitting between the tiles. */

pub mod load;
pub mod dump;


use serde::Serialize;
use crate::arch::Arch;
use crate::common::{Coord, Direction};
use crate::error::{BitgenError, Result};
use crate::route::RouteEvent;
#[allow(unused)]
use crate::log::*;

/// Selector of a write-once configuration mux. Writing the same code twice is
/// accepted, two distinct codes are a conflict.
fn write_once(slot: &mut Option<u32>, code: u32, limit: u32, what: impl Fn() -> String)
    -> Result<()>
{
    if code >= limit {
        return Err(BitgenError::Topology(format!(
            "{}: mux code {} out of range 0..{}", what(), code, limit
        )));
    }
    match *slot {
        Some(prev) if prev != code => Err(BitgenError::Topology(format!(
            "{}: already driven by mux code {}, cannot switch to {}", what(), prev, code
        ))),
        _ => {
            *slot = Some(code);
            Ok(())
        },
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize)]
pub enum CellInput {
    Unconnected,
    Select(u32),
}

#[derive(Clone, Debug, Serialize)]
pub struct LogicCell {
    pub index: usize,
    pub name: String,
    pub instance: String,
    pub lut: u64,
    pub inputs: Vec<CellInput>,
    pub registered: bool,
}

impl LogicCell {
    pub fn new(arch: &Arch, index: usize) -> Self {
        Self {
            index,
            name: "open".into(),
            instance: "-".into(),
            lut: 0,
            inputs: vec![CellInput::Unconnected; arch.lut_width()],
            registered: false,
        }
    }

    pub fn is_used(&self) -> bool {
        self.name != "open"
    }

    /// Crossbar codes as loaded into the fabric. An unconnected input selects the
    /// cell's own output.
    pub fn input_codes(&self) -> Vec<u32> {
        self.inputs.iter()
            .map(|input| match input {
                CellInput::Unconnected => self.index as u32,
                CellInput::Select(code) => *code,
            })
            .collect()
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct LogicBlock {
    pub coord: Coord,
    pub name: String,
    pub instance: String,
    pub cells: Vec<LogicCell>,
    /// Raw block input mux codes, see `Arch::binput_code`.
    pub inputs: Vec<Option<u32>>,
}

impl LogicBlock {
    pub fn new(arch: &Arch, coord: Coord) -> Self {
        Self {
            coord,
            name: String::new(),
            instance: String::new(),
            cells: (0 .. arch.cells_per_block()).map(|i| LogicCell::new(arch, i)).collect(),
            inputs: vec![None; arch.block_inputs()],
        }
    }

    pub fn set_input(&mut self, arch: &Arch, input: usize, code: u32) -> Result<()> {
        let coord = self.coord;
        let slot = self.inputs.get_mut(input).ok_or_else(|| BitgenError::Topology(
            format!("Logic block {} has no input {}", coord, input)
        ))?;
        write_once(slot, code, arch.binput_codes(), || format!(
            "Logic block {} input {}", coord, input
        ))
    }

    /// Block input mux codes as loaded into the fabric.
    pub fn input_codes(&self, arch: &Arch) -> Vec<Option<u32>> {
        self.inputs.iter()
            .map(|code| code.map(|c| c / arch.block_in_muxes_coef() as u32))
            .collect()
    }

    pub fn used_cells(&self) -> usize {
        self.cells.iter().filter(|c| c.is_used()).count()
    }
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct IoPin {
    pub mode: Option<String>,
    pub name: String,
    pub instance: String,
    pub track: Option<u32>,
}

impl IoPin {
    pub fn is_output(&self) -> bool {
        self.mode.as_deref() == Some("outpad")
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct IoBlock {
    pub coord: Coord,
    pub pins: Vec<IoPin>,
}

impl IoBlock {
    pub fn new(arch: &Arch, coord: Coord) -> Self {
        Self { coord, pins: vec![IoPin::default(); arch.pins_per_pad()] }
    }

    fn pin_mut(&mut self, pin: usize) -> Result<&mut IoPin> {
        let coord = self.coord;
        self.pins.get_mut(pin).ok_or_else(|| BitgenError::Topology(
            format!("Pad {} has no pin {}", coord, pin)
        ))
    }

    pub fn set_track(&mut self, arch: &Arch, pin: usize, code: u32) -> Result<()> {
        let coord = self.coord;
        let slot = &mut self.pin_mut(pin)?.track;
        write_once(slot, code, arch.binput_codes(), || format!("Pad {} pin {}", coord, pin))
    }

    /// Per-pin mux codes as loaded into the fabric, last pin first. Only output
    /// pads select a track.
    pub fn mux_codes(&self, arch: &Arch) -> Vec<Option<u32>> {
        self.pins.iter()
            .rev()
            .map(|pin| match pin.is_output() {
                true => pin.track.map(|t| t / arch.block_in_muxes_coef() as u32),
                false => None,
            })
            .collect()
    }

    pub fn used_pins(&self) -> usize {
        self.pins.iter().filter(|p| p.mode.is_some()).count()
    }
}

#[derive(Clone, Debug, Serialize)]
pub enum Tile {
    Empty(Coord),
    Io(IoBlock),
    Logic(LogicBlock),
}

impl Tile {
    pub fn coord(&self) -> Coord {
        match self {
            Self::Empty(coord) => *coord,
            Self::Io(io) => io.coord,
            Self::Logic(lb) => lb.coord,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct RoutingNode {
    pub coord: Coord,
    pub dir: Direction,
    pub tracks: Vec<Option<u32>>,
}

impl RoutingNode {
    pub fn new(arch: &Arch, coord: Coord, dir: Direction) -> Self {
        Self { coord, dir, tracks: vec![None; arch.tracks()] }
    }

    pub fn set_track(&mut self, arch: &Arch, track: usize, code: u32) -> Result<()> {
        let (coord, dir) = (self.coord, self.dir);
        let slot = self.tracks.get_mut(track).ok_or_else(|| BitgenError::Topology(
            format!("{} routing node at {} has no track {}", dir, coord, track)
        ))?;
        write_once(slot, code, arch.rnode_codes(), || format!(
            "{} routing node at {} track {}", dir, coord, track
        ))
    }

    pub fn used_tracks(&self) -> usize {
        self.tracks.iter().filter(|t| t.is_some()).count()
    }
}

/// Routing nodes of one direction, indexed `[x][y]`.
#[derive(Clone, Debug, Serialize)]
pub struct RoutingGrid {
    pub dir: Direction,
    pub nodes: Vec<Vec<RoutingNode>>,
}

impl RoutingGrid {
    /* Vertical nodes sit above the tile row they are indexed by, horizontal ones to
     * the right of the tile column. */
    fn new(arch: &Arch, dir: Direction) -> Self {
        let (size_x, size_y) = Self::dimensions(arch, dir);
        let nodes = (0 .. size_x)
            .map(|x| (0 .. size_y)
                .map(|y| {
                    let coord = match dir.is_vertical() {
                        true => Coord::new(x, y + 1),
                        false => Coord::new(x + 1, y),
                    };
                    RoutingNode::new(arch, coord, dir)
                })
                .collect())
            .collect();
        Self { dir, nodes }
    }

    pub fn dimensions(arch: &Arch, dir: Direction) -> (usize, usize) {
        match dir.is_vertical() {
            true => (arch.size_x() - 1, arch.size_y() - 2),
            false => (arch.size_x() - 2, arch.size_y() - 1),
        }
    }

    pub fn get(&self, x: usize, y: usize) -> Option<&RoutingNode> {
        self.nodes.get(x).and_then(|col| col.get(y))
    }

    pub fn get_mut(&mut self, x: usize, y: usize) -> Option<&mut RoutingNode> {
        self.nodes.get_mut(x).and_then(|col| col.get_mut(y))
    }

    pub fn iter(&self) -> impl Iterator<Item = &RoutingNode> {
        self.nodes.iter().flatten()
    }
}

/// Utilisation counts of a loaded fabric.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub logic_blocks: usize,
    pub logic_cells: usize,
    pub io_pins: usize,
    pub routing_tracks: usize,
}

pub struct Fabric<'a> {
    arch: &'a Arch,
    /* Indexed [x][y] */
    tiles: Vec<Vec<Tile>>,
    up: RoutingGrid,
    down: RoutingGrid,
    left: RoutingGrid,
    right: RoutingGrid,
}

impl<'a> Fabric<'a> {
    pub fn new(arch: &'a Arch) -> Self {
        let (sx, sy) = (arch.size_x(), arch.size_y());
        let is_edge_x = |x| x == 0 || x == sx - 1;
        let is_edge_y = |y| y == 0 || y == sy - 1;

        let tiles = (0 .. sx)
            .map(|x| (0 .. sy)
                .map(|y| {
                    let coord = Coord::new(x, y);
                    match (is_edge_x(x), is_edge_y(y)) {
                        (true, true) => Tile::Empty(coord),
                        (true, false) | (false, true) => Tile::Io(IoBlock::new(arch, coord)),
                        (false, false) => Tile::Logic(LogicBlock::new(arch, coord)),
                    }
                })
                .collect())
            .collect();

        Self {
            arch,
            tiles,
            up: RoutingGrid::new(arch, Direction::Up),
            down: RoutingGrid::new(arch, Direction::Down),
            left: RoutingGrid::new(arch, Direction::Left),
            right: RoutingGrid::new(arch, Direction::Right),
        }
    }

    pub fn arch(&self) -> &'a Arch {
        self.arch
    }

    pub fn tile(&self, x: usize, y: usize) -> Option<&Tile> {
        self.tiles.get(x).and_then(|col| col.get(y))
    }

    /// Tiles in row-major order (bottom row first).
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        (0 .. self.arch.size_y())
            .flat_map(move |y| (0 .. self.arch.size_x()).filter_map(move |x| self.tile(x, y)))
    }

    pub fn logic_block(&self, x: usize, y: usize) -> Option<&LogicBlock> {
        match self.tile(x, y) {
            Some(Tile::Logic(lb)) => Some(lb),
            _ => None,
        }
    }

    pub fn io_block(&self, x: usize, y: usize) -> Option<&IoBlock> {
        match self.tile(x, y) {
            Some(Tile::Io(io)) => Some(io),
            _ => None,
        }
    }

    pub fn logic_block_mut(&mut self, coord: &Coord) -> Result<&mut LogicBlock> {
        match self.tiles.get_mut(coord.x).and_then(|col| col.get_mut(coord.y)) {
            Some(Tile::Logic(lb)) => Ok(lb),
            _ => Err(BitgenError::Topology(format!("No logic block at {}", coord))),
        }
    }

    pub fn io_block_mut(&mut self, coord: &Coord) -> Result<&mut IoBlock> {
        match self.tiles.get_mut(coord.x).and_then(|col| col.get_mut(coord.y)) {
            Some(Tile::Io(io)) => Ok(io),
            _ => Err(BitgenError::Topology(format!("No IO block at {}", coord))),
        }
    }

    pub fn grid(&self, dir: Direction) -> &RoutingGrid {
        match dir {
            Direction::Up => &self.up,
            Direction::Down => &self.down,
            Direction::Left => &self.left,
            Direction::Right => &self.right,
        }
    }

    fn grid_mut(&mut self, dir: Direction) -> &mut RoutingGrid {
        match dir {
            Direction::Up => &mut self.up,
            Direction::Down => &mut self.down,
            Direction::Left => &mut self.left,
            Direction::Right => &mut self.right,
        }
    }

    /// Writes the mux codes of a routing event into the fabric.
    pub fn apply(&mut self, event: &RouteEvent) -> Result<()> {
        let arch = self.arch;

        if let Some(term) = &event.block_in {
            self.logic_block_mut(&term.coord)?.set_input(arch, term.input, term.mux)?;
        }

        if let Some(term) = &event.pad_in {
            self.io_block_mut(&term.coord)?.set_track(arch, term.coord.sub, term.mux)?;
        }

        if let Some(chan) = &event.channel {
            let (x, y) = (chan.coord.x, chan.coord.y);
            /* Grids skip the first tile row (vertical) or column (horizontal) */
            let index = match chan.dir.is_vertical() {
                true => y.checked_sub(1).map(|y| (x, y)),
                false => x.checked_sub(1).map(|x| (x, y)),
            };
            let node = index
                .and_then(|(x, y)| self.grid_mut(chan.dir).get_mut(x, y))
                .ok_or_else(|| BitgenError::Topology(format!(
                    "Invalid {} channel at {} from route", chan.dir, chan.coord
                )))?;
            node.set_track(arch, chan.track, chan.source_mux)?;
        }

        Ok(())
    }

    pub fn summary(&self) -> Summary {
        let mut summary = Summary::default();
        for tile in self.tiles() {
            match tile {
                Tile::Logic(lb) => {
                    let used = lb.used_cells();
                    summary.logic_cells += used;
                    summary.logic_blocks += (used > 0) as usize;
                },
                Tile::Io(io) => summary.io_pins += io.used_pins(),
                Tile::Empty(_) => (),
            }
        }
        summary.routing_tracks = Direction::ALL.iter()
            .map(|dir| self.grid(*dir).iter().map(RoutingNode::used_tracks).sum::<usize>())
            .sum();
        summary
    }
}
