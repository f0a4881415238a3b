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


/* Scan-chain image of a configured fabric.
 *
 * The fabric is loaded through three independent chains (logic blocks, vertical
 * routing, horizontal routing), each made of several lanes shifted in parallel.
 * Row `i` of a chain holds bit `i` of every lane and is loaded as one word. */


use std::io::Write;
use crate::arch::{Arch, ChainKind};
use crate::common::Direction;
use crate::error::{BitgenError, Result};
use crate::fabric::{Fabric, IoBlock, RoutingNode};
#[allow(unused)]
use crate::log::*;

/// Expands a mux code into `width` bits, least significant first. An unset code
/// becomes the idle (all ones) pattern.
pub fn expand_code(code: Option<u64>, width: usize) -> Result<String> {
    match code {
        None => Ok("1".repeat(width)),
        Some(value) if width < 64 && value >> width != 0 => Err(BitgenError::Bitstream(
            format!("Value {:#x} does not fit in {} bits", value, width)
        )),
        Some(value) => Ok((0 .. width)
            .map(|bit| if (value >> bit) & 1 == 1 { '1' } else { '0' })
            .collect()),
    }
}

#[derive(Default)]
struct LaneBuilder {
    bits: String,
}

impl LaneBuilder {
    fn push<I>(&mut self, codes: I, width: u32) -> Result<()> where
        I: IntoIterator<Item = Option<u32>>
    {
        for code in codes {
            self.bits += &expand_code(code.map(u64::from), width as usize)?;
        }
        Ok(())
    }

    fn push_pad(&mut self, arch: &Arch, io: Option<&IoBlock>) -> Result<()> {
        let io = io.ok_or_else(|| BitgenError::Bitstream("Missing IO block on fabric edge".into()))?;
        self.push(io.mux_codes(arch), arch.binput_width())
    }

    fn push_node(&mut self, arch: &Arch, node: Option<&RoutingNode>) -> Result<()> {
        let node = node.ok_or_else(|| BitgenError::Bitstream("Missing routing node".into()))?;
        self.push(node.tracks.iter().copied(), arch.rnode_width())
    }
}

/// Lanes of one chain, all of the same length.
#[derive(Clone, Debug)]
pub struct ScanChain {
    pub kind: ChainKind,
    pub lanes: Vec<String>,
}

impl ScanChain {
    fn new(arch: &Arch, kind: ChainKind, lanes: Vec<LaneBuilder>) -> Result<Self> {
        let depth = arch.chain_depth(kind);
        let lanes: Vec<_> = lanes.into_iter().map(|l| l.bits).collect();
        for (idx, lane) in lanes.iter().enumerate() {
            if lane.len() != depth {
                return Err(BitgenError::Bitstream(format!(
                    "{:?} chain lane {} has {} bits, expected {}", kind, idx, lane.len(), depth
                )));
            }
        }
        Ok(Self { kind, lanes })
    }

    pub fn depth(&self) -> usize {
        self.lanes.first().map(String::len).unwrap_or(0)
    }

    /// Bit `i` of every lane, first lane first. Empty past the end of the chain.
    pub fn row(&self, i: usize) -> String {
        self.lanes.iter()
            .filter_map(|lane| lane.as_bytes().get(i).map(|b| *b as char))
            .collect()
    }

    /// Row `i` packed into a word, lane `j` in bit `j`.
    pub fn word(&self, i: usize) -> u16 {
        self.lanes.iter()
            .enumerate()
            .filter(|(_, lane)| lane.as_bytes().get(i) == Some(&b'1'))
            .fold(0, |word, (j, _)| word | (1 << j))
    }

    pub fn words(&self) -> Vec<u16> {
        (0 .. self.depth()).map(|i| self.word(i)).collect()
    }
}

pub struct Bitstream {
    chains: Vec<ScanChain>,
}

impl Bitstream {
    pub fn from_fabric(fabric: &Fabric) -> Result<Self> {
        let arch = fabric.arch();
        let chains = vec![
            ScanChain::new(arch, ChainKind::Block, Self::block_lanes(fabric)?)?,
            ScanChain::new(arch, ChainKind::Vertical, Self::vertical_lanes(fabric)?)?,
            ScanChain::new(arch, ChainKind::Horizontal, Self::horizontal_lanes(fabric)?)?,
        ];

        for chain in &chains {
            dbg_log!(
                DBG_INFO, "{:?} chain: {} lanes x {} bits",
                chain.kind, chain.lanes.len(), chain.depth()
            );
        }

        Ok(Self { chains })
    }

    /* One lane per logic-block column, blocks bottom to top */
    fn block_lanes(fabric: &Fabric) -> Result<Vec<LaneBuilder>> {
        let arch = fabric.arch();
        (1 .. arch.size_x() - 1).map(|x| -> Result<LaneBuilder> {
            let mut lane = LaneBuilder::default();
            for y in 1 .. arch.size_y() - 1 {
                let lb = fabric.logic_block(x, y).ok_or_else(|| BitgenError::Bitstream(
                    format!("No logic block at [{},{}]", x, y)
                ))?;
                lane.push(lb.input_codes(arch), arch.binput_width())?;
                for cell in &lb.cells {
                    lane.push(cell.input_codes().into_iter().map(Some), arch.lbcross_width())?;
                }
                for cell in &lb.cells {
                    lane.bits += &expand_code(Some(cell.lut), arch.lut_bits())?;
                    lane.bits += &expand_code(Some(cell.registered as u64), 1)?;
                }
            }
            Ok(lane)
        }).collect()
    }

    /* One lane per row of vertical nodes, between the left and right pads */
    fn vertical_lanes(fabric: &Fabric) -> Result<Vec<LaneBuilder>> {
        let arch = fabric.arch();
        let (up, down) = (fabric.grid(Direction::Up), fabric.grid(Direction::Down));
        (0 .. arch.size_y() - 2).map(|y| -> Result<LaneBuilder> {
            let mut lane = LaneBuilder::default();
            lane.push_pad(arch, fabric.io_block(0, y + 1))?;
            for x in 0 .. arch.size_x() - 1 {
                lane.push_node(arch, up.get(x, y))?;
                lane.push_node(arch, down.get(x, y))?;
            }
            lane.push_pad(arch, fabric.io_block(arch.size_x() - 1, y + 1))?;
            Ok(lane)
        }).collect()
    }

    /* One lane per column of horizontal nodes, between the bottom and top pads */
    fn horizontal_lanes(fabric: &Fabric) -> Result<Vec<LaneBuilder>> {
        let arch = fabric.arch();
        let (left, right) = (fabric.grid(Direction::Left), fabric.grid(Direction::Right));
        (0 .. arch.size_x() - 2).map(|x| -> Result<LaneBuilder> {
            let mut lane = LaneBuilder::default();
            lane.push_pad(arch, fabric.io_block(x + 1, 0))?;
            for y in 0 .. arch.size_y() - 1 {
                lane.push_node(arch, left.get(x, y))?;
                lane.push_node(arch, right.get(x, y))?;
            }
            lane.push_pad(arch, fabric.io_block(x + 1, arch.size_y() - 1))?;
            Ok(lane)
        }).collect()
    }

    pub fn chain(&self, kind: ChainKind) -> &ScanChain {
        &self.chains[kind as usize]
    }

    pub fn chains(&self) -> &[ScanChain] {
        &self.chains
    }

    /// Number of rows of the image, i.e. the depth of the deepest chain.
    pub fn rows(&self) -> usize {
        self.chains.iter().map(ScanChain::depth).max().unwrap_or(0)
    }

    /// Line of the `.bit` file: the rows of the three chains.
    pub fn row_line(&self, i: usize) -> String {
        self.chains.iter().map(|c| c.row(i)).collect::<Vec<_>>().join(" ")
    }

    pub fn write_bit<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        for i in 0 .. self.rows() {
            writeln!(out, "{}", self.row_line(i))?;
        }
        Ok(())
    }

    /// C table with the words of one chain.
    pub fn header(&self, kind: ChainKind, source: &str) -> String {
        let table = kind.table_name();
        let words: Vec<_> = self.chain(kind).words()
            .iter()
            .map(|w| format!("{:#x}", w))
            .collect();

        format!(
            "// Bitstream generated from {}\n\
             const uint16_t {}_config_data[] = {{\n{}\n}};\n\
             const int {}_config_words = {};\n",
            source, table, words.join(",\n"), table, words.len()
        )
    }
}
