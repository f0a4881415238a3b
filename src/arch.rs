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


use std::path::Path;
use serde::{Serialize, Deserialize};
use crate::common::{bits_for, Direction};
use crate::error::{io_error, BitgenError, Result};
#[allow(unused)]
use crate::log::*;

/* Scan-chain rows are packed into 16-bit loader words, one bit per lane */
pub const MAX_CHAIN_LANES: usize = 16;
pub const MAX_LUT_WIDTH: usize = 6;

fn default_block_sides() -> usize { 4 }
fn default_coef() -> usize { 1 }

/// Register map and timing of the configuration loader bus.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct LoaderParams {
    pub block_cfg_addr: u32,
    pub vrnode_cfg_addr: u32,
    pub hrnode_cfg_addr: u32,
    pub clk_cfg_addr: u32,
    pub rst_cfg_addr: u32,
    pub config_delay_ticks: u32,
}

impl Default for LoaderParams {
    fn default() -> Self {
        Self {
            block_cfg_addr: 0x3010_0000,
            vrnode_cfg_addr: 0x3020_0000,
            hrnode_cfg_addr: 0x3030_0000,
            clk_cfg_addr: 0x30E0_0000,
            rst_cfg_addr: 0x30A0_0000,
            config_delay_ticks: 1,
        }
    }
}

/// Base architecture parameters as written in the architecture file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ArchParams {
    #[serde(default)]
    pub name: Option<String>,
    pub fabric_size_x: usize,
    pub fabric_size_y: usize,
    pub cells_per_block: usize,
    /// Number of LUT inputs. Every logic cell has exactly this many crossbar inputs.
    pub lut_width: usize,
    pub block_inputs: usize,
    pub block_outputs: usize,
    #[serde(default = "default_block_sides")]
    pub block_sides: usize,
    pub pins_per_pad: usize,
    pub tracks_per_rnode: usize,
    #[serde(default = "default_coef")]
    pub block_in_muxes_coef: usize,
    #[serde(default)]
    pub binput_mux_width: Option<u32>,
    #[serde(default)]
    pub lbcross_mux_width: Option<u32>,
    #[serde(default)]
    pub rnode_mux_width: Option<u32>,
    #[serde(default)]
    pub loader: LoaderParams,
}

/// Multiplexer input groups of a single routing track.
#[derive(Copy, Clone, Hash, PartialEq, Eq, Debug)]
pub enum MuxGroup {
    /// Outputs of the block to the left of / above the track
    BlockOutLow,
    /// Outputs of the block to the right of / below the track
    BlockOutHigh,
    Forward,
    TurnLeft,
    TurnRight,
}

#[derive(Copy, Clone, Hash, PartialEq, Eq, Debug, Serialize)]
pub enum ChainKind {
    Block,
    Vertical,
    Horizontal,
}

impl ChainKind {
    pub const ALL: [ChainKind; 3] = [Self::Block, Self::Vertical, Self::Horizontal];

    /* Bit of the strobe register pulsing the chain's shift clock */
    pub fn strobe(self) -> u32 {
        match self {
            Self::Block => 1,
            Self::Vertical => 2,
            Self::Horizontal => 4,
        }
    }

    /* Prefix of the generated C tables */
    pub fn table_name(self) -> &'static str {
        match self {
            Self::Block => "lblock",
            Self::Vertical => "vnode",
            Self::Horizontal => "hnode",
        }
    }

    /* Suffix of the generated header file */
    pub fn file_tag(self) -> &'static str {
        match self {
            Self::Block => "lb",
            Self::Vertical => "vn",
            Self::Horizontal => "hn",
        }
    }
}

/// Validated architecture together with every constant derived from it. Built once
/// and shared by reference with every component.
#[derive(Debug, Clone)]
pub struct Arch {
    pub params: ArchParams,
    binput_width: u32,
    lbcross_width: u32,
    rnode_width: u32,
}

fn check(cond: bool, msg: impl FnOnce() -> String) -> Result<()> {
    if cond { Ok(()) } else { Err(BitgenError::Arch(msg())) }
}

fn pick_width(name: &str, requested: Option<u32>, minimum: u32) -> Result<u32> {
    match requested {
        None => Ok(minimum),
        Some(w) if w >= minimum && w <= 32 => Ok(w),
        Some(w) => Err(BitgenError::Arch(format!(
            "{} = {} cannot encode all mux states (needs at least {} bits)", name, w, minimum
        ))),
    }
}

impl Arch {
    pub fn load<P>(path: P) -> Result<Self> where P: AsRef<Path> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| io_error(path.as_ref(), e))?;
        Self::from_yaml(&text)
    }

    /// Parses YAML (or JSON, which is a subset of it) architecture parameters.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let params: ArchParams = serde_yaml::from_str(text)
            .map_err(|e| BitgenError::Arch(format!("malformed parameter file: {}", e)))?;
        Self::new(params)
    }

    pub fn new(params: ArchParams) -> Result<Self> {
        let p = &params;
        check(p.fabric_size_x >= 3 && p.fabric_size_y >= 3, || format!(
            "fabric {}x{} has no logic tiles", p.fabric_size_x, p.fabric_size_y
        ))?;
        check(p.cells_per_block > 0, || "cells_per_block must be positive".into())?;
        check(p.lut_width > 0 && p.lut_width <= MAX_LUT_WIDTH, || format!(
            "lut_width {} out of range 1..={}", p.lut_width, MAX_LUT_WIDTH
        ))?;
        check(p.block_inputs > 0 && p.block_inputs % p.lut_width == 0, || format!(
            "block_inputs {} must be a positive multiple of lut_width {}",
            p.block_inputs, p.lut_width
        ))?;
        check(p.block_sides > 0, || "block_sides must be positive".into())?;
        check(p.block_outputs > 0 && p.block_outputs % p.block_sides == 0, || format!(
            "block_outputs {} must be a positive multiple of block_sides {}",
            p.block_outputs, p.block_sides
        ))?;
        check(p.pins_per_pad > 0, || "pins_per_pad must be positive".into())?;
        check(p.tracks_per_rnode > 0, || "tracks_per_rnode must be positive".into())?;
        check(p.block_in_muxes_coef > 0, || "block_in_muxes_coef must be positive".into())?;

        let binput_states = (4 * p.tracks_per_rnode + p.block_in_muxes_coef - 1)
            / p.block_in_muxes_coef;
        let rnode_states = 2 * (p.block_outputs / p.block_sides) + 3;
        let lbcross_states = p.cells_per_block + p.block_inputs / p.lut_width;

        /* Idle-capable muxes reserve one more state for the all-ones idle code */
        let binput_width = pick_width(
            "binput_mux_width", p.binput_mux_width, bits_for(binput_states as u64 + 1)
        )?;
        let rnode_width = pick_width(
            "rnode_mux_width", p.rnode_mux_width, bits_for(rnode_states as u64 + 1)
        )?;
        let lbcross_width = pick_width(
            "lbcross_mux_width", p.lbcross_mux_width, bits_for(lbcross_states as u64)
        )?;

        let arch = Self { params, binput_width, lbcross_width, rnode_width };

        for kind in ChainKind::ALL {
            let lanes = arch.chain_lanes(kind);
            check(lanes <= MAX_CHAIN_LANES, || format!(
                "{:?} chain has {} lanes, loader words hold at most {}",
                kind, lanes, MAX_CHAIN_LANES
            ))?;
        }

        dbg_log!(
            DBG_INFO,
            "Architecture {}x{}: chain depths {}/{}/{}",
            arch.size_x(),
            arch.size_y(),
            arch.chain_depth(ChainKind::Block),
            arch.chain_depth(ChainKind::Vertical),
            arch.chain_depth(ChainKind::Horizontal)
        );

        Ok(arch)
    }

    pub fn name(&self) -> &str {
        self.params.name.as_deref().unwrap_or("fpga")
    }

    pub fn size_x(&self) -> usize { self.params.fabric_size_x }
    pub fn size_y(&self) -> usize { self.params.fabric_size_y }
    pub fn cells_per_block(&self) -> usize { self.params.cells_per_block }
    pub fn lut_width(&self) -> usize { self.params.lut_width }
    pub fn block_inputs(&self) -> usize { self.params.block_inputs }
    pub fn block_outputs(&self) -> usize { self.params.block_outputs }
    pub fn block_sides(&self) -> usize { self.params.block_sides }
    pub fn pins_per_pad(&self) -> usize { self.params.pins_per_pad }
    pub fn tracks(&self) -> usize { self.params.tracks_per_rnode }
    pub fn block_in_muxes_coef(&self) -> usize { self.params.block_in_muxes_coef }
    pub fn loader(&self) -> &LoaderParams { &self.params.loader }

    /// Number of truth-table bits of a LUT.
    pub fn lut_bits(&self) -> usize {
        1 << self.lut_width()
    }

    /// Every legal truth table fits in this mask.
    pub fn lut_mask(&self) -> u64 {
        match self.lut_bits() {
            64 => u64::MAX,
            bits => (1u64 << bits) - 1,
        }
    }

    /* Crossbar: codes [0, cells) select cell outputs, the following
     * `lbcross_inputs` codes select block inputs. */
    pub fn lbcross_inputs(&self) -> usize {
        self.block_inputs() / self.lut_width()
    }

    pub fn cell_lut_mux_start(&self) -> u32 { 0 }

    pub fn cell_in_mux_start(&self) -> u32 {
        self.cells_per_block() as u32
    }

    pub fn outputs_per_side(&self) -> usize {
        self.block_outputs() / self.block_sides()
    }

    /// First code of a routing-node mux group.
    pub fn group_start(&self, group: MuxGroup) -> u32 {
        let ops = self.outputs_per_side() as u32;
        match group {
            MuxGroup::BlockOutLow => 0,
            MuxGroup::BlockOutHigh => ops,
            MuxGroup::Forward => 2 * ops,
            MuxGroup::TurnLeft => 2 * ops + 1,
            MuxGroup::TurnRight => 2 * ops + 2,
        }
    }

    /// Number of legal codes of a routing-node track mux.
    pub fn rnode_codes(&self) -> u32 {
        self.group_start(MuxGroup::TurnRight) + 1
    }

    /// Raw block-input / pad mux code of a track arriving from a channel running in
    /// `dir`. The raw code is divided by `block_in_muxes_coef` at serialization.
    pub fn binput_code(&self, dir: Direction, track: usize) -> u32 {
        (dir.index() * self.tracks() + track) as u32
    }

    pub fn binput_codes(&self) -> u32 {
        (4 * self.tracks()) as u32
    }

    pub fn binput_width(&self) -> u32 { self.binput_width }
    pub fn lbcross_width(&self) -> u32 { self.lbcross_width }
    pub fn rnode_width(&self) -> u32 { self.rnode_width }

    /// Bits contributed by one logic block to its block-chain lane.
    pub fn block_bits(&self) -> usize {
        let cells = self.cells_per_block();
        self.block_inputs() * self.binput_width as usize
            + cells * self.lut_width() * self.lbcross_width as usize
            + cells * (self.lut_bits() + 1)
    }

    fn rnode_pair_bits(&self) -> usize {
        2 * self.tracks() * self.rnode_width as usize
    }

    fn pad_bits(&self) -> usize {
        self.pins_per_pad() * self.binput_width as usize
    }

    pub fn chain_lanes(&self, kind: ChainKind) -> usize {
        match kind {
            ChainKind::Block => self.size_x() - 2,
            ChainKind::Vertical => self.size_y() - 2,
            ChainKind::Horizontal => self.size_x() - 2,
        }
    }

    /// Length of every lane of a chain, i.e. the number of shift clocks needed to
    /// load it. Depends on the architecture only, never on the design.
    pub fn chain_depth(&self, kind: ChainKind) -> usize {
        match kind {
            ChainKind::Block => (self.size_y() - 2) * self.block_bits(),
            ChainKind::Vertical =>
                2 * self.pad_bits() + (self.size_x() - 1) * self.rnode_pair_bits(),
            ChainKind::Horizontal =>
                2 * self.pad_bits() + (self.size_y() - 1) * self.rnode_pair_bits(),
        }
    }

    /// Rows of a `.bit` image, i.e. the depth of the deepest chain.
    pub fn max_chain_depth(&self) -> usize {
        ChainKind::ALL.iter().map(|k| self.chain_depth(*k)).max().unwrap_or(0)
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    /// 4x4 fabric with 2 cells of 4-LUTs per block, 4 tracks per routing node.
    pub const SMALL_ARCH: &str = "
name: small
fabric_size_x: 4
fabric_size_y: 4
cells_per_block: 2
lut_width: 4
block_inputs: 8
block_outputs: 4
pins_per_pad: 2
tracks_per_rnode: 4
";

    pub fn small_arch() -> Arch {
        Arch::from_yaml(SMALL_ARCH).unwrap()
    }

    #[test]
    fn test_derived_constants() {
        let arch = small_arch();
        assert_eq!(arch.block_sides(), 4);
        assert_eq!(arch.block_in_muxes_coef(), 1);
        assert_eq!(arch.lut_bits(), 16);
        assert_eq!(arch.lut_mask(), 0xFFFF);
        assert_eq!(arch.lbcross_inputs(), 2);
        assert_eq!(arch.lbcross_width(), 2);
        assert_eq!(arch.group_start(MuxGroup::BlockOutLow), 0);
        assert_eq!(arch.group_start(MuxGroup::BlockOutHigh), 1);
        assert_eq!(arch.group_start(MuxGroup::Forward), 2);
        assert_eq!(arch.group_start(MuxGroup::TurnLeft), 3);
        assert_eq!(arch.group_start(MuxGroup::TurnRight), 4);
        assert_eq!(arch.rnode_codes(), 5);
        /* 5 codes + idle */
        assert_eq!(arch.rnode_width(), 3);
        /* 16 codes + idle */
        assert_eq!(arch.binput_width(), 5);
        assert_eq!(arch.binput_code(Direction::Right, 1), 13);
    }

    #[test]
    fn test_chain_geometry() {
        let arch = small_arch();
        /* 8 * 5 + 2 * 4 * 2 + 2 * 17 */
        assert_eq!(arch.block_bits(), 90);
        assert_eq!(arch.chain_depth(ChainKind::Block), 180);
        /* 2 * 2 * 5 + 3 * 2 * 4 * 3 */
        assert_eq!(arch.chain_depth(ChainKind::Vertical), 92);
        assert_eq!(arch.chain_depth(ChainKind::Horizontal), 92);
        assert_eq!(arch.max_chain_depth(), 180);
        for kind in ChainKind::ALL {
            assert_eq!(arch.chain_lanes(kind), 2);
        }
    }

    #[test]
    fn test_loader_defaults_and_overrides() {
        let arch = small_arch();
        assert_eq!(arch.loader(), &LoaderParams::default());
        assert_eq!(arch.name(), "small");

        let text = format!("{}loader:\n  config_delay_ticks: 4\n", SMALL_ARCH);
        let arch = Arch::from_yaml(&text).unwrap();
        assert_eq!(arch.loader().config_delay_ticks, 4);
        assert_eq!(arch.loader().block_cfg_addr, 0x3010_0000);
    }

    #[test]
    fn test_rejects_inconsistent_parameters() {
        let with = |extra: &str| Arch::from_yaml(&format!("{}{}", SMALL_ARCH, extra));
        assert!(matches!(with("rnode_mux_width: 2\n"), Err(BitgenError::Arch(_))));
        assert_eq!(with("rnode_mux_width: 6\n").unwrap().rnode_width(), 6);
        assert!(Arch::from_yaml(&SMALL_ARCH.replace("block_inputs: 8", "block_inputs: 6"))
            .is_err());
        assert!(Arch::from_yaml(&SMALL_ARCH.replace("fabric_size_x: 4", "fabric_size_x: 19"))
            .is_err());
        assert!(Arch::from_yaml(&SMALL_ARCH.replace("fabric_size_y: 4", "fabric_size_y: 2"))
            .is_err());
        assert!(Arch::from_yaml("fabric_size_x: 4\n").is_err());
    }
}
