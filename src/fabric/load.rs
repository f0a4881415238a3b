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


/* Populates the fabric from the packed netlist, the placement, the logic network
 * and the routing trace. */

use crate::arch::Arch;
use crate::blif::{identity_rotation_map, LogicNetwork};
use crate::common::instance_number;
use crate::error::{BitgenError, Result};
use crate::netlist::{NetBlock, Netlist};
use crate::place::PlacementIndex;
use crate::route::RouteReader;
#[allow(unused)]
use crate::log::*;
use super::*;

const LOGIC_BLOCK_TYPE: &str = "fpga_logic_block";
const IO_BLOCK_TYPE: &str = "io";
const CELL_MODE: &str = "n1_lut4";
const CELL_TYPE: &str = "fpga_logic_cell";
const BLOCK_INPUT_PORT: &str = "fpga_logic_block.logic_i[";
const REGISTER_TYPE: &str = "fpga_register";
const LUT_MODE: &str = "fpga_lut";
const WIRE_MODE: &str = "wire";

fn netlist_error<S>(block: &NetBlock, msg: S) -> BitgenError where S: std::fmt::Display {
    BitgenError::Netlist(format!("{} ({}): {}", block.instance, block.name, msg))
}

/// Crossbar selector of input `slot` of cell `cell`. Each cell input reaches its
/// own window of `lbcross_inputs` block inputs plus the outputs of the other cells.
pub fn cell_input(
    arch: &Arch,
    cell: usize,
    slot: usize,
    pin: &str
) -> std::result::Result<CellInput, String> {
    if pin == "open" {
        return Ok(CellInput::Unconnected);
    }

    let num = instance_number(pin).ok_or_else(|| format!("Malformed connection \"{}\"", pin))?;

    if pin.contains(BLOCK_INPUT_PORT) {
        let span = arch.lbcross_inputs();
        if num < slot * span || num >= (slot + 1) * span {
            return Err(format!(
                "Wrong block input number for cell input {}, mux connection: {}", slot, pin
            ));
        }
        Ok(CellInput::Select(arch.cell_in_mux_start() + (num - slot * span) as u32))
    } else if pin.contains(CELL_TYPE) {
        if num == cell {
            return Err("Cell input taken from same cell output is not allowed".into());
        }
        if num >= arch.cells_per_block() {
            return Err(format!("No such cell: {}", pin));
        }
        Ok(CellInput::Select(arch.cell_lut_mux_start() + num as u32))
    } else {
        Err(format!("Unexpected cell input: {}", pin))
    }
}

/* A LUT in wire mode passes its only connected input through */
pub fn wire_lut(arch: &Arch, lut_block: &NetBlock) -> std::result::Result<u64, String> {
    let pins: Vec<_> = lut_block.first_input()
        .map(|port| port.pins().collect())
        .unwrap_or_default();

    let mut connected = pins.iter().enumerate().filter(|(_, pin)| **pin != "open");
    match (connected.next(), connected.next()) {
        (Some((i, pin)), None) if i >= arch.lut_width() => Err(format!(
            "Wire LUT input {} \"{}\" is beyond the {} LUT inputs", i, pin, arch.lut_width()
        )),
        (Some((i, _)), None) => Ok(1 << (1 << i)),
        (None, _) => Err("Wire LUT has no connected input".into()),
        (Some(_), Some(_)) => Err(format!(
            "Several input ports \"{}\" in wire LUT", pins.join(" ")
        )),
    }
}

impl LogicCell {
    pub fn from_netlist(
        arch: &Arch,
        index: usize,
        block: &NetBlock,
        logic: &LogicNetwork
    ) -> Result<Self> {
        let mut cell = Self::new(arch, index);
        cell.instance = block.instance.clone();

        let inputs = block.first_input()
            .ok_or_else(|| netlist_error(block, "cell has no inputs"))?;
        for (slot, pin) in inputs.pins().enumerate() {
            let input = cell.inputs.get_mut(slot)
                .ok_or_else(|| netlist_error(block, "more cell inputs than LUT inputs"))?;
            *input = cell_input(arch, index, slot, pin).map_err(|e| netlist_error(block, e))?;
        }

        cell.registered = block.first_output()
            .map(|port| port.text.contains(REGISTER_TYPE))
            .unwrap_or(false);

        /* The LUT is the first child of a cell */
        let lut_block = block.first_child()
            .ok_or_else(|| netlist_error(block, "cell has no LUT"))?;
        cell.name = lut_block.name.clone();

        cell.lut = match lut_block.mode() {
            LUT_MODE => {
                let rotation_map = lut_block.first_child()
                    .and_then(NetBlock::rotation_map)
                    .map(str::to_string)
                    .unwrap_or_else(|| identity_rotation_map(arch.lut_width()));
                logic.load_lut(arch, &cell.name, &rotation_map)?
            },
            WIRE_MODE => wire_lut(arch, lut_block).map_err(|e| netlist_error(block, e))?,
            other => return Err(netlist_error(
                block, format!("Unsupported LUT mode \"{}\"", other)
            )),
        };

        dbg_log!(
            DBG_EXTRA, "Cell {} ({}): inputs {:?}, LUT {:#x}, registered: {}",
            cell.instance, cell.name, cell.inputs, cell.lut, cell.registered
        );

        Ok(cell)
    }
}

impl LogicBlock {
    pub fn load_netlist(&mut self, arch: &Arch, block: &NetBlock, logic: &LogicNetwork)
        -> Result<()>
    {
        self.name = block.name.clone();
        self.instance = block.instance.clone();

        for cell_block in block.children.iter().filter(|c| c.mode() == CELL_MODE) {
            let index = cell_block.instance_number()?;
            let cell = LogicCell::from_netlist(arch, index, cell_block, logic)?;
            let slot = self.cells.get_mut(index)
                .ok_or_else(|| netlist_error(cell_block, "cell index out of range"))?;
            *slot = cell;
        }

        Ok(())
    }
}

impl IoBlock {
    pub fn load_netlist(&mut self, pin: usize, block: &NetBlock) -> Result<()> {
        let coord = self.coord;
        let io_pin = self.pin_mut(pin)?;
        if io_pin.mode.is_some() {
            return Err(BitgenError::Placement(format!(
                "Pad {} pin {} is taken by both {} and {}", coord, pin, io_pin.name, block.name
            )));
        }
        io_pin.mode = Some(block.mode().to_string());
        io_pin.name = block.name.clone();
        io_pin.instance = block.instance.clone();
        Ok(())
    }
}

impl<'a> Fabric<'a> {
    /// Fills logic blocks and pads with the content of every placed cluster.
    pub fn load_blocks(
        &mut self,
        netlist: &Netlist,
        placement: &PlacementIndex,
        logic: &LogicNetwork
    ) -> Result<()> {
        let arch = self.arch;

        for block in netlist.blocks() {
            let coord = placement.coord_by_name(&block.name)?
                .ok_or_else(|| BitgenError::Placement(format!(
                    "Failed to find block with name {} in placement", block.name
                )))?;

            match block.instance_type() {
                LOGIC_BLOCK_TYPE => {
                    dbg_log!(DBG_INFO, "Logic block {} at {}", block.name, coord);
                    self.logic_block_mut(&coord)
                        .map_err(|_| BitgenError::Placement(format!(
                            "Logic block {} is placed at {}, which is not a logic tile",
                            block.name, coord
                        )))?
                        .load_netlist(arch, block, logic)?;
                },
                IO_BLOCK_TYPE => {
                    dbg_log!(DBG_INFO, "IO {} at {} pin {}", block.name, coord, coord.sub);
                    self.io_block_mut(&coord)
                        .map_err(|_| BitgenError::Placement(format!(
                            "Unexpected position for IO block {}: {}", block.name, coord
                        )))?
                        .load_netlist(coord.sub, block)?;
                },
                other => return Err(netlist_error(
                    block, format!("Unsupported block type \"{}\"", other)
                )),
            }
        }

        Ok(())
    }

    /// Drains the routing trace into the fabric muxes.
    pub fn load_routes(&mut self, route: RouteReader) -> Result<usize> {
        let mut events = 0;
        for event in route {
            self.apply(&event?)?;
            events += 1;
        }
        dbg_log!(DBG_INFO, "Applied {} routing events", events);
        Ok(events)
    }

    pub fn load(
        &mut self,
        netlist: &Netlist,
        placement: &PlacementIndex,
        logic: &LogicNetwork,
        route: RouteReader
    ) -> Result<()> {
        self.load_blocks(netlist, placement, logic)?;
        self.load_routes(route)?;
        Ok(())
    }
}
