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


/* Human-readable configuration dump. Unset selectors print as -1. */

use std::io::Write;
use super::*;

fn codes_line<I>(codes: I) -> String where I: IntoIterator<Item = Option<u32>> {
    codes.into_iter()
        .map(|c| c.map(|c| c.to_string()).unwrap_or_else(|| "-1".into()))
        .collect::<Vec<_>>()
        .join(" ")
}

fn lut_hex(arch: &Arch, lut: u64) -> String {
    let digits = (arch.lut_bits() / 4).max(1);
    format!("0x{:0width$X}", lut, width = digits)
}

impl<'a> Fabric<'a> {
    fn write_logic_block<W: Write>(&self, out: &mut W, lb: &LogicBlock) -> std::io::Result<()> {
        let arch = self.arch;
        writeln!(out, "\n# Logic block {} {}:", lb.coord, lb.instance)?;
        writeln!(out, "# Block input muxes:")?;
        writeln!(out, "{}", codes_line(lb.input_codes(arch)))?;
        for cell in &lb.cells {
            writeln!(out, "# Logic cell {} {}", cell.instance, cell.name)?;
            writeln!(out, "{}", codes_line(cell.input_codes().into_iter().map(Some)))?;
        }
        writeln!(out, "# LUTs:")?;
        let luts: Vec<_> = lb.cells.iter().map(|c| lut_hex(arch, c.lut)).collect();
        writeln!(out, "{}", luts.join(" "))?;
        writeln!(out, "# Output select:")?;
        let muxes: Vec<_> = lb.cells.iter().map(|c| (c.registered as u8).to_string()).collect();
        writeln!(out, "{}", muxes.join(" "))
    }

    pub fn write_text<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        writeln!(out, "# FPGA fabric & IO")?;
        for tile in self.tiles() {
            match tile {
                Tile::Empty(coord) => {
                    writeln!(out, "\n# Empty placeholder at {}", coord)?;
                    writeln!(out, "-1")?;
                },
                Tile::Io(io) => {
                    writeln!(out, "\n# IO at {}", io.coord)?;
                    writeln!(out, "{}", codes_line(io.mux_codes(self.arch)))?;
                },
                Tile::Logic(lb) => self.write_logic_block(out, lb)?,
            }
        }

        for dir in Direction::ALL {
            writeln!(out, "# Routing {}", dir.name().to_lowercase())?;
            for node in self.grid(dir).iter() {
                writeln!(out, "\n# {} routing node at {}", node.dir, node.coord)?;
                writeln!(out, "{}", codes_line(node.tracks.iter().copied()))?;
            }
        }

        Ok(())
    }

    pub fn dump(&self) -> String {
        let mut buf = Vec::new();
        /* Writing to memory cannot fail */
        let _ = self.write_text(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }
}
