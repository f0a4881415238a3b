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


/* LUT extraction from the `.names` covers of a BLIF/EBLIF logic network. */

#[cfg(test)]
mod tests;

use crate::arch::Arch;
use crate::error::{BitgenError, Result};
#[allow(unused)]
use crate::log::*;

/// Value of a single input position of a cover term.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum TermBit {
    Zero,
    One,
    DontCare,
}

impl TermBit {
    fn from_char(c: char) -> Option<Self> {
        match c {
            '0' => Some(Self::Zero),
            '1' => Some(Self::One),
            '-' => Some(Self::DontCare),
            _ => None,
        }
    }
}

/// A single input pattern of a cover, indexed by LUT input position.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct CoverTerm {
    pub bits: Vec<TermBit>,
}

impl CoverTerm {
    pub fn parse(s: &str, width: usize) -> Option<Self> {
        if s.chars().count() > width {
            return None;
        }
        let mut bits = s.chars()
            .map(TermBit::from_char)
            .collect::<Option<Vec<_>>>()?;
        /* Inputs the cover does not mention may take any value */
        bits.resize(width, TermBit::DontCare);
        Some(Self { bits })
    }

    /// Moves logical input `j` to physical position `perm[j]`.
    pub fn permuted(&self, perm: &[usize]) -> Self {
        let mut bits = vec![TermBit::DontCare; self.bits.len()];
        for (logical, bit) in self.bits.iter().enumerate() {
            bits[perm[logical]] = *bit;
        }
        Self { bits }
    }

    /// Splits the term on every don't-care position. A term with k don't-cares
    /// yields exactly 2^k truth-table indices (bit `p` of an index is input `p`).
    pub fn expand(&self) -> Vec<usize> {
        let mut stack = vec![self.bits.clone()];
        let mut indices = Vec::new();
        while let Some(mut bits) = stack.pop() {
            match bits.iter().position(|b| *b == TermBit::DontCare) {
                Some(pos) => {
                    let mut one = bits.clone();
                    one[pos] = TermBit::One;
                    bits[pos] = TermBit::Zero;
                    stack.push(one);
                    stack.push(bits);
                },
                None => {
                    let index = bits.iter().enumerate()
                        .filter(|(_, b)| **b == TermBit::One)
                        .fold(0, |acc, (pos, _)| acc | (1 << pos));
                    indices.push(index);
                },
            }
        }
        indices
    }
}

/// Parses a VPR `port_rotation_map`: one entry per physical LUT input, either the
/// logical input index feeding it or `open`.
///
/// Returns the inverse mapping, logical input -> physical position. Logical inputs
/// not mentioned in the map are assigned to the remaining open physical positions in
/// ascending order, so the result is always a permutation of `0..width`.
pub fn parse_rotation_map(map: &str, width: usize) -> Result<Vec<usize>> {
    let err = |why: String| BitgenError::LogicNetwork(
        format!("Incorrect rotation map \"{}\": {}", map, why)
    );

    let entries: Vec<_> = map.split_whitespace().collect();
    if entries.len() > width {
        return Err(err(format!("more than {} entries", width)));
    }

    let mut perm: Vec<Option<usize>> = vec![None; width];
    let mut open_positions = Vec::new();
    for physical in 0 .. width {
        match entries.get(physical) {
            None | Some(&"open") => open_positions.push(physical),
            Some(entry) => {
                let logical: usize = entry.parse()
                    .map_err(|_| err(format!("bad entry \"{}\"", entry)))?;
                if logical >= width {
                    return Err(err(format!("input {} out of range", logical)));
                }
                if perm[logical].is_some() {
                    return Err(err(format!("input {} mapped twice", logical)));
                }
                perm[logical] = Some(physical);
            },
        }
    }

    let mut open_positions = open_positions.into_iter();
    let perm = perm.into_iter()
        .map(|p| p.or_else(|| open_positions.next()))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| err("not enough open positions".into()))?;

    Ok(perm)
}

pub fn identity_rotation_map(width: usize) -> String {
    (0 .. width).map(|i| i.to_string()).collect::<Vec<_>>().join(" ")
}

/// A BLIF logic network held in memory.
///
/// Every `load_lut` call scans the network from its first line, so a lookup always
/// sees the complete artifact.
pub struct LogicNetwork {
    text: String,
}

impl LogicNetwork {
    pub fn new(text: String) -> Self {
        Self { text }
    }

    /// Builds the truth table of the LUT driving `name`, with its inputs placed
    /// according to `rotation_map`.
    pub fn load_lut(&self, arch: &Arch, name: &str, rotation_map: &str) -> Result<u64> {
        let width = arch.lut_width();
        let perm = parse_rotation_map(rotation_map, width)?;
        let err = |why: String| BitgenError::LogicNetwork(format!("LUT {}: {}", name, why));

        let mut lines = self.text.lines().enumerate();
        let header = lines.by_ref().find(|(_, line)| {
            let fields: Vec<_> = line.split_whitespace().collect();
            match fields.first() {
                Some(&".end") => true,
                Some(&".names") => fields.len() >= 2 && fields.last() == Some(&name),
                _ => false,
            }
        });
        match header {
            Some((_, line)) if line.trim_start().starts_with(".names") => (),
            _ => return Err(err("not found".into())),
        }

        let mut on_set: Option<bool> = None;
        let mut term_count = 0;
        let mut bits = 0u64;
        for (line_no, line) in lines {
            let fields: Vec<_> = line.split_whitespace().collect();
            if fields.is_empty() || fields[0].starts_with('#') {
                continue;
            }
            if fields[0].starts_with('.') {
                break;
            }

            /* Constant covers: "$true" has a single "1" line */
            if fields.len() == 1 && term_count == 0 {
                match fields[0] {
                    "1" => return Ok(arch.lut_mask()),
                    "0" => return Ok(0),
                    _ => (),
                }
            }
            if fields.len() != 2 {
                return Err(err(format!(
                    ".names format error at line {}: \"{}\"", line_no + 1, line.trim()
                )));
            }

            term_count += 1;
            if term_count > arch.lut_bits() {
                return Err(err(".names larger than LUT".into()));
            }

            let polarity = match fields[1] {
                "1" => true,
                "0" => false,
                other => return Err(err(format!("unsupported output value \"{}\"", other))),
            };
            if *on_set.get_or_insert(polarity) != polarity {
                return Err(err("mixed on-set and off-set cover".into()));
            }

            let term = CoverTerm::parse(fields[0], width)
                .ok_or_else(|| err(format!("malformed term \"{}\"", fields[0])))?;
            for index in term.permuted(&perm).expand() {
                bits |= 1 << index;
            }
        }

        /* No cover lines at all: "$false" */
        let lut = match on_set {
            None => 0,
            Some(true) => bits,
            Some(false) => arch.lut_mask() & !bits,
        };

        if lut & !arch.lut_mask() != 0 {
            return Err(err(format!("incorrect LUT value {:#x}", lut)));
        }

        dbg_log!(DBG_EXTRA, "LUT {} ({}) = {:#x}", name, rotation_map, lut);
        Ok(lut)
    }
}
