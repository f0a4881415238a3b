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


/* Register-bus contract of the configuration loader. A loader streams every word
 * of a chain into the chain's data register and pulses the chain's shift clock
 * through the strobe register. */

use serde::{Serialize, Deserialize};
use crate::arch::{Arch, ChainKind, LoaderParams};
use crate::bitstream::Bitstream;
use crate::error::{BitgenError, Result};
#[allow(unused)]
use crate::log::*;

/* Reset-control register values */
const RST_RELEASE_PADS: u32 = 0x1;
const RST_NONE: u32 = 0x0;
const RST_HOLD_FABRIC: u32 = 0x3;
const RST_LOGIC: u32 = 0x8;
const LOGIC_RESET_TICKS: u32 = 8;

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum BusOp {
    Write { addr: u32, data: u32 },
    Wait { cycles: u32 },
}

/// Configuration words of one chain, in shifting order.
#[derive(Serialize, Clone, PartialEq, Eq, Debug)]
pub struct ChainWords {
    pub kind: ChainKind,
    pub words: Vec<u16>,
}

pub fn chain_words(bits: &Bitstream) -> Vec<ChainWords> {
    bits.chains().iter()
        .map(|chain| ChainWords { kind: chain.kind, words: chain.words() })
        .collect()
}

pub fn data_addr(loader: &LoaderParams, kind: ChainKind) -> u32 {
    match kind {
        ChainKind::Block => loader.block_cfg_addr,
        ChainKind::Vertical => loader.vrnode_cfg_addr,
        ChainKind::Horizontal => loader.hrnode_cfg_addr,
    }
}

pub fn load_chain(loader: &LoaderParams, chain: &ChainWords) -> Vec<BusOp> {
    let wait = BusOp::Wait { cycles: loader.config_delay_ticks };
    let addr = data_addr(loader, chain.kind);
    chain.words.iter()
        .flat_map(|word| [
            BusOp::Write { addr, data: *word as u32 },
            wait,
            BusOp::Write { addr: loader.clk_cfg_addr, data: chain.kind.strobe() },
            wait,
            BusOp::Write { addr: loader.clk_cfg_addr, data: 0 },
            wait,
        ])
        .collect()
}

/// Holds the whole fabric in reset while it is being configured.
pub fn fabric_reset(loader: &LoaderParams) -> Vec<BusOp> {
    vec![BusOp::Write { addr: loader.rst_cfg_addr, data: RST_HOLD_FABRIC }]
}

/// Releases the pads, then the global reset.
pub fn fabric_set(loader: &LoaderParams) -> Vec<BusOp> {
    vec![
        BusOp::Write { addr: loader.rst_cfg_addr, data: RST_RELEASE_PADS },
        BusOp::Write { addr: loader.rst_cfg_addr, data: RST_NONE },
    ]
}

/// Pulses the reset of the user logic.
pub fn logic_reset(loader: &LoaderParams) -> Vec<BusOp> {
    vec![
        BusOp::Write { addr: loader.rst_cfg_addr, data: RST_LOGIC },
        BusOp::Wait { cycles: LOGIC_RESET_TICKS },
        BusOp::Write { addr: loader.rst_cfg_addr, data: RST_NONE },
    ]
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct LoaderScript {
    pub design: String,
    pub ops: Vec<BusOp>,
}

impl LoaderScript {
    /// Full configuration sequence: reset, load every chain, start the fabric.
    pub fn new(arch: &Arch, design: &str, chains: &[ChainWords]) -> Self {
        let loader = arch.loader();
        let mut ops = fabric_reset(loader);
        for chain in chains {
            ops.extend(load_chain(loader, chain));
        }
        ops.extend(fabric_set(loader));
        ops.extend(logic_reset(loader));

        dbg_log!(DBG_INFO, "Loader script for {}: {} bus operations", design, ops.len());
        Self { design: design.to_string(), ops }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| BitgenError::Export(format!("loader script: {}", e)))
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| BitgenError::Export(format!("loader script: {}", e)))
    }
}

/// Recovers the per-chain words from a `.bit` file. Row `i` of a chain is loaded
/// only while `i` is below the chain depth.
pub fn read_bit_file(arch: &Arch, text: &str) -> Result<Vec<ChainWords>> {
    let mut chains: Vec<_> = ChainKind::ALL.iter()
        .map(|kind| ChainWords { kind: *kind, words: Vec::new() })
        .collect();

    let rows = text.lines().count();
    if rows > arch.max_chain_depth() {
        return Err(BitgenError::Bitstream(format!(
            "Bitstream has {} rows, the deepest chain holds {}", rows, arch.max_chain_depth()
        )));
    }

    for (i, line) in text.lines().enumerate() {
        let groups: Vec<_> = line.split(' ').collect();
        for (idx, chain) in chains.iter_mut().enumerate() {
            if i >= arch.chain_depth(chain.kind) {
                continue;
            }
            let row = groups.get(idx).copied().unwrap_or_default();
            let reversed: String = row.chars().rev().collect();
            let word = u16::from_str_radix(&reversed, 2).map_err(|_| BitgenError::Bitstream(
                format!("Malformed {:?} row {} in bitstream: \"{}\"", chain.kind, i + 1, row)
            ))?;
            chain.words.push(word);
        }
    }

    for chain in &chains {
        let depth = arch.chain_depth(chain.kind);
        if chain.words.len() != depth {
            return Err(BitgenError::Bitstream(format!(
                "{:?} chain has {} rows, expected {}", chain.kind, chain.words.len(), depth
            )));
        }
    }

    Ok(chains)
}

/// Packs every bit of a `.bit` image, row by row, into efuse bytes. Bit `j` of a
/// byte is the `j`-th bit of its group of eight; the last byte is padded with
/// zeros.
pub fn efuse_image(text: &str) -> Result<Vec<u8>> {
    let bits: Vec<u8> = text.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c {
            '0' => Ok(0),
            '1' => Ok(1),
            other => Err(BitgenError::Bitstream(format!(
                "Unexpected character '{}' in bitstream", other
            ))),
        })
        .collect::<Result<_>>()?;

    let image: Vec<u8> = bits.chunks(8)
        .map(|chunk| chunk.iter()
            .enumerate()
            .fold(0, |byte, (j, bit)| byte | (bit << j)))
        .collect();

    dbg_log!(DBG_INFO, "Efuse image: {} bits in {} bytes", bits.len(), image.len());
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::tests::small_arch;
    use crate::fabric::Fabric;

    #[test]
    fn test_reset_sequences() {
        let loader = LoaderParams::default();
        assert_eq!(fabric_reset(&loader), vec![BusOp::Write { addr: 0x30A0_0000, data: 3 }]);
        assert_eq!(fabric_set(&loader), vec![
            BusOp::Write { addr: 0x30A0_0000, data: 1 },
            BusOp::Write { addr: 0x30A0_0000, data: 0 },
        ]);
        assert_eq!(logic_reset(&loader)[1], BusOp::Wait { cycles: 8 });
    }

    #[test]
    fn test_load_chain() {
        let loader = LoaderParams::default();
        let chain = ChainWords { kind: ChainKind::Horizontal, words: vec![3, 1] };
        let ops = load_chain(&loader, &chain);
        assert_eq!(ops.len(), 12);
        assert_eq!(ops[0], BusOp::Write { addr: 0x3030_0000, data: 3 });
        assert_eq!(ops[1], BusOp::Wait { cycles: 1 });
        assert_eq!(ops[2], BusOp::Write { addr: 0x30E0_0000, data: 4 });
        assert_eq!(ops[4], BusOp::Write { addr: 0x30E0_0000, data: 0 });
        assert_eq!(ops[6], BusOp::Write { addr: 0x3030_0000, data: 1 });
    }

    #[test]
    fn test_bit_file_round_trip() {
        let arch = small_arch();
        let bits = Bitstream::from_fabric(&Fabric::new(&arch)).unwrap();
        let mut out = Vec::new();
        bits.write_bit(&mut out).unwrap();

        let chains = read_bit_file(&arch, &String::from_utf8(out).unwrap()).unwrap();
        assert_eq!(chains, chain_words(&bits));
        assert_eq!(chains[1].words.len(), 92);

        assert!(read_bit_file(&arch, "11 11 11\n").is_err());
        assert!(read_bit_file(&arch, "1x 11 11\n").is_err());
    }

    #[test]
    fn test_script() {
        let arch = small_arch();
        let chains = vec![
            ChainWords { kind: ChainKind::Block, words: vec![1, 2] },
            ChainWords { kind: ChainKind::Vertical, words: vec![3] },
        ];
        let script = LoaderScript::new(&arch, "top", &chains);
        assert_eq!(script.ops.len(), 1 + 18 + 2 + 3);
        assert_eq!(script.ops[0], BusOp::Write { addr: 0x30A0_0000, data: 3 });
        assert_eq!(script.ops[13], BusOp::Write { addr: 0x3020_0000, data: 3 });

        let json = script.to_json().unwrap();
        assert!(json.contains("\"op\": \"write\""));
        let back: LoaderScript = serde_json::from_str(&json).unwrap();
        assert_eq!(back, script);

        let yaml = script.to_yaml().unwrap();
        assert!(yaml.contains("op: wait"));
    }

    #[test]
    fn test_bit_file_too_long() {
        let arch = small_arch();
        let text = "00 00 00\n".repeat(arch.max_chain_depth() + 1);
        assert!(matches!(read_bit_file(&arch, &text), Err(BitgenError::Bitstream(_))));
    }

    #[test]
    fn test_efuse_image() {
        /* 10 bits: one full byte, LSB first, then a zero-padded one */
        assert_eq!(efuse_image("10 00 00\n1 1\n11\n"), Ok(vec![0xC1, 0x03]));
        assert_eq!(efuse_image(""), Ok(vec![]));
        assert!(efuse_image("10 2\n").is_err());

        let arch = small_arch();
        let bits = Bitstream::from_fabric(&Fabric::new(&arch)).unwrap();
        let mut out = Vec::new();
        bits.write_bit(&mut out).unwrap();
        let image = efuse_image(&String::from_utf8(out).unwrap()).unwrap();
        let total: usize = ChainKind::ALL.iter()
            .map(|kind| arch.chain_depth(*kind) * arch.chain_lanes(*kind))
            .sum();
        assert_eq!(image.len(), (total + 7) / 8);
    }
}
