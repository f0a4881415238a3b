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


/* Packed netlist (`.net`) produced by VPR: a tree of `<block>` elements, each with
 * `<inputs>`, `<outputs>` and `<clocks>` port lists. */

use crate::common::{instance_number, instance_type};
use crate::error::{BitgenError, Result};
#[allow(unused)]
use crate::log::*;

/// Port of a block with its connection list, one whitespace-separated entry per pin.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Port {
    pub name: String,
    pub text: String,
}

impl Port {
    pub fn pins(&self) -> impl Iterator<Item = &str> {
        self.text.split_whitespace()
    }
}

#[derive(Clone, Debug, Default)]
pub struct NetBlock {
    pub name: String,
    pub instance: String,
    pub mode: Option<String>,
    pub inputs: Vec<Port>,
    pub outputs: Vec<Port>,
    pub clocks: Vec<Port>,
    /// `port_rotation_map` entries of the input list, keyed by port name.
    pub rotation_maps: Vec<Port>,
    pub children: Vec<NetBlock>,
}

fn ports(node: roxmltree::Node, tag: &str) -> Vec<Port> {
    node.children()
        .filter(|n| n.has_tag_name(tag))
        .map(|n| Port {
            name: n.attribute("name").unwrap_or_default().to_string(),
            text: n.text().unwrap_or_default().trim().to_string(),
        })
        .collect()
}

impl NetBlock {
    fn from_node(node: roxmltree::Node) -> Result<Self> {
        let attr = |name: &str| node.attribute(name).ok_or_else(|| BitgenError::Netlist(
            format!("Block at byte {} has no \"{}\" attribute", node.range().start, name)
        ));

        let mut block = Self {
            name: attr("name")?.to_string(),
            instance: attr("instance")?.to_string(),
            mode: node.attribute("mode").map(str::to_string),
            ..Default::default()
        };

        for child in node.children().filter(|n| n.is_element()) {
            match child.tag_name().name() {
                "inputs" => {
                    block.inputs = ports(child, "port");
                    block.rotation_maps = ports(child, "port_rotation_map");
                },
                "outputs" => block.outputs = ports(child, "port"),
                "clocks" => block.clocks = ports(child, "port"),
                "block" => block.children.push(Self::from_node(child)?),
                _ => (),
            }
        }

        Ok(block)
    }

    /// Unused slots of the packing are written out as blocks named `open`.
    pub fn is_open(&self) -> bool {
        self.name == "open"
    }

    pub fn instance_type(&self) -> &str {
        instance_type(&self.instance)
    }

    pub fn instance_number(&self) -> Result<usize> {
        instance_number(&self.instance).ok_or_else(|| BitgenError::Netlist(
            format!("Malformed instance \"{}\" of block {}", self.instance, self.name)
        ))
    }

    pub fn mode(&self) -> &str {
        self.mode.as_deref().unwrap_or_default()
    }

    pub fn first_input(&self) -> Option<&Port> {
        self.inputs.first()
    }

    pub fn first_output(&self) -> Option<&Port> {
        self.outputs.first()
    }

    pub fn rotation_map(&self) -> Option<&str> {
        self.rotation_maps.first().map(|p| p.text.as_str())
    }

    pub fn first_child(&self) -> Option<&NetBlock> {
        self.children.first()
    }
}

/// The whole packed netlist. The root element stands for the complete design;
/// its children are the clusters placed on the fabric.
#[derive(Clone, Debug)]
pub struct Netlist {
    pub root: NetBlock,
}

impl Netlist {
    pub fn parse(text: &str) -> Result<Self> {
        let doc = roxmltree::Document::parse(text)
            .map_err(|e| BitgenError::Netlist(format!("Malformed netlist: {}", e)))?;
        let root = doc.root_element();
        if !root.has_tag_name("block") {
            return Err(BitgenError::Netlist(format!(
                "Unexpected root element <{}>", root.tag_name().name()
            )));
        }

        let root = NetBlock::from_node(root)?;
        dbg_log!(DBG_INFO, "Netlist {}: {} top-level blocks", root.name, root.children.len());

        Ok(Self { root })
    }

    pub fn blocks(&self) -> &[NetBlock] {
        &self.root.children
    }
}
