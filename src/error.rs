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


use thiserror::Error;

/// Every inconsistency between the upstream toolchain output and the architecture
/// is fatal. Each variant names the phase it was raised in, so that the user can
/// tell whether the input artifacts or the architecture description are at fault.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BitgenError {
    #[error("File access failed: {0}")]
    Io(String),
    #[error("Architecture parameters failed: {0}")]
    Arch(String),
    #[error("Netlist processing failed: {0}")]
    Netlist(String),
    #[error("Placement lookup failed: {0}")]
    Placement(String),
    #[error("LUT extraction failed: {0}")]
    LogicNetwork(String),
    #[error("Route parsing failed: {reason} (line {line}: \"{record}\")")]
    RouteTrace {
        line: usize,
        record: String,
        reason: String,
    },
    #[error("Fabric configuration failed: {0}")]
    Topology(String),
    #[error("Bitstream generation failed: {0}")]
    Bitstream(String),
    #[error("Export failed: {0}")]
    Export(String),
}

pub type Result<T> = std::result::Result<T, BitgenError>;

impl BitgenError {
    pub fn phase(&self) -> &'static str {
        match self {
            Self::Io(_) => "File access",
            Self::Arch(_) => "Architecture parameters",
            Self::Netlist(_) => "Netlist processing",
            Self::Placement(_) => "Placement lookup",
            Self::LogicNetwork(_) => "LUT extraction",
            Self::RouteTrace { .. } => "Route parsing",
            Self::Topology(_) => "Fabric configuration",
            Self::Bitstream(_) => "Bitstream generation",
            Self::Export(_) => "Export",
        }
    }

    /// Error text without the phase prefix.
    pub fn message(&self) -> String {
        match self {
            Self::Io(msg)
            | Self::Arch(msg)
            | Self::Netlist(msg)
            | Self::Placement(msg)
            | Self::LogicNetwork(msg)
            | Self::Topology(msg)
            | Self::Bitstream(msg)
            | Self::Export(msg) => msg.clone(),
            Self::RouteTrace { line, record, reason } =>
                format!("{} (line {}: \"{}\")", reason, line, record),
        }
    }
}

/* Attaches the offending path to I/O errors */
pub fn io_error<P>(path: P, err: std::io::Error) -> BitgenError where
    P: AsRef<std::path::Path>
{
    BitgenError::Io(format!("{}: {}", path.as_ref().display(), err))
}
