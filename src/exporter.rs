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


/* Optional outputs selected by name on the command line. A name list of
 * `:all` selects everything. */

use std::path::{Path, PathBuf};
use std::fs::File;
use std::collections::{BTreeMap, HashSet};
use std::io::Write;

use serde::Serialize;
use serde_json::Value;

use crate::arch::ChainKind;
use crate::bitstream::Bitstream;
use crate::common::Direction;
use crate::error::{io_error, BitgenError, Result};
use crate::fabric::{Fabric, Tile};
use crate::loader::chain_words;
#[allow(unused)]
use crate::log::*;

pub const EXPORT_ALL: &str = ":all";

pub trait AsBytes {
    fn as_bytes<'s>(&'s self) -> &'s [u8];
}

impl AsBytes for String {
    fn as_bytes<'s>(&'s self) -> &'s [u8] {
        String::as_bytes(self)
    }
}

impl AsBytes for [u8] {
    fn as_bytes<'s>(&'s self) -> &'s [u8] {
        self
    }
}

#[derive(Default)]
pub struct ExportChecker {
    export: HashSet<String>,
    export_all: bool,
}

impl ExportChecker {
    pub fn new(arg_list: &Option<Vec<String>>) -> Self {
        let mut checker = Self::default();
        for arg in arg_list.iter().flatten() {
            if arg == EXPORT_ALL {
                checker.export_all = true;
            } else {
                checker.export.insert(arg.clone());
            }
        }
        checker
    }

    pub fn all() -> Self {
        Self { export: HashSet::new(), export_all: true }
    }

    pub fn should_export(&self, name: &str) -> bool {
        self.export_all || self.export.contains(name)
    }
}

pub trait Exporter<D> {
    /// Runs `exporter` only if `name` was selected.
    fn ignore_or_export<'s, F>(&'s mut self, name: &str, exporter: F) -> Result<()>
    where
        F: FnOnce() -> Result<D> + 's;

    fn flush(&mut self) -> Result<()>;
}

/// Writes every selected item to `<prefix><name><suffix>`.
pub struct MultiFileExporter {
    prefix: String,
    suffix: String,
    checker: ExportChecker,
}

impl MultiFileExporter {
    pub fn new(arg_list: &Option<Vec<String>>, prefix: String, suffix: String) -> Self {
        Self { prefix, suffix, checker: ExportChecker::new(arg_list) }
    }

    pub fn with_checker(checker: ExportChecker, prefix: String, suffix: String) -> Self {
        Self { prefix, suffix, checker }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        PathBuf::from(format!("{}{}{}", self.prefix, name, self.suffix))
    }
}

impl<D> Exporter<D> for MultiFileExporter where D: AsBytes {
    fn ignore_or_export<'s, F>(&'s mut self, name: &str, exporter: F) -> Result<()>
    where
        F: FnOnce() -> Result<D> + 's
    {
        if self.checker.should_export(name) {
            let data = exporter()?;
            let path = self.path(name);
            dbg_log!(DBG_INFO, "Writing {}", path.display());
            let mut file = File::create(&path).map_err(|e| io_error(&path, e))?;
            file.write_all(data.as_bytes()).map_err(|e| io_error(&path, e))?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Collects every selected item into a single JSON object written on flush.
pub struct CompoundJsonExporter<D> where D: Serialize {
    filename: PathBuf,
    data: BTreeMap<String, D>,
    checker: ExportChecker,
}

impl<D> CompoundJsonExporter<D> where D: Serialize {
    pub fn new(arg_list: &Option<Vec<String>>, filename: PathBuf) -> Self {
        Self {
            filename,
            data: BTreeMap::new(),
            checker: ExportChecker::new(arg_list),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn to_string(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.data)
            .map_err(|e| BitgenError::Export(e.to_string()))
    }
}

impl<D> Exporter<D> for CompoundJsonExporter<D> where D: Serialize {
    fn ignore_or_export<'s, F>(&'s mut self, name: &str, exporter: F) -> Result<()>
    where
        F: FnOnce() -> Result<D> + 's
    {
        if self.checker.should_export(name) {
            let data = exporter()?;
            self.data.insert(name.into(), data);
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        /* Nothing was requested */
        if self.is_empty() {
            return Ok(());
        }
        let data = self.to_string()?;
        let mut file = File::create(&self.filename)
            .map_err(|e| io_error(&self.filename, e))?;
        file.write_all(data.as_bytes()).map_err(|e| io_error(&self.filename, e))
    }
}

fn to_value<T: Serialize>(data: &T) -> Result<Value> {
    serde_json::to_value(data).map_err(|e| BitgenError::Export(e.to_string()))
}

/// Offers the `logic`, `io`, `routing` and `chains` sections of a loaded
/// fabric to a JSON exporter.
pub fn export_fabric<E>(exporter: &mut E, fabric: &Fabric, bits: &Bitstream) -> Result<()>
where
    E: Exporter<Value>
{
    exporter.ignore_or_export("logic", || {
        let blocks: Vec<_> = fabric.tiles()
            .filter_map(|tile| match tile {
                Tile::Logic(lb) => Some(lb),
                _ => None,
            })
            .collect();
        to_value(&blocks)
    })?;

    exporter.ignore_or_export("io", || {
        let blocks: Vec<_> = fabric.tiles()
            .filter_map(|tile| match tile {
                Tile::Io(io) => Some(io),
                _ => None,
            })
            .collect();
        to_value(&blocks)
    })?;

    exporter.ignore_or_export("routing", || {
        let grids: BTreeMap<_, _> = Direction::ALL.iter()
            .map(|dir| (dir.name(), fabric.grid(*dir)))
            .collect();
        to_value(&grids)
    })?;

    exporter.ignore_or_export("chains", || to_value(&chain_words(bits)))
}

/// Writes the C header of every chain to `<prefix>_<tag>_bit.h`.
pub fn export_headers(prefix: &str, bits: &Bitstream, source: &str) -> Result<()> {
    let mut exporter = MultiFileExporter::with_checker(
        ExportChecker::all(),
        format!("{}_", prefix),
        "_bit.h".into()
    );
    for kind in ChainKind::ALL {
        exporter.ignore_or_export(kind.file_tag(), || Ok(bits.header(kind, source)))?;
    }
    <MultiFileExporter as Exporter<String>>::flush(&mut exporter)
}

/// Location of the compound JSON export for a design.
pub fn json_path(prefix: &str, design: &str) -> PathBuf {
    Path::new(prefix).join(format!("{}_fabric.json", design))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::tests::small_arch;

    fn names(list: &[&str]) -> Option<Vec<String>> {
        Some(list.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_checker() {
        let none = ExportChecker::new(&None);
        assert!(!none.should_export("logic"));

        let some = ExportChecker::new(&names(&["io", "chains"]));
        assert!(some.should_export("io"));
        assert!(!some.should_export("logic"));

        let all = ExportChecker::new(&names(&["io", EXPORT_ALL]));
        assert!(all.should_export("routing"));
        assert!(ExportChecker::all().should_export("anything"));
    }

    #[test]
    fn test_compound_sections() {
        let arch = small_arch();
        let fabric = Fabric::new(&arch);
        let bits = Bitstream::from_fabric(&fabric).unwrap();

        let mut exporter = CompoundJsonExporter::<Value>::new(
            &names(&["routing", "chains"]),
            PathBuf::from("unused.json")
        );
        export_fabric(&mut exporter, &fabric, &bits).unwrap();

        let json: Value = serde_json::from_str(&exporter.to_string().unwrap()).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert!(obj["routing"].get("UP").is_some());
        assert_eq!(obj["chains"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_skipped_exporter_is_not_run() {
        let mut exporter = CompoundJsonExporter::<Value>::new(&None, PathBuf::from("unused.json"));
        exporter.ignore_or_export("logic", || Err(BitgenError::Export("ran".into()))).unwrap();
        assert!(exporter.is_empty());
        /* Empty exporters leave no file behind */
        exporter.flush().unwrap();
        assert!(!Path::new("unused.json").exists());
    }

    #[test]
    fn test_headers() {
        let arch = small_arch();
        let fabric = Fabric::new(&arch);
        let bits = Bitstream::from_fabric(&fabric).unwrap();
        let prefix = std::env::temp_dir()
            .join(format!("sfbitgen-{}-hdr", std::process::id()))
            .display()
            .to_string();

        export_headers(&prefix, &bits, "design").unwrap();
        for kind in ChainKind::ALL {
            let path = PathBuf::from(format!("{}_{}_bit.h", prefix, kind.file_tag()));
            let text = std::fs::read_to_string(&path).unwrap();
            assert!(text.starts_with("// Bitstream generated from design"));
            std::fs::remove_file(&path).unwrap();
        }
    }
}
