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


use clap::{arg, Parser};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[macro_use]
extern crate lazy_static;

#[macro_use]
pub mod log;
pub mod error;
pub mod common;
pub mod arch;
pub mod place;
pub mod netlist;
pub mod blif;
pub mod route;
pub mod fabric;
pub mod bitstream;
pub mod loader;
pub mod artifact;
pub mod exporter;

use crate::arch::Arch;
use crate::artifact::{read_artifact, Artifacts, OpenOpts};
use crate::bitstream::Bitstream;
use crate::blif::LogicNetwork;
use crate::error::{io_error, Result};
use crate::exporter::*;
use crate::fabric::Fabric;
use crate::loader::{efuse_image, read_bit_file, LoaderScript};
use crate::netlist::Netlist;
use crate::place::PlacementIndex;
use crate::route::RouteReader;
#[allow(unused)]
use crate::log::*;

#[derive(Parser, Debug)]
#[clap(
    author = "Antmicro",
    version = "0.0.1",
    about = "SFBITGEN - Soft-FPGA bitstream generator for VPR-implemented designs",
    long_about = None
)]
struct Args {
    #[clap(help = "Architecture description (YAML)")]
    arch: String,
    #[clap(help = "Base name of the .net/.place/.eblif/.route artifacts")]
    base: String,
    #[clap(help = "Fabric configuration dump file")]
    output: String,
    #[clap(long, help = "Do not look for gzip-compressed artifacts")]
    raw: bool,
    #[arg(
        long,
        help = "Fabric sections to be exported to JSON (logic, io, routing, chains or :all)"
    )]
    json: Option<Vec<String>>,
    #[arg(long, default_value = "", help = "Directory for saving .json files")]
    json_prefix: String,
    #[arg(long, help = "Write a loader bus script (JSON if the name ends in .json, YAML otherwise)")]
    loader_script: Option<String>,
    #[arg(long, help = "Write the bitstream packed into efuse bytes")]
    efuse: Option<String>,
}

fn write_file<F>(path: &str, writer: F) -> Result<()> where
    F: FnOnce(&mut BufWriter<File>) -> std::io::Result<()>
{
    let mut out = File::create(path)
        .map(BufWriter::new)
        .map_err(|e| io_error(path, e))?;
    writer(&mut out)
        .and_then(|_| out.flush())
        .map_err(|e| io_error(path, e))
}

fn run(args: Args) -> Result<()> {
    let arch = Arch::load(&args.arch)?;
    dbg_log!(DBG_INFO, "Architecture {}: {}x{} tiles", arch.name(), arch.size_x(), arch.size_y());

    let artifacts = Artifacts::open(&args.base, &OpenOpts { raw: args.raw })?;
    let netlist = Netlist::parse(&artifacts.netlist)?;
    let placement = PlacementIndex::new(artifacts.placement);
    let logic = LogicNetwork::new(artifacts.logic);

    let mut fabric = Fabric::new(&arch);

    println!("Processing logic blocks...");
    fabric.load_blocks(&netlist, &placement, &logic)?;

    println!("Processing nets...");
    fabric.load_routes(RouteReader::new(&arch, &artifacts.route))?;

    println!("Writing config to output files...");
    write_file(&args.output, |out| fabric.write_text(out))?;

    let bits = Bitstream::from_fabric(&fabric)?;
    let bit_path = format!("{}.bit", args.output);
    write_file(&bit_path, |out| bits.write_bit(out))?;
    export_headers(&args.output, &bits, &args.base)?;

    let design = Path::new(&args.base)
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| args.base.clone());

    let mut json_exporter = CompoundJsonExporter::new(
        &args.json,
        json_path(&args.json_prefix, &design)
    );
    export_fabric(&mut json_exporter, &fabric, &bits)?;
    json_exporter.flush()?;

    /* Loaders consume the .bit file as written */
    if args.loader_script.is_some() || args.efuse.is_some() {
        let bit_text = read_artifact(&bit_path, &OpenOpts { raw: true })?;

        if let Some(script_path) = &args.loader_script {
            let chains = read_bit_file(&arch, &bit_text)?;
            let script = LoaderScript::new(&arch, &design, &chains);
            let text = match script_path.ends_with(".json") {
                true => script.to_json()?,
                false => script.to_yaml()?,
            };
            write_file(script_path, |out| out.write_all(text.as_bytes()))?;
        }

        if let Some(efuse_path) = &args.efuse {
            let image = efuse_image(&bit_text)?;
            write_file(efuse_path, |out| out.write_all(&image))?;
        }
    }

    let summary = fabric.summary();
    println!(concat!(
        "Design {}:\n",
        "    Used logic blocks:      {}\n",
        "    Used logic cells:       {}\n",
        "    Used IO pins:           {}\n",
        "    Used routing tracks:    {}"
        ),
        design,
        summary.logic_blocks,
        summary.logic_cells,
        summary.io_pins,
        summary.routing_tracks
    );

    println!("Bitgen completed!");
    Ok(())
}

fn main() {
    let args = Args::parse();

    if let Err(err) = run(args) {
        eprintln!("{}", err);
        std::process::exit(1);
    }
}
