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


/* Access to the artifacts written by the place-and-route flow. Every artifact
 * may be stored gzip-compressed next to its plain name. */

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use flate2::read::GzDecoder;
use crate::error::{io_error, BitgenError, Result};
#[allow(unused)]
use crate::log::*;

pub struct OpenOpts {
    /// Do not look for compressed variants.
    pub raw: bool,
}

impl Default for OpenOpts {
    fn default() -> Self {
        Self {
            raw: false
        }
    }
}

fn gz_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".gz");
    PathBuf::from(name)
}

fn is_gz(path: &Path) -> bool {
    path.extension().map(|ext| ext == "gz").unwrap_or(false)
}

/// Reads a whole text artifact. `<path>.gz` is used when `path` itself is absent.
pub fn read_artifact<P>(path: P, opts: &OpenOpts) -> Result<String> where P: AsRef<Path> {
    let path = path.as_ref();
    let path = if path.exists() || opts.raw {
        path.to_path_buf()
    } else {
        let gz = gz_path(path);
        if !gz.exists() {
            return Err(BitgenError::Io(format!("{}: no such file (nor {})",
                path.display(), gz.display()
            )));
        }
        gz
    };

    dbg_log!(DBG_INFO, "Reading {}", path.display());

    let file = File::open(&path).map_err(|e| io_error(&path, e))?;
    let mut text = String::new();
    let read = if is_gz(&path) {
        BufReader::new(GzDecoder::new(file)).read_to_string(&mut text)
    } else {
        BufReader::new(file).read_to_string(&mut text)
    };
    read.map_err(|e| io_error(&path, e))?;

    Ok(text)
}

/// The four artifacts of a placed and routed design sharing a base name.
pub struct Artifacts {
    pub netlist: String,
    pub placement: String,
    pub logic: String,
    pub route: String,
}

impl Artifacts {
    pub fn path(base: &str, ext: &str) -> PathBuf {
        PathBuf::from(format!("{}.{}", base, ext))
    }

    /// Whether `path` is present, either plain or compressed.
    pub fn exists(path: &Path, opts: &OpenOpts) -> bool {
        path.exists() || (!opts.raw && gz_path(path).exists())
    }

    pub fn open(base: &str, opts: &OpenOpts) -> Result<Self> {
        /* Synthesis writes extended BLIF, plain BLIF is read only when no extended
         * BLIF exists at all */
        let eblif = Self::path(base, "eblif");
        let logic = match Self::exists(&eblif, opts) {
            true => read_artifact(eblif, opts)?,
            false => read_artifact(Self::path(base, "blif"), opts)?,
        };

        Ok(Self {
            netlist: read_artifact(Self::path(base, "net"), opts)?,
            placement: read_artifact(Self::path(base, "place"), opts)?,
            logic,
            route: read_artifact(Self::path(base, "route"), opts)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use flate2::Compression;
    use flate2::write::GzEncoder;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("sfbitgen-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_plain_and_compressed() {
        let plain = scratch("plain.place");
        std::fs::write(&plain, "a 1 0 0\n").unwrap();
        assert_eq!(read_artifact(&plain, &OpenOpts::default()), Ok("a 1 0 0\n".to_string()));

        let packed = scratch("packed.route");
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(b"Net 0 (a)\n").unwrap();
        std::fs::write(gz_path(&packed), enc.finish().unwrap()).unwrap();
        assert_eq!(read_artifact(&packed, &OpenOpts::default()), Ok("Net 0 (a)\n".to_string()));
        assert!(matches!(
            read_artifact(&packed, &OpenOpts { raw: true }),
            Err(BitgenError::Io(_))
        ));

        std::fs::remove_file(&plain).unwrap();
        std::fs::remove_file(gz_path(&packed)).unwrap();
    }

    #[test]
    fn test_missing() {
        assert!(matches!(
            read_artifact(scratch("missing.net"), &OpenOpts::default()),
            Err(BitgenError::Io(_))
        ));
        assert_eq!(Artifacts::path("out/top", "net"), PathBuf::from("out/top.net"));
    }

    #[test]
    fn test_logic_network_fallback() {
        let base = scratch("design").display().to_string();
        let path = |ext: &str| Artifacts::path(&base, ext);
        for ext in ["net", "place", "route"] {
            std::fs::write(path(ext), ext).unwrap();
        }
        std::fs::write(path("blif"), ".model plain\n").unwrap();

        let opts = OpenOpts::default();
        assert_eq!(Artifacts::open(&base, &opts).unwrap().logic, ".model plain\n");

        /* A broken extended BLIF is reported, not replaced by the plain one */
        let eblif_gz = gz_path(&path("eblif"));
        std::fs::write(&eblif_gz, "not gzip").unwrap();
        assert!(Artifacts::exists(&path("eblif"), &opts));
        assert!(matches!(Artifacts::open(&base, &opts), Err(BitgenError::Io(_))));

        std::fs::remove_file(&eblif_gz).unwrap();
        std::fs::write(path("eblif"), ".model extended\n").unwrap();
        assert_eq!(Artifacts::open(&base, &opts).unwrap().logic, ".model extended\n");

        for ext in ["net", "place", "route", "blif", "eblif"] {
            std::fs::remove_file(path(ext)).unwrap();
        }
    }
}
