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


use crate::common::Coord;
use crate::error::{BitgenError, Result};

/// Name -> coordinate lookup over a VPR placement table
/// (`name x y subblock [layer] [#block]` rows).
///
/// Every lookup rescans the table from its first row, so each query observes the
/// complete artifact exactly as written by the placer.
pub struct PlacementIndex {
    text: String,
}

impl PlacementIndex {
    pub fn new(text: String) -> Self {
        Self { text }
    }

    /// Returns the placement of the instance called `name` (subblock in `sub`), or
    /// `None` if the placer did not place it.
    pub fn coord_by_name(&self, name: &str) -> Result<Option<Coord>> {
        for (line_no, line) in self.text.lines().enumerate() {
            let fields: Vec<_> = line.split_whitespace().collect();
            if fields.len() < 2 || fields[0] != name {
                continue;
            }
            let field = |idx: usize| -> Result<usize> {
                fields.get(idx)
                    .and_then(|v| v.parse().ok())
                    .ok_or_else(|| BitgenError::Placement(format!(
                        "malformed placement row {}: \"{}\"", line_no + 1, line.trim()
                    )))
            };
            return Ok(Some(Coord::with_sub(field(1)?, field(2)?, field(3)?)));
        }
        Ok(None)
    }
}
