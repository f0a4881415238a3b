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


/* Switch-box rules of the fabric: which mux group of a routing node a driver
 * selects, and which track transitions the Wilton switch pattern supports. */

use crate::arch::{Arch, MuxGroup};
use crate::common::{Coord, Direction, ObjectKind};
use crate::error::{BitgenError, Result};

/// Group selected when a track running in `from` continues in `to`. `None` for
/// a reversal, which the switch box cannot realize.
pub fn turn_group(from: Direction, to: Direction) -> Option<MuxGroup> {
    use Direction::*;
    match (from, to) {
        _ if from == to => Some(MuxGroup::Forward),
        (Up, Right) | (Down, Left) | (Left, Up) | (Right, Down) => Some(MuxGroup::TurnRight),
        (Up, Left) | (Down, Right) | (Left, Down) | (Right, Up) => Some(MuxGroup::TurnLeft),
        _ => None,
    }
}

/// Track reached from track `src` of a node running in `from` through `group`.
/// Only defined for the channel-to-channel groups.
pub fn wilton_destination(
    from: Direction,
    group: MuxGroup,
    src: usize,
    tracks: usize
) -> Option<usize> {
    use Direction::*;
    let (s, t) = (src as i64, tracks as i64);
    let dst = match (group, from) {
        (MuxGroup::Forward, _) => s,
        (MuxGroup::TurnLeft, Up) | (MuxGroup::TurnLeft, Down) => s + 1,
        (MuxGroup::TurnRight, Up) => t - 2 - s,
        (MuxGroup::TurnRight, Down) => -s,
        (MuxGroup::TurnLeft, Right) => -s,
        (MuxGroup::TurnRight, Right) | (MuxGroup::TurnRight, Left) => s - 1,
        (MuxGroup::TurnLeft, Left) => t - 2 - s,
        (MuxGroup::BlockOutLow, _) | (MuxGroup::BlockOutHigh, _) => return None,
    };
    Some(dst.rem_euclid(t) as usize)
}

/// Mux code of a channel-to-channel connection. Fails for reversals and for track
/// pairs the switch pattern does not connect.
pub fn channel_mux(
    arch: &Arch,
    from: Direction,
    src_track: usize,
    to: Direction,
    dst_track: usize
) -> Result<u32> {
    let group = turn_group(from, to).ok_or_else(|| BitgenError::Topology(
        format!("Route reverses direction {} -> {}", from, to)
    ))?;

    let expected = wilton_destination(from, group, src_track, arch.tracks());
    if expected != Some(dst_track) {
        return Err(BitgenError::Topology(format!(
            "Unsupported switch configuration: {:?} {} track {} -> track {} (expected {:?})",
            group, from, src_track, dst_track, expected
        )));
    }

    Ok(arch.group_start(group))
}

/// Mux code of a connection from output `pin` of the block or pad at `tile` to the
/// channel segment at `chan` running in `chan_dir`.
pub fn block_output_mux(
    arch: &Arch,
    kind: ObjectKind,
    tile: &Coord,
    chan: &Coord,
    chan_dir: Direction,
    pin: usize
) -> Result<u32> {
    let side = tile.side_of_channel(chan, chan_dir.channel_kind())?;

    let offset = match kind {
        ObjectKind::Pad => {
            if pin >= arch.pins_per_pad() {
                return Err(BitgenError::Topology(format!("Wrong IO pin number {}", pin)));
            }
            0
        },
        ObjectKind::Block => {
            /* Output pins are dealt round-robin to the sides */
            let side_index = match side {
                Direction::Up => 0,
                Direction::Right => 1,
                Direction::Down => 2,
                Direction::Left => 3,
            };
            if pin >= arch.block_outputs() || pin % arch.block_sides() != side_index {
                return Err(BitgenError::Topology(format!(
                    "Wrong block pin number: {} {} {}", tile, side, pin
                )));
            }
            pin / arch.block_sides()
        },
        ObjectKind::ChanX | ObjectKind::ChanY => return Err(BitgenError::Topology(
            format!("{:?} at {} is not a block output", kind, tile)
        )),
    };

    /* Seen from the channel, a block below or to the right is the "high" one */
    let group = match side {
        Direction::Up | Direction::Left => MuxGroup::BlockOutHigh,
        Direction::Down | Direction::Right => MuxGroup::BlockOutLow,
    };

    Ok(arch.group_start(group) + offset as u32)
}
