use super::*;
use super::switch::*;
use crate::arch::MuxGroup;
use crate::arch::tests::small_arch;

pub const ROUTE: &str = "\
Array size: 4 x 4 logic blocks.

Routing:

Net 0 (f)

Node:\t1\tSOURCE (1,0)  Class: 1  Switch: 0
Node:\t5\t  OPIN (1,0)  Pad: 1  Switch: 0
Node:\t10\t CHANX (1,0)  Track: 0  Switch: 1
Node:\t12\t CHANX (2,0)  Track: 0  Switch: 1
Node:\t20\t  IPIN (2,1)  Pin: 0  fpga_logic_block.logic_i[0]  Switch: 2
Node:\t21\t  SINK (2,1)  Class: 0  Switch: -1
Node:\t12\t CHANX (2,0)  Track: 0  Switch: 1
Node:\t80\t CHANY (2,1)  Track: 0  Switch: 1
Node:\t81\t  IPIN (2,1)  Pin: 2  fpga_logic_block.logic_i[2]  Switch: 2
Node:\t82\t  SINK (2,1)  Class: 0  Switch: -1

Net 1 (g)

Node:\t30\tSOURCE (1,1)  Class: 2  Switch: 0
Node:\t31\t  OPIN (1,1)  Pin: 4  fpga_logic_block.logic_o[0]  Switch: 0
Node:\t41\t CHANX (1,1)  Track: 2  Switch: 1
Node:\t51\t CHANY (0,1)  Track: 3  Switch: 1
Node:\t60\t  IPIN (0,1)  Pad: 3  Switch: 2
Node:\t61\t  SINK (0,1)  Class: 3  Switch: -1
Node:\t41\t CHANX (1,1)  Track: 2  Switch: 1
Node:\t70\t  IPIN (1,1)  Pin: 1  fpga_logic_block.logic_i[1]  Switch: 2
Node:\t71\t  SINK (1,1)  Class: 0  Switch: -1
";

fn channel(x: usize, y: usize, dir: Direction, track: usize, source_mux: u32)
    -> Option<ChannelEvent>
{
    Some(ChannelEvent { coord: Coord::new(x, y), dir, track, source_mux })
}

fn read_all(text: &str) -> Result<Vec<RouteEvent>> {
    let arch = small_arch();
    RouteReader::new(&arch, text).collect()
}

fn first_error(text: &str) -> BitgenError {
    let arch = small_arch();
    let mut reader = RouteReader::new(&arch, text);
    loop {
        match reader.next_channel() {
            Ok(Some(_)) => (),
            Ok(None) => panic!("trace accepted"),
            Err(e) => return e,
        }
    }
}

#[test]
fn test_record_fields() {
    let arch = small_arch();
    let rec = Record::new(7, "Node:\t41\t CHANX (1,1)  Track: 2  Switch: 1");
    assert!(rec.is_node());
    assert!(rec.is_chan());
    assert!(!rec.is_block());
    assert_eq!(rec.kind(), Ok(ObjectKind::ChanX));
    assert_eq!(rec.channel_dir(), Ok(Direction::Left));
    assert_eq!(rec.track(&arch), Ok(1));
    assert_eq!(rec.coord(), Ok(Coord::new(1, 1)));

    let rec = Record::new(8, "Node: 80 CHANY (2,1,0) Track: 7 Switch: 1");
    assert_eq!(rec.channel_dir(), Ok(Direction::Up));
    assert_eq!(rec.track(&arch), Ok(3));
    assert_eq!(rec.coord(), Ok(Coord::new(2, 1)));

    let rec = Record::new(9, "Node: 31 OPIN (1,1) Pin: 4 fpga_memory_blck.data_o[2] Switch: 0");
    assert_eq!(rec.kind(), Ok(ObjectKind::Block));
    assert_eq!(rec.block_pin(), Ok(2));

    let rec = Record::new(10, "Node: 8 CHANX (1,1) Track: 8 Switch: 1");
    assert!(matches!(rec.track(&arch), Err(BitgenError::RouteTrace { line: 10, .. })));
}

#[test]
fn test_route_events() {
    let events = read_all(ROUTE).unwrap();
    let expected = vec![
        RouteEvent {
            channel: channel(1, 0, Direction::Right, 0, 1),
            ..Default::default()
        },
        RouteEvent {
            channel: channel(2, 0, Direction::Right, 0, 2),
            block_in: Some(BlockTerminal { coord: Coord::new(2, 1), input: 0, mux: 12 }),
            pad_in: None,
        },
        RouteEvent {
            channel: channel(2, 1, Direction::Up, 0, 3),
            block_in: Some(BlockTerminal { coord: Coord::new(2, 1), input: 2, mux: 0 }),
            pad_in: None,
        },
        RouteEvent {
            channel: channel(1, 1, Direction::Left, 1, 1),
            ..Default::default()
        },
        RouteEvent {
            channel: channel(0, 1, Direction::Down, 1, 3),
            block_in: None,
            pad_in: Some(PadTerminal { coord: Coord::with_sub(0, 1, 1), mux: 5 }),
        },
        /* Branch point feeding a block input directly */
        RouteEvent {
            channel: None,
            block_in: Some(BlockTerminal { coord: Coord::new(1, 1), input: 1, mux: 9 }),
            pad_in: None,
        },
    ];
    assert_eq!(events, expected);
}

/* Nets fanning out again from their source pin after a sink */
const FANOUT_ROUTE: &str = "\
Net 0 (h)

Node:\t30\tSOURCE (1,1)  Class: 2  Switch: 0
Node:\t31\t  OPIN (1,1)  Pin: 4  fpga_logic_block.logic_o[0]  Switch: 0
Node:\t40\t CHANX (1,1)  Track: 0  Switch: 1
Node:\t42\t CHANX (2,1)  Track: 0  Switch: 1
Node:\t50\t  IPIN (2,1)  Pin: 0  fpga_logic_block.logic_i[0]  Switch: 2
Node:\t51\t  SINK (2,1)  Class: 0  Switch: -1
Node:\t31\t  OPIN (1,1)  Pin: 4  fpga_logic_block.logic_o[0]  Switch: 0
Node:\t41\t CHANX (1,1)  Track: 3  Switch: 1

Net 1 (a)

Node:\t1\tSOURCE (1,0)  Class: 1  Switch: 0
Node:\t5\t  OPIN (1,0)  Pad: 1  Switch: 0
Node:\t10\t CHANX (1,0)  Track: 0  Switch: 1
Node:\t12\t CHANX (2,0)  Track: 0  Switch: 1
Node:\t20\t  IPIN (2,1)  Pin: 0  fpga_logic_block.logic_i[0]  Switch: 2
Node:\t21\t  SINK (2,1)  Class: 0  Switch: -1
Node:\t5\t  OPIN (1,0)  Pad: 1  Switch: 0
Node:\t11\t CHANX (1,0)  Track: 1  Switch: 1
";

#[test]
fn test_fanout_from_source_pin() {
    let arch = small_arch();
    let high = arch.group_start(MuxGroup::BlockOutHigh);
    let forward = arch.group_start(MuxGroup::Forward);
    let reached = Some(BlockTerminal { coord: Coord::new(2, 1), input: 0, mux: 12 });

    let events = read_all(FANOUT_ROUTE).unwrap();
    let expected = vec![
        RouteEvent { channel: channel(1, 1, Direction::Right, 0, high), ..Default::default() },
        RouteEvent {
            channel: channel(2, 1, Direction::Right, 0, forward),
            block_in: reached,
            pad_in: None,
        },
        /* Driven by the block output again, not by the last channel at [2,1] */
        RouteEvent { channel: channel(1, 1, Direction::Left, 1, high), ..Default::default() },
        RouteEvent { channel: channel(1, 0, Direction::Right, 0, high), ..Default::default() },
        RouteEvent {
            channel: channel(2, 0, Direction::Right, 0, forward),
            block_in: reached,
            pad_in: None,
        },
        RouteEvent { channel: channel(1, 0, Direction::Left, 0, high), ..Default::default() },
    ];
    assert_eq!(events, expected);
}

#[test]
fn test_reader_exhausted() {
    let arch = small_arch();
    let mut reader = RouteReader::new(&arch, ROUTE);
    while let Some(_) = reader.next_channel().unwrap() {}
    assert_eq!(reader.next_channel(), Ok(None));
    assert!(read_all("").unwrap().is_empty());
}

#[test]
fn test_reversal_rejected() {
    let err = first_error("\
Node: 1 SOURCE (1,0) Class: 1 Switch: 0
Node: 5 OPIN (1,0) Pad: 1 Switch: 0
Node: 10 CHANX (1,0) Track: 0 Switch: 1
Node: 11 CHANX (2,0) Track: 0 Switch: 1
");
    assert!(matches!(err, BitgenError::RouteTrace { line: 4, .. }));
}

#[test]
fn test_switch_mismatch_rejected() {
    let err = first_error("\
Node: 1 SOURCE (1,0) Class: 1 Switch: 0
Node: 5 OPIN (1,0) Pad: 1 Switch: 0
Node: 10 CHANX (1,0) Track: 0 Switch: 1
Node: 80 CHANY (1,1) Track: 2 Switch: 1
");
    assert!(matches!(err, BitgenError::RouteTrace { line: 4, .. }));
}

#[test]
fn test_block_pin_side_checked() {
    /* logic_o[1] leaves on the right side, not towards the channel above */
    let err = first_error("\
Node: 30 SOURCE (1,1) Class: 2 Switch: 0
Node: 31 OPIN (1,1) Pin: 5 fpga_logic_block.logic_o[1] Switch: 0
Node: 41 CHANX (1,1) Track: 2 Switch: 1
");
    assert!(matches!(err, BitgenError::RouteTrace { line: 3, .. }));
}

#[test]
fn test_channel_without_driver() {
    let err = first_error("Node: 10 CHANX (1,0) Track: 0 Switch: 1\n");
    assert!(matches!(err, BitgenError::RouteTrace { line: 1, .. }));
}

#[test]
fn test_iterator_stops_after_error() {
    let arch = small_arch();
    let mut reader = RouteReader::new(&arch, "Node: 10 CHANX (1,0) Track: 0 Switch: 1\n");
    assert!(matches!(reader.next(), Some(Err(_))));
    assert!(reader.next().is_none());
}

#[test]
fn test_turn_groups() {
    use Direction::*;
    assert_eq!(turn_group(Up, Up), Some(MuxGroup::Forward));
    assert_eq!(turn_group(Up, Right), Some(MuxGroup::TurnRight));
    assert_eq!(turn_group(Up, Left), Some(MuxGroup::TurnLeft));
    assert_eq!(turn_group(Down, Left), Some(MuxGroup::TurnRight));
    assert_eq!(turn_group(Left, Up), Some(MuxGroup::TurnRight));
    assert_eq!(turn_group(Right, Up), Some(MuxGroup::TurnLeft));
    assert_eq!(turn_group(Up, Down), None);
    assert_eq!(turn_group(Left, Right), None);
}

#[test]
fn test_wilton_is_a_permutation() {
    let groups = [MuxGroup::Forward, MuxGroup::TurnLeft, MuxGroup::TurnRight];
    for tracks in 1 ..= 8 {
        for dir in Direction::ALL {
            for group in groups {
                let mut hits = vec![0; tracks];
                for src in 0 .. tracks {
                    let dst = wilton_destination(dir, group, src, tracks).unwrap();
                    hits[dst] += 1;
                }
                assert!(hits.iter().all(|h| *h == 1), "{:?} {:?} T={}", dir, group, tracks);
            }
        }
    }
    assert_eq!(wilton_destination(Direction::Up, MuxGroup::BlockOutLow, 0, 4), None);
}

#[test]
fn test_wilton_values() {
    use Direction::*;
    assert_eq!(wilton_destination(Up, MuxGroup::TurnLeft, 3, 4), Some(0));
    assert_eq!(wilton_destination(Up, MuxGroup::TurnRight, 0, 4), Some(2));
    assert_eq!(wilton_destination(Down, MuxGroup::TurnRight, 1, 4), Some(3));
    assert_eq!(wilton_destination(Right, MuxGroup::TurnLeft, 1, 4), Some(3));
    assert_eq!(wilton_destination(Left, MuxGroup::TurnRight, 0, 4), Some(3));
    assert_eq!(wilton_destination(Left, MuxGroup::TurnLeft, 3, 4), Some(3));
}

#[test]
fn test_block_output_mux() {
    let arch = small_arch();
    let tile = Coord::new(1, 1);
    let mux = |kind, x, y, dir, pin| block_output_mux(&arch, kind, &tile, &Coord::new(x, y), dir, pin);
    /* Channel above: block is the lower one */
    assert_eq!(mux(ObjectKind::Block, 1, 1, Direction::Right, 0), Ok(1));
    /* Channel to the right: block is the left one */
    assert_eq!(mux(ObjectKind::Block, 1, 1, Direction::Up, 1), Ok(0));
    assert_eq!(mux(ObjectKind::Block, 1, 0, Direction::Left, 2), Ok(0));
    assert_eq!(mux(ObjectKind::Block, 0, 1, Direction::Down, 3), Ok(1));
    assert!(mux(ObjectKind::Block, 0, 1, Direction::Down, 2).is_err());
    assert!(mux(ObjectKind::Block, 1, 1, Direction::Right, 4).is_err());
    assert_eq!(mux(ObjectKind::Pad, 1, 1, Direction::Right, 1), Ok(1));
    assert!(mux(ObjectKind::Pad, 1, 1, Direction::Right, 2).is_err());
    assert!(mux(ObjectKind::Block, 2, 2, Direction::Right, 0).is_err());
}
