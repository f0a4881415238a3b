use super::*;
use crate::arch::tests::small_arch;

const NETWORK: &str = "\
.model top
.inputs a b c d
.outputs f g h k
.names a b c d f
1-0- 1
.names a b g
11 0
.names a b h
10 1
.names vcc
1
.names gnd
.names zero
0
.names a b mixed
11 1
00 0
.names a b bad
1x 1
.end
.names a b late
11 1
";

fn lut(name: &str, map: &str) -> Result<u64> {
    LogicNetwork::new(NETWORK.to_string()).load_lut(&small_arch(), name, map)
}

#[test]
fn test_term_expansion() {
    let term = CoverTerm::parse("1-0-", 4).unwrap();
    let mut indices = term.expand();
    indices.sort();
    assert_eq!(indices, vec![1, 3, 9, 11]);

    let padded = CoverTerm::parse("1", 3).unwrap();
    assert_eq!(padded.expand().len(), 4);

    assert!(CoverTerm::parse("10101", 4).is_none());
    assert!(CoverTerm::parse("1z", 4).is_none());
}

#[test]
fn test_on_set() {
    assert_eq!(lut("f", "0 1 2 3"), Ok(0x0A0A));
}

#[test]
fn test_off_set() {
    /* Terms "11--" clear indices 3, 7, 11 and 15 */
    assert_eq!(lut("g", "0 1"), Ok(0x7777));
}

#[test]
fn test_constants() {
    assert_eq!(lut("vcc", ""), Ok(0xFFFF));
    assert_eq!(lut("gnd", ""), Ok(0));
    assert_eq!(lut("zero", ""), Ok(0));
}

#[test]
fn test_rotation() {
    assert_eq!(lut("h", "0 1"), Ok(0x2222));
    /* Swapped inputs: logical 0 drives physical 1 */
    assert_eq!(lut("h", "1 0"), Ok(0x4444));
    assert_eq!(lut("h", "1 0 open open"), Ok(0x4444));
}

#[test]
fn test_rotation_map() {
    assert_eq!(parse_rotation_map("open 0", 4), Ok(vec![1, 0, 2, 3]));
    assert_eq!(parse_rotation_map("", 4), Ok(vec![0, 1, 2, 3]));
    assert_eq!(parse_rotation_map(&identity_rotation_map(4), 4), Ok(vec![0, 1, 2, 3]));
    assert!(parse_rotation_map("0 0", 4).is_err());
    assert!(parse_rotation_map("5", 4).is_err());
    assert!(parse_rotation_map("0 1 2 3 open", 4).is_err());
    assert!(parse_rotation_map("zero", 4).is_err());
}

#[test]
fn test_malformed_covers() {
    assert!(matches!(lut("mixed", ""), Err(BitgenError::LogicNetwork(_))));
    assert!(matches!(lut("bad", ""), Err(BitgenError::LogicNetwork(_))));
}

#[test]
fn test_not_found() {
    assert!(matches!(lut("nope", ""), Err(BitgenError::LogicNetwork(_))));
    /* Anything past `.end` is not part of the network */
    assert!(lut("late", "").is_err());
}

#[test]
fn test_cover_larger_than_lut() {
    let mut text = String::from(".names a b c d big\n");
    for i in 0 .. 17 {
        text.push_str(&format!("{:04b} 1\n", i % 16));
    }
    text.push_str(".end\n");
    let network = LogicNetwork::new(text);
    assert!(network.load_lut(&small_arch(), "big", "").is_err());
}
