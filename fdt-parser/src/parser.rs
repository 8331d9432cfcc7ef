//! Binary parser for the flattened device tree container.
//!
//! The blob is a fixed big-endian header, a structure block (a token
//! stream describing the node hierarchy) and a strings block holding
//! property names. The parser builds the node arena in a single pass
//! over the structure block, then indexes phandles in a second pass so
//! forward references resolve.

use std::collections::BTreeMap;

use nom::{
    number::complete::be_u32,
    sequence::{pair, tuple},
};
use tracing::warn;

use crate::error::DtbError;
use crate::tree::{Fdt, NodeId, Property, RawNode};

type Input<'a> = &'a [u8];
type NomError<'a> = nom::error::Error<Input<'a>>;

const FDT_MAGIC: u32 = 0xd00d_feed;
const HEADER_LEN: usize = 40;

const FDT_BEGIN_NODE: u32 = 0x0000_0001;
const FDT_END_NODE: u32 = 0x0000_0002;
const FDT_PROP: u32 = 0x0000_0003;
const FDT_NOP: u32 = 0x0000_0004;
const FDT_END: u32 = 0x0000_0009;

/// The fixed blob header. All fields big-endian u32.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Header {
    pub(crate) totalsize: u32,
    pub(crate) off_dt_struct: u32,
    pub(crate) off_dt_strings: u32,
    pub(crate) off_mem_rsvmap: u32,
    pub(crate) version: u32,
    pub(crate) last_comp_version: u32,
    pub(crate) boot_cpuid_phys: u32,
    pub(crate) size_dt_strings: u32,
    pub(crate) size_dt_struct: u32,
}

fn malformed(offset: usize, what: &'static str) -> DtbError {
    DtbError::Malformed { offset, what }
}

/// Parse and validate the header against the actual buffer size.
fn header(data: Input) -> Result<Header, DtbError> {
    if data.len() < HEADER_LEN {
        return Err(malformed(data.len(), "truncated header"));
    }

    let (_, (magic, totalsize, off_dt_struct, off_dt_strings, off_mem_rsvmap)) =
        tuple::<_, _, NomError, _>((be_u32, be_u32, be_u32, be_u32, be_u32))(data)
            .map_err(|_| malformed(0, "truncated header"))?;
    let (_, (version, last_comp_version, boot_cpuid_phys, size_dt_strings, size_dt_struct)) =
        tuple::<_, _, NomError, _>((be_u32, be_u32, be_u32, be_u32, be_u32))(&data[20..])
            .map_err(|_| malformed(20, "truncated header"))?;

    if magic != FDT_MAGIC {
        return Err(malformed(0, "bad magic"));
    }
    if version < last_comp_version {
        return Err(malformed(16, "version older than last compatible version"));
    }

    let header = Header {
        totalsize,
        off_dt_struct,
        off_dt_strings,
        off_mem_rsvmap,
        version,
        last_comp_version,
        boot_cpuid_phys,
        size_dt_strings,
        size_dt_struct,
    };

    if header.totalsize as usize > data.len() || (header.totalsize as usize) < HEADER_LEN {
        return Err(malformed(4, "declared total size inconsistent with buffer"));
    }
    let block_in_bounds = |off: u32, size: u32| {
        (off as usize) >= HEADER_LEN && (off as u64 + size as u64) <= header.totalsize as u64
    };
    if !block_in_bounds(header.off_dt_struct, header.size_dt_struct) {
        return Err(malformed(8, "structure block out of bounds"));
    }
    if !block_in_bounds(header.off_dt_strings, header.size_dt_strings) {
        return Err(malformed(12, "strings block out of bounds"));
    }

    Ok(header)
}

/// Resolve a property name offset against the strings block.
///
/// The referenced string must be null-terminated within the block.
/// `at` is the blob offset of the referencing property, cited on failure.
fn string_at<'a>(strings: Input<'a>, nameoff: u32, at: usize) -> Result<&'a str, DtbError> {
    let tail = strings
        .get(nameoff as usize..)
        .ok_or_else(|| malformed(at, "property name offset beyond strings block"))?;
    let end = tail
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| malformed(at, "property name not terminated in strings block"))?;
    std::str::from_utf8(&tail[..end]).map_err(|_| malformed(at, "property name not UTF-8"))
}

/// Skip the padding that re-aligns the structure stream to 4 bytes.
fn align4<'a>(block: Input<'a>, rest: Input<'a>) -> Input<'a> {
    let pos = block.len() - rest.len();
    let pad = (4 - pos % 4) % 4;
    rest.get(pad..).unwrap_or(&[])
}

/// Parse the structure block token stream into the node arena.
///
/// An explicit stack tracks the currently-open node: begin-node pushes a
/// child of the stack top, end-node pops, property attaches to the top.
pub(crate) fn parse(data: Input) -> Result<Fdt, DtbError> {
    let header = header(data)?;

    let struct_off = header.off_dt_struct as usize;
    let block = &data[struct_off..struct_off + header.size_dt_struct as usize];
    let strings = &data[header.off_dt_strings as usize..][..header.size_dt_strings as usize];

    let mut nodes: Vec<RawNode> = Vec::new();
    let mut stack: Vec<NodeId> = Vec::new();
    let mut rest = block;
    let mut seen_root = false;

    loop {
        // Blob offset of the token about to be read, for diagnostics.
        let at = struct_off + (block.len() - rest.len());

        let (r, token) =
            be_u32::<_, NomError>(rest).map_err(|_| malformed(at, "truncated token stream"))?;
        rest = r;

        match token {
            FDT_BEGIN_NODE => {
                let end = rest
                    .iter()
                    .position(|&b| b == 0)
                    .ok_or_else(|| malformed(at, "unterminated node name"))?;
                let name = std::str::from_utf8(&rest[..end])
                    .map_err(|_| malformed(at, "node name not UTF-8"))?;
                rest = align4(block, &rest[end + 1..]);

                if stack.is_empty() && seen_root {
                    return Err(malformed(at, "multiple root nodes"));
                }
                seen_root = true;

                let id = NodeId(nodes.len());
                let parent = stack.last().copied();
                nodes.push(RawNode {
                    name,
                    parent,
                    children: Vec::new(),
                    props: Vec::new(),
                });
                if let Some(parent) = parent {
                    nodes[parent.0].children.push(id);
                }
                stack.push(id);
            }
            FDT_PROP => {
                let (r, (len, nameoff)) = pair(be_u32::<_, NomError>, be_u32)(rest)
                    .map_err(|_| malformed(at, "truncated property header"))?;
                if r.len() < len as usize {
                    return Err(malformed(at, "property data exceeds structure block"));
                }
                let (value, r) = r.split_at(len as usize);
                rest = align4(block, r);

                let name = string_at(strings, nameoff, at)?;
                let current = stack
                    .last()
                    .ok_or_else(|| malformed(at, "property outside of any node"))?;
                nodes[current.0].props.push(Property { name, value });
            }
            FDT_END_NODE => {
                if stack.pop().is_none() {
                    return Err(malformed(at, "unbalanced end-node token"));
                }
            }
            FDT_NOP => {}
            FDT_END => {
                if !stack.is_empty() {
                    return Err(malformed(at, "end token inside an open node"));
                }
                break;
            }
            _ => return Err(malformed(at, "unknown structure token")),
        }
    }

    if nodes.is_empty() {
        return Err(malformed(struct_off, "structure block contains no nodes"));
    }

    let phandles = index_phandles(&nodes);
    Ok(Fdt { nodes, phandles })
}

/// Second pass: index every node by its declared phandle token.
fn index_phandles(nodes: &[RawNode]) -> BTreeMap<u32, NodeId> {
    let mut index = BTreeMap::new();
    for (i, node) in nodes.iter().enumerate() {
        for prop in &node.props {
            if prop.name != "phandle" && prop.name != "linux,phandle" {
                continue;
            }
            match prop.as_u32() {
                Ok(token) => {
                    // First declaration wins.
                    if index.contains_key(&token) && index[&token] != NodeId(i) {
                        warn!(token, node = node.name, "duplicate phandle ignored");
                    } else {
                        index.insert(token, NodeId(i));
                    }
                }
                Err(_) => warn!(node = node.name, "phandle property is not a single cell"),
            }
        }
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::BlobBuilder;

    fn minimal_blob() -> Vec<u8> {
        BlobBuilder::new()
            .begin_node("")
            .prop_str("model", "acme,coyote")
            .begin_node("cpus")
            .prop_u32("#address-cells", 1)
            .end_node()
            .end_node()
            .build()
    }

    #[test]
    fn parse_minimal_blob() {
        let blob = minimal_blob();
        let fdt = Fdt::parse(&blob).unwrap();

        assert_eq!(fdt.name(fdt.root()), "");
        assert_eq!(
            fdt.prop(fdt.root(), "model").unwrap().as_str().unwrap(),
            "acme,coyote"
        );

        let cpus = fdt.subnode(fdt.root(), "cpus").unwrap();
        assert_eq!(fdt.prop(cpus, "#address-cells").unwrap().as_u32(), Ok(1));
    }

    #[test]
    fn property_order_is_preserved() {
        let blob = BlobBuilder::new()
            .begin_node("")
            .prop_str("zzz", "1")
            .prop_str("aaa", "2")
            .prop_str("mmm", "3")
            .end_node()
            .build();

        let fdt = Fdt::parse(&blob).unwrap();
        let names: Vec<_> = fdt.properties(fdt.root()).iter().map(|p| p.name).collect();
        assert_eq!(names, ["zzz", "aaa", "mmm"]);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut blob = minimal_blob();
        blob[0] = 0xde;
        assert_eq!(
            Fdt::parse(&blob),
            Err(DtbError::Malformed {
                offset: 0,
                what: "bad magic"
            })
        );
    }

    #[test]
    fn rejects_truncated_buffers() {
        let blob = minimal_blob();
        for cut in [0, 4, HEADER_LEN - 1, HEADER_LEN + 3, blob.len() - 4] {
            assert!(Fdt::parse(&blob[..cut]).is_err(), "cut at {cut}");
        }
    }

    #[test]
    fn rejects_out_of_bounds_struct_offset() {
        let mut blob = minimal_blob();
        // off_dt_struct lives at offset 8
        blob[8..12].copy_from_slice(&0xffff_0000u32.to_be_bytes());
        assert_eq!(
            Fdt::parse(&blob),
            Err(DtbError::Malformed {
                offset: 8,
                what: "structure block out of bounds"
            })
        );
    }

    #[test]
    fn rejects_unterminated_property_name() {
        // A name offset pointing past the strings block leaves no room
        // for a terminator.
        let blob = BlobBuilder::new()
            .begin_node("")
            .prop_str("ok", "x")
            .end_node()
            .with_corrupt_last_nameoff()
            .build();
        match Fdt::parse(&blob) {
            Err(DtbError::Malformed { what, .. }) => {
                assert!(what.contains("strings block"), "{what}");
            }
            other => panic!("expected malformed error, got {other:?}"),
        }
    }

    #[test]
    fn nop_tokens_are_skipped() {
        let blob = BlobBuilder::new()
            .begin_node("")
            .nop()
            .prop_u32("cell", 5)
            .nop()
            .end_node()
            .build();
        let fdt = Fdt::parse(&blob).unwrap();
        assert_eq!(fdt.prop(fdt.root(), "cell").unwrap().as_u32(), Ok(5));
    }

    #[test]
    fn error_offset_points_into_structure_block() {
        // Drop the end token: the stream runs out mid-structure.
        let blob = BlobBuilder::new()
            .begin_node("")
            .end_node()
            .without_end_token()
            .build();
        match Fdt::parse(&blob) {
            Err(DtbError::Malformed { offset, what }) => {
                assert_eq!(what, "truncated token stream");
                assert!(offset >= HEADER_LEN);
            }
            other => panic!("expected malformed error, got {other:?}"),
        }
    }
}
