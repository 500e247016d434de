//! Framed binary codec.
//!
//! Every buffer starts with a six byte header: a four byte magic (`TGRF` for
//! graphs, `TGRS` for results) followed by the little-endian `u16` format
//! version. The rest of the buffer is the bincode payload.

use crate::error::{Result, WireError};
use crate::graph::FlatGraph;
use crate::result::FlatResult;
use crate::serializer::{BincodeSerializer, SerializerProtocol};

/// Magic prefix of a serialized graph.
pub const GRAPH_MAGIC: [u8; 4] = *b"TGRF";

/// Magic prefix of a serialized result.
pub const RESULT_MAGIC: [u8; 4] = *b"TGRS";

/// Current format version.
pub const FORMAT_VERSION: u16 = 1;

/// Magic plus version.
pub const HEADER_LEN: usize = 6;

fn frame(magic: [u8; 4], payload: Vec<u8>) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(&magic);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&payload);
    out
}

fn unframe(magic: [u8; 4], buffer: &[u8]) -> Result<&[u8]> {
    if buffer.len() < HEADER_LEN {
        return Err(WireError::Truncated {
            len: buffer.len(),
            needed: HEADER_LEN,
        });
    }

    let mut found = [0u8; 4];
    found.copy_from_slice(&buffer[..4]);
    if found != magic {
        return Err(WireError::BadMagic {
            expected: magic,
            found,
        });
    }

    let version = u16::from_le_bytes([buffer[4], buffer[5]]);
    if version != FORMAT_VERSION {
        return Err(WireError::UnsupportedVersion(version));
    }

    Ok(&buffer[HEADER_LEN..])
}

/// Encode a graph record into a framed buffer.
pub fn encode_graph(graph: &FlatGraph) -> Result<Vec<u8>> {
    let payload = BincodeSerializer::new().dumps(graph)?;
    Ok(frame(GRAPH_MAGIC, payload))
}

/// Decode and structurally validate a framed graph buffer.
pub fn decode_graph(buffer: &[u8]) -> Result<FlatGraph> {
    let payload = unframe(GRAPH_MAGIC, buffer)?;
    let graph: FlatGraph = BincodeSerializer::new().loads(payload)?;
    graph.validate()?;
    Ok(graph)
}

/// Encode a result record into a framed buffer.
pub fn encode_result(result: &FlatResult) -> Result<Vec<u8>> {
    let payload = BincodeSerializer::new().dumps(result)?;
    Ok(frame(RESULT_MAGIC, payload))
}

/// Decode a framed result buffer.
pub fn decode_result(buffer: &[u8]) -> Result<FlatResult> {
    let payload = unframe(RESULT_MAGIC, buffer)?;
    BincodeSerializer::new().loads(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{FlatArray, FlatNode, FlatVariable, IntPair};
    use crate::types::{ByteOrder, DataType, OpType};

    fn sample_graph() -> FlatGraph {
        FlatGraph::new(11)
            .with_variable(
                FlatVariable::new(IntPair::new(-1, 0))
                    .with_name("x")
                    .with_array(FlatArray::new(
                        vec![2],
                        1.5f32
                            .to_le_bytes()
                            .into_iter()
                            .chain(2.5f32.to_le_bytes())
                            .collect(),
                        DataType::Float,
                        ByteOrder::Le,
                    )),
            )
            .with_node(FlatNode::new(1, OpType::Transform, 0).with_inputs(vec![-1]))
    }

    #[test]
    fn test_graph_frame_header() {
        let bytes = encode_graph(&sample_graph()).unwrap();
        assert_eq!(&bytes[..4], b"TGRF");
        assert_eq!(u16::from_le_bytes([bytes[4], bytes[5]]), FORMAT_VERSION);
        assert_eq!(decode_graph(&bytes).unwrap(), sample_graph());
    }

    #[test]
    fn test_result_magic_is_not_a_graph() {
        let bytes = encode_result(&FlatResult::new(3)).unwrap();
        match decode_graph(&bytes) {
            Err(WireError::BadMagic { expected, found }) => {
                assert_eq!(expected, GRAPH_MAGIC);
                assert_eq!(found, RESULT_MAGIC);
            }
            other => panic!("expected BadMagic, got {:?}", other),
        }
        assert_eq!(decode_result(&bytes).unwrap().id, 3);
    }

    #[test]
    fn test_truncated_buffer() {
        assert!(matches!(
            decode_graph(b"TGR"),
            Err(WireError::Truncated { len: 3, needed: 6 })
        ));
    }

    #[test]
    fn test_unsupported_version() {
        let mut bytes = encode_graph(&sample_graph()).unwrap();
        bytes[4] = 9;
        assert!(matches!(
            decode_graph(&bytes),
            Err(WireError::UnsupportedVersion(9))
        ));
    }

    #[test]
    fn test_decode_rejects_inconsistent_array() {
        let mut graph = sample_graph();
        if let Some(array) = graph.variables[0].array.as_mut() {
            array.buffer.pop();
        }
        let bytes = encode_graph(&graph).unwrap();
        assert!(matches!(decode_graph(&bytes), Err(WireError::Invalid(_))));
    }
}
