//! Property tests for the framed codec.

use proptest::prelude::*;
use tensorgraph_wire::{codec, FlatArray, FlatGraph, FlatNode, FlatVariable, IntPair, OpType};
use tensorgraph_wire::{ByteOrder, DataType, WireError};

proptest! {
    /// Arbitrary bytes must be rejected with an error, never a panic.
    #[test]
    fn decode_graph_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        let _ = codec::decode_graph(&bytes);
    }

    /// A valid header followed by garbage is a payload error, not a header error.
    #[test]
    fn garbage_payload_is_reported(payload in proptest::collection::vec(any::<u8>(), 0..64)) {
        let mut bytes = b"TGRF".to_vec();
        bytes.extend_from_slice(&codec::FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&payload);
        match codec::decode_graph(&bytes) {
            Err(WireError::BadMagic { .. }) | Err(WireError::Truncated { .. }) => {
                prop_assert!(false, "header was valid");
            }
            _ => {}
        }
    }

    /// Array payloads survive a frame in any shape.
    #[test]
    fn array_payload_is_preserved(dims in proptest::collection::vec(1i64..5, 0..3)) {
        let len: i64 = dims.iter().product();
        let buffer: Vec<u8> = (0..len * 4).map(|b| b as u8).collect();
        let graph = FlatGraph::new(1)
            .with_variable(
                FlatVariable::new(IntPair::new(-1, 0))
                    .with_array(FlatArray::new(dims.clone(), buffer.clone(), DataType::Int32, ByteOrder::Le)),
            )
            .with_node(FlatNode::new(1, OpType::Custom, 7).with_inputs(vec![-1]));

        let decoded = codec::decode_graph(&codec::encode_graph(&graph).unwrap()).unwrap();
        let array = decoded.variables[0].array.as_ref().unwrap();
        prop_assert_eq!(&array.shape, &dims);
        prop_assert_eq!(&array.buffer, &buffer);
    }

    /// Shapes whose byte size overflows are rejected as invalid records.
    #[test]
    fn oversized_shape_is_rejected(
        dims in proptest::collection::vec(1i64 << 32..i64::MAX, 2..5),
        buffer in proptest::collection::vec(any::<u8>(), 0..16),
    ) {
        let graph = FlatGraph::new(1).with_variable(
            FlatVariable::new(IntPair::new(-1, 0))
                .with_array(FlatArray::new(dims, buffer, DataType::Int64, ByteOrder::Le)),
        );
        let bytes = codec::encode_graph(&graph).unwrap();
        prop_assert!(matches!(codec::decode_graph(&bytes), Err(WireError::Invalid(_))));
    }
}
