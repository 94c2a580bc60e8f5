//! Property tests for RDT decoding.

use bytes::BytesMut;
use netbox_protocol::{NetFtCodec, RECORD_LEN, RdtRecord};
use proptest::prelude::*;
use tokio_util::codec::Decoder;

fn any_record() -> impl Strategy<Value = RdtRecord> {
    (any::<u32>(), any::<u32>(), any::<u32>(), any::<[i32; 6]>()).prop_map(
        |(rdt_sequence, ft_sequence, status, [fx, fy, fz, tx, ty, tz])| RdtRecord {
            rdt_sequence,
            ft_sequence,
            status,
            fx,
            fy,
            fz,
            tx,
            ty,
            tz,
        },
    )
}

proptest! {
    /// However the byte stream is chunked, the same records come out in order.
    #[test]
    fn prop_decode_is_chunking_independent(
        records in prop::collection::vec(any_record(), 1..8),
        chunk in 1usize..80,
    ) {
        let wire: Vec<u8> = records.iter().flat_map(|r| r.to_bytes()).collect();
        let mut codec = NetFtCodec::new();
        let mut buf = BytesMut::new();
        let mut decoded = Vec::new();

        for piece in wire.chunks(chunk) {
            buf.extend_from_slice(piece);
            while let Some(record) = codec.decode(&mut buf).unwrap() {
                decoded.push(record);
            }
        }

        prop_assert_eq!(decoded, records);
        prop_assert!(buf.len() < RECORD_LEN);
    }

    /// Block conversion keeps raw counts exactly.
    #[test]
    fn prop_block_keeps_counts(record in any_record()) {
        let block = record.to_block();
        prop_assert_eq!(block.timestamp, f64::from(record.rdt_sequence));
        prop_assert_eq!(block.fy, f64::from(record.fy));
        prop_assert_eq!(block.tz, f64::from(record.tz));
    }
}
