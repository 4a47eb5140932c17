//! Transfer protocol integration tests
//! Field-list decoding, textual wire form, content validation and custody

use daguerre::{
    session::PixelFormat,
    transfer::{salvage_address_from_wire, validate_photo_payload, validate_record, CustodyState},
    BufferAddress, CaptureConfig, CaptureOrientation, CustodyLedger, EncodedRecord, ErrorKind,
    EventKind, ImageOrientation, TransferRecord, WireField,
};

const ADDRESS: BufferAddress = BufferAddress::from_raw(0x7f00_0000_1000);

fn preview(width: u32, height: u32, stride: u32, length: usize) -> TransferRecord {
    TransferRecord::preview(
        ADDRESS,
        width,
        height,
        stride,
        length,
        CaptureOrientation::Portrait,
        ImageOrientation::Right,
        false,
    )
}

fn photo(length: usize) -> TransferRecord {
    TransferRecord::photo(
        ADDRESS,
        4032,
        3024,
        length,
        CaptureOrientation::LandscapeLeft,
        ImageOrientation::UpMirrored,
        true,
    )
}

#[cfg(test)]
mod transfer_protocol_tests {
    use super::*;

    /// Test: A VGA preview whose length equals height x stride validates
    #[test]
    fn test_vga_preview_validates() {
        let record = preview(640, 480, 2560, 1_228_800);
        let decoded = TransferRecord::decode(&record.encode()).unwrap();
        assert_eq!(decoded, record);
        validate_record(&decoded, &CaptureConfig::default()).unwrap();
    }

    /// Test: A preview one byte short of height x stride is a protocol error
    #[test]
    fn test_truncated_preview_is_protocol_error() {
        let record = preview(640, 480, 2560, 1_228_799);
        let decoded = TransferRecord::decode(&record.encode()).unwrap();
        let err = validate_record(&decoded, &CaptureConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    /// Test: Photo and preview records carry seven and eight fields
    #[test]
    fn test_field_counts() {
        assert_eq!(photo(1000).encode().fields().len(), 7);
        assert_eq!(preview(2, 2, 8, 16).encode().fields().len(), 8);
    }

    /// Test: Missing or extra fields fail closed
    #[test]
    fn test_field_count_mismatch_rejected() {
        let encoded = photo(1000).encode();

        let mut short = encoded.fields().to_vec();
        short.pop();
        let err = TransferRecord::decode(&EncodedRecord::new(EventKind::Photo, short)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);

        // A photo field list presented as a preview is one field short
        let err =
            TransferRecord::decode(&EncodedRecord::new(EventKind::Preview, encoded.fields().to_vec()))
                .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    /// Test: A field of the wrong type is a protocol error
    #[test]
    fn test_field_type_mismatch_rejected() {
        let mut fields = photo(1000).encode().fields().to_vec();
        fields[1] = WireField::Bool(true);
        let err = TransferRecord::decode(&EncodedRecord::new(EventKind::Photo, fields)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    /// Test: Unknown orientation codes are protocol errors
    #[test]
    fn test_unknown_orientation_code_rejected() {
        let mut fields = photo(1000).encode().fields().to_vec();
        fields[4] = WireField::Int(9);
        let err = TransferRecord::decode(&EncodedRecord::new(EventKind::Photo, fields)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);

        let mut fields = photo(1000).encode().fields().to_vec();
        fields[5] = WireField::Int(8);
        let err = TransferRecord::decode(&EncodedRecord::new(EventKind::Photo, fields)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    /// Test: The textual form lists fields in order, comma separated
    #[test]
    fn test_wire_string_layout() {
        let wire = preview(640, 480, 2560, 1_228_800).encode().to_wire_string();
        assert_eq!(
            wire,
            format!("{},640,480,2560,1228800,1,3,false", ADDRESS.as_u64())
        );

        let parsed = EncodedRecord::parse(EventKind::Preview, &wire).unwrap();
        assert_eq!(TransferRecord::decode(&parsed).unwrap(), preview(640, 480, 2560, 1_228_800));
    }

    /// Test: Parsing accepts numeric booleans and surrounding whitespace
    #[test]
    fn test_parse_is_lenient_on_format() {
        let wire = format!(" {} , 4032, 3024, 5000, 4, 4, 1", ADDRESS.as_u64());
        let record = TransferRecord::decode(&EncodedRecord::parse(EventKind::Photo, &wire).unwrap()).unwrap();
        assert!(record.mirrored);
        assert_eq!(record.capture_orientation, CaptureOrientation::LandscapeLeft);
        assert_eq!(record.image_orientation, ImageOrientation::UpMirrored);
    }

    /// Test: Malformed text fails closed but the address can still be salvaged
    #[test]
    fn test_malformed_wire_salvages_address() {
        let wire = format!("{},640,abc,2560,1228800,1,3,false", ADDRESS.as_u64());
        let err = EncodedRecord::parse(EventKind::Preview, &wire).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert_eq!(salvage_address_from_wire(&wire), Some(ADDRESS));

        let err = EncodedRecord::parse(EventKind::Preview, "1,2,3").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert_eq!(salvage_address_from_wire("0,1,2"), None);
    }

    /// Test: Null addresses and non-positive dimensions are validation errors
    #[test]
    fn test_content_validation() {
        let capture = CaptureConfig::default();

        let mut record = photo(1000);
        record.address = BufferAddress::NULL;
        assert_eq!(validate_record(&record, &capture).unwrap_err().kind(), ErrorKind::Validation);

        let mut record = photo(1000);
        record.width = 0;
        assert_eq!(validate_record(&record, &capture).unwrap_err().kind(), ErrorKind::Validation);

        let mut record = preview(640, 480, 2560, 1_228_800);
        record.height = -480;
        assert_eq!(validate_record(&record, &capture).unwrap_err().kind(), ErrorKind::Validation);

        let mut record = preview(640, 480, 2560, 1_228_800);
        record.bytes_per_row = Some(0);
        assert_eq!(validate_record(&record, &capture).unwrap_err().kind(), ErrorKind::Validation);
    }

    /// Test: Raw BGRA photos must be exactly width x height x 4 bytes
    #[test]
    fn test_raw_bgra_photo_length_checked() {
        let capture = CaptureConfig {
            photo_format: PixelFormat::Bgra32,
            ..CaptureConfig::default()
        };
        let exact = 4032 * 3024 * 4;
        validate_record(&photo(exact), &capture).unwrap();

        let err = validate_record(&photo(exact - 4), &capture).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        // Encoded photos have no fixed length
        validate_record(&photo(exact - 4), &CaptureConfig::default()).unwrap();
    }

    /// Test: Empty and all-zero photo payloads are rejected
    #[test]
    fn test_photo_payload_checks() {
        assert_eq!(validate_photo_payload(&[]).unwrap_err().kind(), ErrorKind::Validation);
        assert_eq!(validate_photo_payload(&[0; 64]).unwrap_err().kind(), ErrorKind::Validation);
        validate_photo_payload(&[0, 0, 1]).unwrap();
    }

    /// Test: Custody moves Lent -> PendingRelease -> gone, exactly once
    #[test]
    fn test_custody_lifecycle() {
        let ledger = CustodyLedger::new();
        ledger.lend(ADDRESS, EventKind::Preview, 64).unwrap();
        assert_eq!(ledger.state_of(ADDRESS), Some(CustodyState::Lent));

        // Not readable or releasable before publication
        assert_eq!(
            ledger.with_published(ADDRESS, |_| Ok(())).unwrap_err().kind(),
            ErrorKind::Custody
        );
        assert_eq!(ledger.release(ADDRESS, |_| Ok(())).unwrap_err().kind(), ErrorKind::Custody);

        ledger.publish(ADDRESS).unwrap();
        assert_eq!(ledger.state_of(ADDRESS), Some(CustodyState::PendingRelease));
        let length = ledger.with_published(ADDRESS, |entry| Ok(entry.length)).unwrap();
        assert_eq!(length, 64);

        let mut freed = 0;
        let entry = ledger
            .release(ADDRESS, |_| {
                freed += 1;
                Ok(())
            })
            .unwrap();
        assert_eq!(entry.kind, EventKind::Preview);
        assert_eq!(freed, 1);
        assert_eq!(ledger.outstanding(), 0);

        // Second release and use after release are detected
        assert_eq!(ledger.release(ADDRESS, |_| Ok(())).unwrap_err().kind(), ErrorKind::Custody);
        assert_eq!(
            ledger.with_published(ADDRESS, |_| Ok(())).unwrap_err().kind(),
            ErrorKind::Custody
        );
    }

    /// Test: Drain hands back every outstanding entry for force release
    #[test]
    fn test_custody_drain() {
        let ledger = CustodyLedger::new();
        let second = BufferAddress::from_raw(ADDRESS.as_usize() + 4096);
        ledger.lend(ADDRESS, EventKind::Photo, 10).unwrap();
        ledger.lend(second, EventKind::Preview, 20).unwrap();
        ledger.publish(second).unwrap();

        let mut drained = ledger.drain();
        drained.sort_by_key(|(address, _)| *address);
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].0, ADDRESS);
        assert_eq!(ledger.outstanding(), 0);
    }
}
