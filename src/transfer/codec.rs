//! Flat field-list encoding of transfer records
//!
//! A record travels as an ordered list of primitive fields:
//!
//! ```text
//! photo:   address, width, height, length, orientation, imageOrientation, mirrored
//! preview: address, width, height, bytesPerRow, length, orientation, imageOrientation, mirrored
//! ```
//!
//! The same list has a textual form, the comma-joined fields, which is what
//! a native layer posts when it can only send strings.

use std::fmt;

use crate::{
    buffers::BufferAddress,
    error::{DaguerreError, Result},
};

use super::record::{CaptureOrientation, EventKind, ImageOrientation, TransferRecord};

/// One primitive field of an encoded record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireField {
    Address(u64),
    Int(i64),
    Bool(bool),
}

impl fmt::Display for WireField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireField::Address(value) => write!(f, "{}", value),
            WireField::Int(value) => write!(f, "{}", value),
            WireField::Bool(value) => write!(f, "{}", value),
        }
    }
}

/// A record as it crosses the boundary: a kind tag plus its field list.
///
/// Construction does not check the field count; [`TransferRecord::decode`]
/// and [`EncodedRecord::parse`] do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedRecord {
    kind: EventKind,
    fields: Vec<WireField>,
}

impl EncodedRecord {
    pub fn new(kind: EventKind, fields: Vec<WireField>) -> Self {
        Self { kind, fields }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn fields(&self) -> &[WireField] {
        &self.fields
    }

    /// Comma-joined textual form
    pub fn to_wire_string(&self) -> String {
        self.fields
            .iter()
            .map(|field| field.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Parse the textual form of a record of `kind`.
    ///
    /// The first field is the address, the last the mirrored flag, all
    /// others integers.
    pub fn parse(kind: EventKind, wire: &str) -> Result<Self> {
        let parts: Vec<&str> = wire.split(',').map(str::trim).collect();
        let expected = kind.field_count();
        if parts.len() != expected {
            return Err(DaguerreError::protocol(format!(
                "{} record has {} fields, expected {}",
                kind.name(),
                parts.len(),
                expected
            )));
        }

        let last = expected - 1;
        let fields = parts
            .iter()
            .enumerate()
            .map(|(index, raw)| match index {
                0 => raw
                    .parse::<u64>()
                    .map(WireField::Address)
                    .map_err(|_| malformed(kind, index, raw)),
                i if i == last => parse_bool(raw)
                    .map(WireField::Bool)
                    .ok_or_else(|| malformed(kind, index, raw)),
                _ => raw
                    .parse::<i64>()
                    .map(WireField::Int)
                    .map_err(|_| malformed(kind, index, raw)),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { kind, fields })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    if raw.eq_ignore_ascii_case("true") || raw == "1" {
        Some(true)
    } else if raw.eq_ignore_ascii_case("false") || raw == "0" {
        Some(false)
    } else {
        None
    }
}

fn malformed(kind: EventKind, index: usize, raw: &str) -> DaguerreError {
    DaguerreError::protocol(format!(
        "{} record field {} is malformed: {:?}",
        kind.name(),
        index,
        raw
    ))
}

/// Best-effort recovery of the address of a record that failed to decode,
/// so its buffer can still be released
pub fn salvage_address(encoded: &EncodedRecord) -> Option<BufferAddress> {
    match encoded.fields.first()? {
        WireField::Address(raw) => address_from_u64(*raw),
        WireField::Int(raw) if *raw > 0 => address_from_u64(*raw as u64),
        _ => None,
    }
}

/// [`salvage_address`] for the textual form
pub fn salvage_address_from_wire(wire: &str) -> Option<BufferAddress> {
    let first = wire.split(',').next()?.trim();
    address_from_u64(first.parse::<u64>().ok()?)
}

fn address_from_u64(raw: u64) -> Option<BufferAddress> {
    let raw = usize::try_from(raw).ok()?;
    let address = BufferAddress::from_raw(raw);
    (!address.is_null()).then_some(address)
}

impl TransferRecord {
    /// Encode into the flat field list for this record's kind
    pub fn encode(&self) -> EncodedRecord {
        let mut fields = Vec::with_capacity(self.kind.field_count());
        fields.push(WireField::Address(self.address.as_u64()));
        fields.push(WireField::Int(self.width));
        fields.push(WireField::Int(self.height));
        if self.kind == EventKind::Preview {
            fields.push(WireField::Int(self.bytes_per_row.unwrap_or(0)));
        }
        fields.push(WireField::Int(self.length));
        fields.push(WireField::Int(self.capture_orientation.code()));
        fields.push(WireField::Int(self.image_orientation.code()));
        fields.push(WireField::Bool(self.mirrored));
        EncodedRecord::new(self.kind, fields)
    }

    /// Decode a field list, failing closed on a count or type mismatch.
    ///
    /// Only the structure is checked here; see
    /// [`validate_record`](super::validate_record) for the contents.
    pub fn decode(encoded: &EncodedRecord) -> Result<Self> {
        let kind = encoded.kind;
        let fields = encoded.fields();
        if fields.len() != kind.field_count() {
            return Err(DaguerreError::protocol(format!(
                "{} record has {} fields, expected {}",
                kind.name(),
                fields.len(),
                kind.field_count()
            )));
        }

        let mut cursor = FieldCursor { kind, fields, index: 0 };
        let address = cursor.address()?;
        let width = cursor.int()?;
        let height = cursor.int()?;
        let bytes_per_row = match kind {
            EventKind::Preview => Some(cursor.int()?),
            EventKind::Photo => None,
        };
        let length = cursor.int()?;

        let code = cursor.int()?;
        let capture_orientation = CaptureOrientation::from_code(code).ok_or_else(|| {
            DaguerreError::protocol(format!("unknown capture orientation code {}", code))
        })?;
        let code = cursor.int()?;
        let image_orientation = ImageOrientation::from_code(code).ok_or_else(|| {
            DaguerreError::protocol(format!("unknown image orientation code {}", code))
        })?;
        let mirrored = cursor.boolean()?;

        Ok(Self {
            kind,
            address,
            width,
            height,
            bytes_per_row,
            length,
            capture_orientation,
            image_orientation,
            mirrored,
        })
    }
}

struct FieldCursor<'a> {
    kind: EventKind,
    fields: &'a [WireField],
    index: usize,
}

impl FieldCursor<'_> {
    fn next(&mut self) -> Result<WireField> {
        let field = self.fields.get(self.index).copied().ok_or_else(|| {
            DaguerreError::protocol(format!("{} record is truncated", self.kind.name()))
        })?;
        self.index += 1;
        Ok(field)
    }

    fn mismatch(&self, expected: &str, found: WireField) -> DaguerreError {
        DaguerreError::protocol(format!(
            "{} record field {} should be {}, found {:?}",
            self.kind.name(),
            self.index - 1,
            expected,
            found
        ))
    }

    fn address(&mut self) -> Result<BufferAddress> {
        match self.next()? {
            WireField::Address(raw) => usize::try_from(raw)
                .map(BufferAddress::from_raw)
                .map_err(|_| DaguerreError::protocol(format!("address {} does not fit a pointer", raw))),
            other => Err(self.mismatch("an address", other)),
        }
    }

    fn int(&mut self) -> Result<i64> {
        match self.next()? {
            WireField::Int(value) => Ok(value),
            other => Err(self.mismatch("an integer", other)),
        }
    }

    fn boolean(&mut self) -> Result<bool> {
        match self.next()? {
            WireField::Bool(value) => Ok(value),
            other => Err(self.mismatch("a boolean", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn preview() -> TransferRecord {
        TransferRecord::preview(
            BufferAddress::from_raw(0x7f00_1000),
            640,
            480,
            2560,
            1_228_800,
            CaptureOrientation::Portrait,
            ImageOrientation::Right,
            false,
        )
    }

    #[test]
    fn test_preview_wire_string() {
        let wire = preview().encode().to_wire_string();
        assert_eq!(wire, format!("{},640,480,2560,1228800,1,3,false", 0x7f00_1000u64));
    }

    #[test]
    fn test_parse_accepts_capitalised_bool() {
        let parsed = EncodedRecord::parse(EventKind::Photo, "4096,10,10,400,1,3,True").unwrap();
        assert_eq!(parsed.fields().last(), Some(&WireField::Bool(true)));
    }

    #[test]
    fn test_field_count_mismatch_fails_closed() {
        let err = EncodedRecord::parse(EventKind::Preview, "4096,640,480,1228800,1,3,false").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);

        let err = EncodedRecord::parse(EventKind::Photo, "4096,640,480,2560,1228800,1,3,false").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);

        let mut fields = preview().encode().fields().to_vec();
        fields.push(WireField::Int(0));
        let err = TransferRecord::decode(&EncodedRecord::new(EventKind::Preview, fields)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[test]
    fn test_malformed_field_is_protocol_error() {
        let err = EncodedRecord::parse(EventKind::Photo, "4096,wide,480,100,1,3,false").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);

        let err = EncodedRecord::parse(EventKind::Photo, "4096,640,480,100,1,3,maybe").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[test]
    fn test_unknown_orientation_code_rejected() {
        let encoded = EncodedRecord::parse(EventKind::Photo, "4096,640,480,100,9,3,false").unwrap();
        let err = TransferRecord::decode(&encoded).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[test]
    fn test_salvage_address() {
        let encoded = EncodedRecord::new(EventKind::Photo, vec![WireField::Address(4096)]);
        assert_eq!(salvage_address(&encoded), Some(BufferAddress::from_raw(4096)));

        let encoded = EncodedRecord::new(EventKind::Photo, vec![WireField::Address(0)]);
        assert_eq!(salvage_address(&encoded), None);

        assert_eq!(salvage_address_from_wire("8192,garbage"), Some(BufferAddress::from_raw(8192)));
        assert_eq!(salvage_address_from_wire("nope"), None);
    }
}
