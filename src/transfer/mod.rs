//! Native-to-managed transfer protocol
//!
//! Encoding of buffer descriptions as flat field lists, the checks applied
//! when they are decoded, and the custody table that tracks who owns each
//! buffer while it is in flight.

pub mod codec;
pub mod custody;
pub mod record;
pub mod validate;

pub use codec::{salvage_address, salvage_address_from_wire, EncodedRecord, WireField};
pub use custody::{CustodyEntry, CustodyLedger, CustodyState};
pub use record::{CaptureOrientation, EventKind, ImageOrientation, TransferRecord};
pub use validate::{validate_photo_payload, validate_record, BGRA32_BYTES_PER_PIXEL};
