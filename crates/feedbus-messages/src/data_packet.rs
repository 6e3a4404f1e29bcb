//! The unit of application data carried by multicast and unicast messages.

use uuid::Uuid;

/// One opaque payload with a GUID header.
///
/// The header identifies the entitlement the packet belongs to; the
/// distributor filters packets by header against a subscriber's entitlement
/// set when the feed requires authorization. The body is never inspected by
/// the distributor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataPacket {
    pub header: Uuid,
    pub body: Vec<u8>,
}

impl DataPacket {
    #[must_use]
    pub fn new(header: Uuid, body: Vec<u8>) -> Self {
        Self { header, body }
    }
}
