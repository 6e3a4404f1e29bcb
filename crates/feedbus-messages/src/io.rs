//! Field-level codecs for the wire protocol.
//!
//! Every variable-length field is prefixed with a 4-byte signed count in
//! network byte order. Optional arrays collapse to a count of 0: `None` and
//! an empty array encode identically, and a count of 0 always reads back as
//! `None`. Byte blocks (string bytes, packet bodies, GUIDs, IP octets) are
//! plain length-prefixed runs and may legitimately be empty.
//!
//! | field       | encoding                                   |
//! |-------------|--------------------------------------------|
//! | i32         | 4 bytes, big-endian                        |
//! | bool        | 1 byte, 0 = false                          |
//! | string      | i32 byte length + UTF-8 bytes              |
//! | byte block  | i32 length + raw bytes                     |
//! | GUID        | byte block of exactly 16 bytes             |
//! | IP address  | byte block of 4 (v4) or 16 (v6) raw octets |
//! | array of T  | i32 count + count encoded elements         |
//! | data packet | GUID header + byte-block body              |

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use uuid::Uuid;

use crate::data_packet::DataPacket;
use crate::error::MessageError;

/// Largest length or count prefix accepted on read. Anything above this is
/// treated as a protocol fault rather than an allocation request.
pub const MAX_BLOCK_LEN: i32 = 1 << 26;

/// Decoding primitives over any async byte source.
#[async_trait]
pub trait MessageReadExt: AsyncRead + Unpin + Send {
    /// Reads a 4-byte big-endian length or count prefix.
    async fn read_length(&mut self) -> Result<usize, MessageError> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf).await?;
        let len = i32::from_be_bytes(buf);
        if !(0..=MAX_BLOCK_LEN).contains(&len) {
            return Err(MessageError::Malformed("length prefix out of range"));
        }
        Ok(len as usize)
    }

    async fn read_bool(&mut self) -> Result<bool, MessageError> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf).await?;
        Ok(buf[0] != 0)
    }

    async fn read_byte_block(&mut self) -> Result<Vec<u8>, MessageError> {
        let len = self.read_length().await?;
        let mut buf = vec![0u8; len];
        self.read_exact(&mut buf).await?;
        Ok(buf)
    }

    async fn read_string(&mut self) -> Result<String, MessageError> {
        let block = self.read_byte_block().await?;
        String::from_utf8(block).map_err(|_| MessageError::Malformed("string is not valid UTF-8"))
    }

    async fn read_uuid(&mut self) -> Result<Uuid, MessageError> {
        let block = self.read_byte_block().await?;
        let bytes: [u8; 16] = block
            .as_slice()
            .try_into()
            .map_err(|_| MessageError::Malformed("GUID block must be 16 bytes"))?;
        Ok(Uuid::from_bytes(bytes))
    }

    async fn read_ip_address(&mut self) -> Result<IpAddr, MessageError> {
        let block = self.read_byte_block().await?;
        match block.len() {
            4 => {
                let mut octets = [0u8; 4];
                octets.copy_from_slice(&block);
                Ok(IpAddr::V4(Ipv4Addr::from(octets)))
            }
            16 => {
                let mut octets = [0u8; 16];
                octets.copy_from_slice(&block);
                Ok(IpAddr::V6(Ipv6Addr::from(octets)))
            }
            _ => Err(MessageError::Malformed("IP address block must be 4 or 16 bytes")),
        }
    }

    /// Reads a GUID array; a count of 0 reads back as absent.
    async fn read_uuid_array(&mut self) -> Result<Option<Vec<Uuid>>, MessageError> {
        let count = self.read_length().await?;
        if count == 0 {
            return Ok(None);
        }
        let mut items = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            items.push(self.read_uuid().await?);
        }
        Ok(Some(items))
    }

    /// Reads a data packet array; a count of 0 reads back as absent.
    async fn read_data_packets(&mut self) -> Result<Option<Vec<DataPacket>>, MessageError> {
        let count = self.read_length().await?;
        if count == 0 {
            return Ok(None);
        }
        let mut packets = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            let header = self.read_uuid().await?;
            let body = self.read_byte_block().await?;
            packets.push(DataPacket::new(header, body));
        }
        Ok(Some(packets))
    }
}

impl<R: AsyncRead + Unpin + Send + ?Sized> MessageReadExt for R {}

/// Encoding primitives over any async byte sink. Exact inverse of
/// [`MessageReadExt`] field for field.
#[async_trait]
pub trait MessageWriteExt: AsyncWrite + Unpin + Send {
    async fn write_length(&mut self, len: usize) -> Result<(), MessageError> {
        let len = i32::try_from(len)
            .ok()
            .filter(|len| *len <= MAX_BLOCK_LEN)
            .ok_or(MessageError::Malformed("length exceeds protocol limit"))?;
        self.write_all(&len.to_be_bytes()).await?;
        Ok(())
    }

    async fn write_bool(&mut self, value: bool) -> Result<(), MessageError> {
        self.write_all(&[u8::from(value)]).await?;
        Ok(())
    }

    async fn write_byte_block(&mut self, block: &[u8]) -> Result<(), MessageError> {
        self.write_length(block.len()).await?;
        self.write_all(block).await?;
        Ok(())
    }

    async fn write_string(&mut self, value: &str) -> Result<(), MessageError> {
        self.write_byte_block(value.as_bytes()).await
    }

    async fn write_uuid(&mut self, value: &Uuid) -> Result<(), MessageError> {
        self.write_byte_block(value.as_bytes()).await
    }

    async fn write_ip_address(&mut self, value: &IpAddr) -> Result<(), MessageError> {
        match value {
            IpAddr::V4(addr) => self.write_byte_block(&addr.octets()).await,
            IpAddr::V6(addr) => self.write_byte_block(&addr.octets()).await,
        }
    }

    async fn write_uuid_array(&mut self, items: Option<&[Uuid]>) -> Result<(), MessageError> {
        let items = items.unwrap_or_default();
        self.write_length(items.len()).await?;
        for item in items {
            self.write_uuid(item).await?;
        }
        Ok(())
    }

    async fn write_data_packets(&mut self, packets: Option<&[DataPacket]>) -> Result<(), MessageError> {
        let packets = packets.unwrap_or_default();
        self.write_length(packets.len()).await?;
        for packet in packets {
            self.write_uuid(&packet.header).await?;
            self.write_byte_block(&packet.body).await?;
        }
        Ok(())
    }
}

impl<W: AsyncWrite + Unpin + Send + ?Sized> MessageWriteExt for W {}
