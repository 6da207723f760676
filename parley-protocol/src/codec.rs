//! Message codec for connection framing
//!
//! Every frame is a 4-byte big-endian length followed by a bincode body, so a
//! decoder yields exactly one logical message however the stream is chunked.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::messages::{ClientMessage, ServerMessage};

/// Maximum message size (16 MB)
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Protocol codec error
///
/// `Io` is a transport failure; `Bincode` and `MessageTooLarge` mean the peer
/// sent bytes that do not form a valid frame.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("Message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },
}

impl CodecError {
    /// True when the peer sent malformed data rather than the transport failing
    pub fn is_decode_error(&self) -> bool {
        !matches!(self, Self::Io(_))
    }
}

/// Codec for ClientMessage (encoding) and ServerMessage (decoding)
/// Used by the client side
pub struct ClientCodec;

impl ClientCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ClientCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ClientCodec {
    type Item = ServerMessage;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        decode_message(src)
    }
}

impl Encoder<ClientMessage> for ClientCodec {
    type Error = CodecError;

    fn encode(&mut self, item: ClientMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_message(&item, dst)
    }
}

/// Codec for ServerMessage (encoding) and ClientMessage (decoding)
/// Used by the server side
pub struct ServerCodec;

impl ServerCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ServerCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ServerCodec {
    type Item = ClientMessage;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        decode_message(src)
    }
}

impl Encoder<ServerMessage> for ServerCodec {
    type Error = CodecError;

    fn encode(&mut self, item: ServerMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_message(&item, dst)
    }
}

/// Decode a length-prefixed message
fn decode_message<T: serde::de::DeserializeOwned>(
    src: &mut BytesMut,
) -> Result<Option<T>, CodecError> {
    // Need at least 4 bytes for length prefix
    if src.len() < 4 {
        return Ok(None);
    }

    // Peek at length without consuming
    let len = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;

    if len > MAX_MESSAGE_SIZE {
        return Err(CodecError::MessageTooLarge {
            size: len,
            max: MAX_MESSAGE_SIZE,
        });
    }

    if src.len() < 4 + len {
        src.reserve(4 + len - src.len());
        return Ok(None);
    }

    src.advance(4);
    let data = src.split_to(len);

    let msg: T = bincode::deserialize(&data)?;
    Ok(Some(msg))
}

/// Encode a length-prefixed message
fn encode_message<T: serde::Serialize>(item: &T, dst: &mut BytesMut) -> Result<(), CodecError> {
    let data = bincode::serialize(item)?;

    if data.len() > MAX_MESSAGE_SIZE {
        return Err(CodecError::MessageTooLarge {
            size: data.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }

    dst.reserve(4 + data.len());
    dst.put_u32(data.len() as u32);
    dst.put_slice(&data);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::ErrorCode;
    use crate::types::Message;
    use std::sync::Arc;

    #[test]
    fn test_client_message_roundtrip() {
        let mut codec = ClientCodec::new();
        let mut server_codec = ServerCodec::new();

        let msg = ClientMessage::post("ana", "hello, world");

        let mut buf = BytesMut::new();
        codec.encode(msg.clone(), &mut buf).unwrap();

        let decoded = server_codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn test_server_message_roundtrip() {
        let mut codec = ServerCodec::new();
        let mut client_codec = ClientCodec::new();

        let messages = vec![
            ServerMessage::Welcome {
                session_id: 7,
                backlog: 2,
                protocol_version: crate::PROTOCOL_VERSION,
            },
            ServerMessage::Message(Arc::new(Message::new(0, "ana", "hi", 1_700_000_000.25))),
            ServerMessage::Error {
                code: ErrorCode::ProtocolMismatch,
                message: "Protocol version mismatch".to_string(),
            },
            ServerMessage::Pong,
        ];

        for msg in messages {
            let mut buf = BytesMut::new();
            codec.encode(msg.clone(), &mut buf).unwrap();
            let decoded = client_codec.decode(&mut buf).unwrap().unwrap();
            assert_eq!(msg, decoded);
        }
    }

    #[test]
    fn test_partial_message() {
        let mut codec = ClientCodec::new();
        let mut server_codec = ServerCodec::new();

        let mut buf = BytesMut::new();
        codec.encode(ClientMessage::Ping, &mut buf).unwrap();

        // Split buffer to simulate partial read
        let mut partial = buf.split_to(2);
        assert!(server_codec.decode(&mut partial).unwrap().is_none());

        partial.unsplit(buf);
        assert_eq!(
            server_codec.decode(&mut partial).unwrap(),
            Some(ClientMessage::Ping)
        );
    }

    #[test]
    fn test_message_too_large_on_decode() {
        let mut codec = ServerCodec::new();
        let mut buf = BytesMut::new();

        let huge_size: u32 = (MAX_MESSAGE_SIZE + 1) as u32;
        buf.put_u32(huge_size);

        let result = codec.decode(&mut buf);
        assert!(matches!(result, Err(CodecError::MessageTooLarge { .. })));
    }

    #[test]
    fn test_garbage_body_is_decode_error() {
        let mut codec = ServerCodec::new();
        let mut buf = BytesMut::new();

        // Variant index far outside ClientMessage
        buf.put_u32(4);
        buf.put_slice(&[0xff, 0xff, 0xff, 0x7f]);

        let err = codec.decode(&mut buf).unwrap_err();
        assert!(matches!(err, CodecError::Bincode(_)));
        assert!(err.is_decode_error());
    }

    #[test]
    fn test_io_error_is_not_decode_error() {
        let err = CodecError::from(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "gone",
        ));
        assert!(!err.is_decode_error());
    }

    #[test]
    fn test_multiple_messages_in_buffer() {
        let mut codec = ClientCodec::new();
        let mut server_codec = ServerCodec::new();

        let msg1 = ClientMessage::Ping;
        let msg2 = ClientMessage::post("ana", "one");
        let msg3 = ClientMessage::post("ana", "two");

        let mut buf = BytesMut::new();
        codec.encode(msg1.clone(), &mut buf).unwrap();
        codec.encode(msg2.clone(), &mut buf).unwrap();
        codec.encode(msg3.clone(), &mut buf).unwrap();

        assert_eq!(server_codec.decode(&mut buf).unwrap(), Some(msg1));
        assert_eq!(server_codec.decode(&mut buf).unwrap(), Some(msg2));
        assert_eq!(server_codec.decode(&mut buf).unwrap(), Some(msg3));

        // Buffer should be empty now
        assert!(server_codec.decode(&mut buf).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_framed_read_over_byte_dribble() {
        use futures::StreamExt;
        use tokio::io::AsyncWriteExt;
        use tokio_util::codec::FramedRead;

        let mut encoded = BytesMut::new();
        let mut codec = ClientCodec::new();
        codec
            .encode(ClientMessage::post("ana", "first"), &mut encoded)
            .unwrap();
        codec
            .encode(ClientMessage::post("bo", "second"), &mut encoded)
            .unwrap();

        let (mut tx, rx) = tokio::io::duplex(8);
        let writer = tokio::spawn(async move {
            for byte in encoded.iter() {
                tx.write_all(&[*byte]).await.unwrap();
            }
        });

        let mut framed = FramedRead::new(rx, ServerCodec::new());
        let first = framed.next().await.unwrap().unwrap();
        let second = framed.next().await.unwrap().unwrap();
        writer.await.unwrap();

        assert_eq!(first, ClientMessage::post("ana", "first"));
        assert_eq!(second, ClientMessage::post("bo", "second"));
        assert!(framed.next().await.is_none());
    }
}
