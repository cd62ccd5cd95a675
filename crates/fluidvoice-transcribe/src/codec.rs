//! 4-byte big-endian length prefix + JSON payload framing over the worker
//! socket, the idiomatic `tokio_util::codec` approach to length-delimited
//! IPC rather than hand-rolled buffering.

use bytes::{Buf, BufMut, BytesMut};
use serde::{de::DeserializeOwned, Serialize};
use std::io;
use std::marker::PhantomData;
use tokio_util::codec::{Decoder, Encoder};

const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

pub struct JsonLengthCodec<Enc, Dec = Enc> {
    _marker: PhantomData<(Enc, Dec)>,
}

impl<Enc, Dec> Default for JsonLengthCodec<Enc, Dec> {
    fn default() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<Enc: Serialize, Dec> Encoder<Enc> for JsonLengthCodec<Enc, Dec> {
    type Error = io::Error;

    fn encode(&mut self, item: Enc, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let payload = serde_json::to_vec(&item)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        if payload.len() > MAX_FRAME_BYTES {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "frame too large"));
        }
        dst.put_u32(payload.len() as u32);
        dst.extend_from_slice(&payload);
        Ok(())
    }
}

impl<Enc, Dec: DeserializeOwned> Decoder for JsonLengthCodec<Enc, Dec> {
    type Item = Dec;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < 4 {
            return Ok(None);
        }
        let len = u32::from_be_bytes(src[..4].try_into().unwrap()) as usize;
        if len > MAX_FRAME_BYTES {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "frame too large"));
        }
        if src.len() < 4 + len {
            src.reserve(4 + len - src.len());
            return Ok(None);
        }
        src.advance(4);
        let payload = src.split_to(len);
        let value = serde_json::from_slice(&payload)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Ok(Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::WorkerOp;

    #[test]
    fn round_trips_a_frame() {
        let mut encoder = JsonLengthCodec::<WorkerOp>::default();
        let mut buf = BytesMut::new();
        encoder
            .encode(
                WorkerOp::Transcribe {
                    request_id: 1,
                    pcm16_mono_16k: vec![1, 2, 3],
                },
                &mut buf,
            )
            .unwrap();

        let mut decoder = JsonLengthCodec::<WorkerOp>::default();
        let decoded = decoder.decode(&mut buf).unwrap().unwrap();
        match decoded {
            WorkerOp::Transcribe { request_id, pcm16_mono_16k } => {
                assert_eq!(request_id, 1);
                assert_eq!(pcm16_mono_16k, vec![1, 2, 3]);
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn decode_returns_none_on_partial_frame() {
        let mut decoder = JsonLengthCodec::<WorkerOp>::default();
        let mut buf = BytesMut::new();
        buf.put_u32(100);
        buf.extend_from_slice(b"short");
        assert!(decoder.decode(&mut buf).unwrap().is_none());
    }
}
