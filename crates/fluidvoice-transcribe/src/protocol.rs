//! Wire types exchanged with the out-of-process transcription worker.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum WorkerOp {
    Ping,
    Transcribe { request_id: u64, pcm16_mono_16k: Vec<i16> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WorkerResponse {
    Pong,
    Ok { request_id: u64, text: String },
    Error { request_id: Option<u64>, message: String },
}

pub type TranscribeRequest = WorkerOp;
pub type TranscribeResponse = WorkerResponse;
