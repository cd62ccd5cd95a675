pub mod codec;
pub mod dispatcher;
pub mod protocol;
pub mod worker;

pub use dispatcher::Dispatcher;
pub use protocol::{TranscribeRequest, TranscribeResponse, WorkerOp, WorkerResponse};
pub use worker::WorkerHandle;
