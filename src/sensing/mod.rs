pub mod controller;
pub mod loop_worker;
pub mod snapshot;

pub use controller::FrameSampler;
pub use loop_worker::FrameSink;
pub use snapshot::{encode_jpeg, EncodedFrame};
