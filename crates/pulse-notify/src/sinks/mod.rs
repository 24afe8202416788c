pub mod channel;
pub mod jsonl;
pub mod log;

pub use channel::ChannelSink;
pub use jsonl::JsonLinesSink;
pub use log::LogSink;
