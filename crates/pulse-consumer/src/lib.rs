//! Consumer side of the pulse pipelines: configuration, message sources,
//! the consume loop and the replay producer used to feed it.

pub mod config;
pub mod replay;
pub mod runner;
pub mod source;
