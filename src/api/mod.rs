use thiserror::Error;

use crate::{common::data, server::EngineError};

mod fetch;
pub mod normalize;
pub mod output;

pub use fetch::{
    get_fetch_mock_handler, BoxedFetchHandler, FetchHandler, FetchMockServer,
    FetchMockServerOptions,
};
#[allow(deprecated)]
pub use fetch::FetchServer;
pub use output::{LogFormat, LogSink, MemorySink, StderrSink};

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("cannot read request body: {0}")]
    BodyRead(String),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("invalid engine response: {0}")]
    InvalidResponse(#[from] data::Error),
    #[error("invalid configuration: {0}")]
    Configuration(String),
}
