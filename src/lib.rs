pub mod clock;
pub mod config;
pub mod error;
pub mod extrapolate;
pub mod feed;
pub mod fetch;
pub mod output;
pub mod parser;
pub mod poller;
pub mod snapshot;
pub mod subject;
