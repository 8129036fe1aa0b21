pub mod cli;
pub mod config;
pub mod corpus;
pub mod error;
pub mod ingest;
pub mod model;
pub mod position;
pub mod refs;
pub mod rpc;
pub mod store;
