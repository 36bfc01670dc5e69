pub mod client;
pub mod query_builder;
pub mod update;
