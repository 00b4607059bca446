pub mod config;
pub mod discovery;
pub mod engine;
pub mod errors;
pub mod ledger;
pub mod model;
pub mod normalize;
pub mod optimize;
pub mod providers;
pub mod registry;
pub mod report;
pub mod schema;
pub mod score;
