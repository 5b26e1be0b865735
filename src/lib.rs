pub mod config;
pub mod dates;
pub mod discovery;
pub mod fetcher;
pub mod links;
pub mod logging;
pub mod repositories;
pub mod retrieval;
pub mod runner;
