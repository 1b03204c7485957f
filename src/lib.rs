pub mod batch;
pub mod config;
pub mod element;
pub mod error;
pub mod history;
pub mod logging;
pub mod process;
pub mod read;
pub mod schema;
pub mod season;
