pub mod assets;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod fuzzy;
pub mod http_client;
pub mod model;
pub mod normalize;
pub mod predict;
pub mod roster;
pub mod search;
pub mod single_flight;
pub mod upstream;
pub mod version;
