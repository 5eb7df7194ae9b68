pub mod api;
pub mod auth;
pub mod commands;
pub mod config;
pub mod consts;
pub mod geocode;
pub mod logging;
pub mod models;
pub mod photos;
pub mod render;
pub mod sightings;
pub mod spinner;
