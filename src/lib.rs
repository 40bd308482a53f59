pub mod arrivals;
pub mod cache;
pub mod config;
pub mod envelope;
pub mod error;
pub mod facade;
pub mod fetch;
pub mod geo_match;
pub mod infra;
pub mod model;
pub mod parser;
pub mod reference;
pub mod route_stops;
pub mod server;
pub mod services;
pub mod timetable;
pub mod vehicles;
