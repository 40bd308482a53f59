mod client;
mod route_page;

pub use client::RelayClient;
pub use route_page::extract_ordered_stops;
