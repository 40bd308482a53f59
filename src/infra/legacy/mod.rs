mod client;

pub use client::SoapClient;
