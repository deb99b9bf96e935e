//! Endpoint configuration.

pub mod addr;

pub use addr::{EndpointSpec, parse_endpoint_list, parse_endpoint_token, parse_ipv4_literal};
