//! Token endpoint adapter.

mod token_endpoint;

pub use token_endpoint::ReqwestAuthGateway;
