//! HTTP adapters.

mod reqwest_transport;

pub(crate) use reqwest_transport::map_error;
pub use reqwest_transport::{ReqwestTransport, build_client};
