//! Request types

mod descriptor;
mod method;
mod spec;

pub use descriptor::RequestDescriptor;
pub use method::HttpMethod;
pub use spec::ApiRequest;
