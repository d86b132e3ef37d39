mod request;
pub use request::Request;

mod response;
pub use response::Entity;
pub use response::Response;

mod error;
pub use error::HttpError;
pub use error::ProtocolError;

pub mod params;
pub use params::ParamValue;
pub use params::Params;

mod context;
pub use context::Context;
pub use context::{HTTP_CONNECTION, HTTP_REQUEST, HTTP_RESPONSE};

mod processor;
pub use processor::{ChainProcessor, ChainProcessorBuilder, HttpProcessor};
pub use processor::{RequestInterceptor, ResponseInterceptor};
pub use processor::{ResponseConnControl, ResponseContent, ResponseDate, ResponseServer};

mod reuse;
pub use reuse::{AlwaysClose, DefaultReuseStrategy, ReuseStrategy};
