pub mod classify;
pub mod dispatch;
pub mod types;

pub use classify::{classify, Classification, Phase};
pub use dispatch::{HttpTransport, MessageTransport, RequestDispatcher, TransportFailure};
pub use types::{Envelope, MessageKind, RequestFields, RequestHeader, ResponseHeader, WireMessage};
