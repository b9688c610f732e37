#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::new_without_default,
    clippy::return_self_not_must_use
)]

pub mod config;
pub mod description;
pub mod error;
pub mod exchange;
pub mod gateway;
pub mod messages;
pub mod model;
pub mod negotiation;
pub mod store;

pub use config::ConnectorConfig;
pub use error::{ExchangeError, Result};
pub use exchange::{DescribeOutcome, ExchangeService, FetchOutcome, NegotiateOutcome, Rejection};
