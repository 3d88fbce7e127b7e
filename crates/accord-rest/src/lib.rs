//! REST command channel: a typed transport over reqwest and a single
//! serialized queue that preserves submission order across retries.

#![deny(unsafe_code)]

pub mod errors;
pub mod queue;
pub mod transport;

pub use errors::{CommandError, RestError};
pub use queue::{CommandFuture, CommandQueue};
pub use transport::{
    CommandRequest, CommandResponse, HttpMethod, HttpProbe, HttpTransport, Reachability,
    RestTransport,
};
