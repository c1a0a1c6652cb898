pub mod http;
pub mod protocol;
pub mod runtime;

pub use http::{ApiClient, FetchError};
pub use protocol::{Effect, FetchKind, FetchPayload, FetchRequest, FetchSlot, Incoming, Mutation};
pub use runtime::{NetRuntime, TokioTicker};
