// External gateway clients (push notifications, payments)
//
// Both gateways are modelled as async traits so the booking service can be
// exercised against in-memory fakes. Concrete clients are built once at
// bootstrap and injected; there is no module-level singleton.

pub mod payment;
pub mod push;

pub use payment::*;
pub use push::*;

/// Errors from external gateway calls
///
/// Gateway failures are never allowed to abort the primary booking
/// operation they accompany; callers log and continue.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("gateway returned status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("gateway misconfigured: {0}")]
    Config(String),
}
