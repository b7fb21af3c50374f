// ABOUTME: Platform REST API access: client seam, hyper transport, typed calls.
// ABOUTME: Every call is attempted once; mutating calls report a boolean outcome.

mod api;
mod app_ref;
mod client;
mod error;
mod hyper_client;
#[cfg(test)]
pub(crate) mod mock;

pub use api::{AppDescriptor, EnvEntry, PlatformApi, UnitDescriptor};
pub use app_ref::ApplicationRef;
pub use client::{
    CONTENT_TYPE_FORM, CONTENT_TYPE_JSON, Method, PlatformClient, PlatformRequest,
    PlatformResponse, SUCCESS_STATUS, encode_form, parse_form,
};
pub use error::{
    MalformedBodySnafu, PlatformError, PlatformErrorKind, TlsSetupSnafu, TransportSnafu,
};
pub use hyper_client::HyperClient;
