//! Client side of the session: a cookie-carrying HTTP client that silently
//! refreshes expired access tokens, one refresh at a time.

pub mod coordinator;
pub mod error;
pub mod session;
pub mod transport;

pub use coordinator::RefreshCoordinator;
pub use error::{AuthFailure, ClientError, TransportError};
pub use session::{Destination, Navigator, SessionClient};
pub use transport::{ApiRequest, ApiResponse, ReqwestTransport, Transport};
