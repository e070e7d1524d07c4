//! HTTP request/response subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → hyper http1 (parse request line, headers, framing)
//!     → server.rs (dispatch boundary, one task per connection)
//!     → request.rs (RequestContext: lazy body access)
//!     → [routing layer picks handler]
//!     → response.rs (ResponseWriter → Reply)
//!     → hyper writes status line, headers, body
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{BodyError, BodyLimits, RemoteAddr, RequestContext, RequestId};
pub use response::{reason_phrase, Reply, ResponseError, ResponseWriter};
pub use server::Server;
