//! Cross-cutting decorator stages.
//!
//! These stages define the chain's ordering invariants. The process-global
//! composition applied to every pattern is, outermost first:
//!
//! 1. [`RequestIdDecorator`] - identification, so every response (including
//!    rejections) carries `X-Request-ID` and every log line correlates
//! 2. [`RequestTimeDecorator`] - receipt timestamp
//! 3. [`RouteLogDecorator`] - one event on receipt, one on completion
//! 4. [`BackendIdDecorator`] - process identity header
//! 5. [`CorsDecorator`] - cross-origin headers on every response
//! 6. [`RecoverDecorator`] - panic isolation, innermost of the globals so a
//!    panicking route still produces a logged, CORS-tagged 500
//!
//! Route-level decorators (transaction, authentication, argument
//! extraction, body validation) compose inside this list.

mod backend_id;
mod cors;
mod recover;
mod request_id;
mod request_time;
mod route_log;

pub use backend_id::{BackendIdDecorator, BACKEND_ID_HEADER};
pub use cors::CorsDecorator;
pub use recover::RecoverDecorator;
pub use request_id::{RequestIdDecorator, REQUEST_ID, REQUEST_ID_HEADER};
pub use request_time::{RequestTimeDecorator, REQUEST_TIME};
pub use route_log::RouteLogDecorator;
