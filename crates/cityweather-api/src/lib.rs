//! HTTP endpoint for CityWeather.
//!
//! Provides the request handler, the axum router and the process-wide
//! service context that wires cache, provider and store together.

pub mod context;
pub mod handler;
pub mod routes;

pub use context::ServiceContext;
pub use handler::{HandlerResponse, RequestHandler};
pub use routes::router;
