// Core library for the Bulwark request pipeline
// Request/response model, typed request extensions, the filter chain,
// routing and the hyper-backed server loop.

pub mod application;
pub mod error;
pub mod extensions;
pub mod filter;
pub mod http;
pub mod logging;
pub mod routing;

pub use application::Application;
pub use error::{Error, Result};
pub use extensions::Extensions;
pub use filter::{Filter, FilterChain, HandlerFn, Next, handler};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use routing::{Route, Router};
