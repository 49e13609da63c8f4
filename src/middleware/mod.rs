//! Middleware module
//!
//! Request extractors and layers shared by every API route

pub mod auth;
pub mod language;
pub mod logging;
pub mod rate_limit;

// Re-export commonly used middleware
pub use auth::MaybePrincipal;
pub use language::RequestLanguage;
pub use logging::http_trace_layer;
pub use rate_limit::RateLimitMiddleware;
