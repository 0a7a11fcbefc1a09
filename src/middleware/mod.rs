/// Middleware module
///
/// Session resolution for every request and the identity extractor used by
/// protected handlers.

mod identity;
mod session_middleware;

pub use session_middleware::SessionMiddleware;
