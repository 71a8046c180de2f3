//! Response-stage middleware.
//!
//! Both layers run the inner service first and only act on its `404`.

pub mod broken_links;
pub mod redirect_fallback;

pub use broken_links::log_broken_links;
pub use redirect_fallback::redirect_fallback;
