//! Identity resolution: which stored vehicle (if any) a candidate belongs to.

mod canonical;
mod resolver;

pub use canonical::CanonicalUrl;
pub use resolver::IdentityResolver;
