mod fallback;
mod static_provider;
mod tmdb;

pub use fallback::*;
pub use static_provider::*;
pub use tmdb::*;
