mod catalog;
mod config;
mod local;
mod matching;
mod model;
mod store;

pub use catalog::*;
pub use config::*;
pub use local::*;
pub use matching::*;
pub use model::*;
pub use store::*;
