mod catalog;
mod local;
mod stores;

pub use catalog::*;
pub use local::*;
pub use stores::*;
