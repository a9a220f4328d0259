mod ids;
mod movie;
mod room;
mod swipe;

pub use ids::*;
pub use movie::*;
pub use room::*;
pub use swipe::*;
