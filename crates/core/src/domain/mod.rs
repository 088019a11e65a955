pub mod category;
pub mod earnings;
pub mod highlights;
pub mod recommendation;
pub mod snapshot;
