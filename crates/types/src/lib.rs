pub mod agreement;
pub mod order;
pub mod submission;

pub use agreement::*;
pub use order::*;
pub use submission::*;
