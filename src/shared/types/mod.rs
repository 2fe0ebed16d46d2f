pub mod errors;
pub mod money;
pub mod pagination;

pub use errors::*;
pub use money::*;
pub use pagination::*;
