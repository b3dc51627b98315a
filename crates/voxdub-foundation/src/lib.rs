pub mod clock;
pub mod error;
pub mod lang;
pub mod shutdown;

pub use clock::*;
pub use error::*;
pub use lang::*;
pub use shutdown::*;
