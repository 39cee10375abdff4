pub mod health;
pub mod documents;
pub mod diagnostics;

pub use health::*;
pub use documents::*;
pub use diagnostics::*;
