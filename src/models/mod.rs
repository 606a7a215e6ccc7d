pub mod document;
pub mod enums;
pub mod facts;
pub mod flag;
pub mod report;

pub use document::*;
pub use enums::*;
pub use facts::*;
pub use flag::*;
pub use report::*;
