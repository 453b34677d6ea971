pub mod debug;
pub mod decode;
pub mod error;
pub mod io;
pub mod machine;
pub mod memory;
pub mod program;

pub use error::Fault;
pub use machine::{Machine, Status};
pub use memory::{MemoryChange, MemoryPolicy};
