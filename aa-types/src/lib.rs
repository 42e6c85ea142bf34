pub mod smart_sessions;
pub mod userop;

pub use userop::*;
