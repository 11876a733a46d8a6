pub mod types;
pub mod factory;
pub mod declarative;
pub mod loader;
pub mod associate;

pub use types::*;
pub use factory::*;
pub use declarative::*;
pub use loader::*;
pub use associate::*;
