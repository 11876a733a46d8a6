pub mod types;
pub mod generator;
pub mod loader;
pub mod validator;

pub use types::*;
pub use generator::*;
pub use loader::*;
pub use validator::*;
