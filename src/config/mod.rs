pub mod types;
pub mod property_type;
pub mod loader;
pub mod validator;
pub mod resolved;

pub use types::*;
pub use property_type::*;
pub use loader::*;
pub use validator::*;
pub use resolved::*;
