mod principal;
pub use principal::*;
