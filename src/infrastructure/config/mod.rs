//! Infrastructure configuration modules.

pub mod connectivity;
pub mod gateway;
pub mod logging;
pub mod pool;
pub mod settings;
pub mod token;
pub mod upstream;
