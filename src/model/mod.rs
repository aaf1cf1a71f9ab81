pub mod config;
pub mod modifier;
pub mod task;

pub use config::*;
pub use modifier::*;
pub use task::*;
