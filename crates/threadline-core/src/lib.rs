pub mod concepts;
pub mod config;
pub mod digest;
pub mod error;
pub mod generator;
pub mod pipeline;
pub mod prompts;
pub mod response;
pub mod retry;
pub mod sanitize;
pub mod threads;
pub mod timestamp;
pub mod window;

pub use concepts::*;
pub use config::*;
pub use digest::*;
pub use error::*;
pub use generator::*;
pub use pipeline::*;
pub use prompts::*;
pub use response::*;
pub use retry::*;
pub use sanitize::*;
pub use threads::*;
pub use window::*;
