pub mod logger;

pub use logger::{ActionLogger, ActionRecord};
