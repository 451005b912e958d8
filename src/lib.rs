pub mod buffer;
pub mod config;
pub mod edit;
pub mod log;
pub mod mode;
pub mod navigation;
pub mod rope;
pub mod ui;

pub use buffer::{BufferError, BufferId, BufferManager, Cursor, RopeBuffer, SaveOptions};
pub use config::{Cli, Settings};
pub use rope::{Chunk, Rope, Summary};
