pub mod synchronizer;

pub use synchronizer::{DisplayFrame, DisplaySynchronizer};
