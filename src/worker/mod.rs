pub mod rollover_worker;

pub use rollover_worker::RolloverWorker;
