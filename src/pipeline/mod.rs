pub mod processor;

pub use processor::{run_processor, ProcessorConfig, ProcessorMessage, Stages};
