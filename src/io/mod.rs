pub use instance::{load_instance, CalibrationInstance};

pub mod instance;
pub mod result_writer;
