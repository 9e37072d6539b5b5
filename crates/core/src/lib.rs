pub mod error;
pub mod format;
pub mod input;
pub mod options;
pub mod types;

pub use error::ConvertError;
pub use input::InputFile;
pub use options::ConversionOptions;
pub use types::{ConversionStatus, JobPhase, OutputKind};
