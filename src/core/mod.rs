pub mod errors;
mod loc;
mod output;

pub use loc::Loc;
pub use output::CaptureOutput;
