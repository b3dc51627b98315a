//! Concrete synthesis backends.

pub mod cartesia;
pub mod gemini;

pub use cartesia::CartesiaProvider;
pub use gemini::GeminiProvider;
