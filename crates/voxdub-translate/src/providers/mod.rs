//! Concrete translation backends.

pub mod google_web;
pub mod ollama;

pub use google_web::GoogleWebProvider;
pub use ollama::OllamaProvider;
