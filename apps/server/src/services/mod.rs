pub mod gemini;
pub mod image;

pub use gemini::{GeminiGenerator, ImageGenerator};
pub use image::{normalize_caption, InlineImage};
