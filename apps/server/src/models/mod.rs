pub mod generation;

pub use generation::{GenerateRequest, GenerateResponse};
