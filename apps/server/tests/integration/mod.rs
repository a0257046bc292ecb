//! Integration tests module
//!
//! Exercises the HTTP routes with a fake image generator in place of Gemini.
