//! Built-in provider backends.

pub mod doubao;
pub mod openai;

pub use doubao::DoubaoImageGenerator;
pub use openai::OpenAiImageGenerator;
