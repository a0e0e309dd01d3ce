pub mod sentences;
pub mod tokens;
