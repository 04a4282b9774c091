mod tokenizer;

pub use tokenizer::{Tokenizer, TRIM_CHARS};
