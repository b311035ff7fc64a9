/// Expression-level mapping from the SQL grammar AST to tokens.
pub mod expr;
/// Identifier normalization helpers (qualified names, quoted identifiers).
pub mod names;
/// Statement-level tokenizer: dialect selection, root dispatch, FROM and JOIN folding.
pub mod tokenizer;

pub use tokenizer::Tokenizer;
