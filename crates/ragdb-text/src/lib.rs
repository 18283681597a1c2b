pub mod tantivy_utils;
pub mod tfidf;

pub use tantivy_utils::TermTokenizer;
pub use tfidf::{TfidfVectorizer, Vocabulary};
