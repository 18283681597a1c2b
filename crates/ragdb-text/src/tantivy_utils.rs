use tantivy::tokenizer::{LowerCaser, SimpleTokenizer, TextAnalyzer, TokenStream};

/// Lower-cased alphanumeric runs; every other character is a boundary.
///
/// The same analyzer must feed both vocabulary fitting and query
/// vectorization, otherwise cosine scores are meaningless.
#[derive(Clone)]
pub struct TermTokenizer {
	analyzer: TextAnalyzer,
}

impl Default for TermTokenizer {
	fn default() -> Self {
		let analyzer = TextAnalyzer::builder(SimpleTokenizer::default()).filter(LowerCaser).build();
		Self { analyzer }
	}
}

impl std::fmt::Debug for TermTokenizer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str("TermTokenizer(simple+lowercase)")
	}
}

impl TermTokenizer {
	pub fn tokenize(&self, text: &str) -> Vec<String> {
		let mut analyzer = self.analyzer.clone();
		let mut stream = analyzer.token_stream(text);
		let mut terms = Vec::new();
		while stream.advance() {
			terms.push(stream.token().text.clone());
		}
		terms
	}
}
