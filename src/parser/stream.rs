//! Token cursor with bookmarks, the backbone of backtracking operand parsing.

use super::token::{Token, TokenClass};

/// A saved cursor position. Restoring it undoes every token consumption since it was taken and has no other effect.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct Bookmark(usize);

/// Cursor over the token list of one source file.
#[derive(Debug, Clone)]
pub struct TokenStream {
	tokens:       Vec<Token>,
	position:     usize,
	end_of_input: Token,
}

impl TokenStream {
	/// Creates a stream positioned on the first token. `source_length` places the synthesized end-of-input token.
	#[must_use]
	pub fn new(tokens: Vec<Token>, source_length: usize) -> Self {
		Self { tokens, position: 0, end_of_input: Token::EndOfInput(source_length.into()) }
	}

	/// The current token. Past the end, this is always the end-of-input token.
	#[must_use]
	pub fn peek(&self) -> &Token {
		self.peek_nth(0)
	}

	/// The token `offset` positions after the current one.
	#[must_use]
	pub fn peek_nth(&self, offset: usize) -> &Token {
		self.tokens.get(self.position + offset).unwrap_or(&self.end_of_input)
	}

	/// Consumes and returns the current token. At the end of input, nothing is consumed.
	pub fn advance(&mut self) -> Token {
		let token = self.peek().clone();
		if self.position < self.tokens.len() {
			self.position += 1;
		}
		token
	}

	/// Whether the current token has the given class.
	#[must_use]
	pub fn next_is(&self, class: TokenClass) -> bool {
		self.peek().class() == class
	}

	/// Consumes the current token only if it has the given class.
	pub fn eat(&mut self, class: TokenClass) -> Option<Token> {
		self.next_is(class).then(|| self.advance())
	}

	/// Consumes the current token only if it is an identifier equal to `name`, ignoring ASCII case.
	pub fn eat_identifier(&mut self, name: &str) -> Option<Token> {
		self.peek().identifier().is_some_and(|identifier| identifier.eq_ignore_ascii_case(name)).then(|| self.advance())
	}

	/// Saves the current position.
	#[must_use]
	pub const fn bookmark(&self) -> Bookmark {
		Bookmark(self.position)
	}

	/// Returns to a saved position.
	pub const fn restore(&mut self, bookmark: Bookmark) {
		self.position = bookmark.0;
	}

	/// Runs a parse transactionally: if the closure yields `None`, the cursor is put back where it was.
	pub fn attempt<T>(&mut self, parse: impl FnOnce(&mut Self) -> Option<T>) -> Option<T> {
		let bookmark = self.bookmark();
		let result = parse(self);
		if result.is_none() {
			self.restore(bookmark);
		}
		result
	}

	/// Whether the current token ends an operand.
	#[must_use]
	pub fn at_operand_end(&self) -> bool {
		self.peek().ends_operand()
	}

	/// Whether the current token ends the statement.
	#[must_use]
	pub fn at_statement_end(&self) -> bool {
		matches!(self.peek(), Token::Newline(..) | Token::EndOfInput(..))
	}

	/// Whether all tokens were consumed.
	#[must_use]
	pub fn is_exhausted(&self) -> bool {
		self.position >= self.tokens.len()
	}

	/// Skips the rest of the current statement, stopping before its newline.
	pub fn skip_statement(&mut self) {
		while !self.at_statement_end() {
			self.advance();
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn stream() -> TokenStream {
		TokenStream::new(
			vec![
				Token::Identifier("lda".into(), (0, 3).into()),
				Token::Hash(4.into()),
				Token::Number(1, (5, 1).into()),
				Token::Newline(6.into()),
			],
			7,
		)
	}

	#[test]
	fn attempt_restores_on_failure() {
		let mut stream = stream();
		stream.advance();
		let before = stream.bookmark();
		let result: Option<()> = stream.attempt(|stream| {
			stream.eat(TokenClass::Hash)?;
			stream.eat(TokenClass::Identifier)?;
			Some(())
		});
		assert!(result.is_none());
		assert_eq!(stream.bookmark(), before);
		assert!(stream.attempt(|stream| stream.eat(TokenClass::Hash)).is_some());
		assert!(stream.next_is(TokenClass::Number));
	}

	#[test]
	fn end_of_input_is_sticky() {
		let mut stream = stream();
		for _ in 0 .. 10 {
			stream.advance();
		}
		assert!(stream.is_exhausted());
		assert!(stream.next_is(TokenClass::EndOfInput));
		assert!(stream.at_statement_end());
		assert_eq!(stream.peek().source_span(), (7, 0).into());
	}

	#[test]
	fn identifier_matching_ignores_case() {
		let mut stream = stream();
		assert!(stream.eat_identifier("LDA").is_some());
		assert!(stream.eat_identifier("lda").is_none());
	}
}
