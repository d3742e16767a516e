//! The Token struct.

use std::fmt::Display;

use flexstr::SharedStr;
use miette::{SourceOffset, SourceSpan};

/// Assembly language tokens. The tokenizer is shared by all back ends, so register names and mnemonics arrive as
/// plain identifiers and are classified by the back end that consumes them.
#[derive(Debug, Clone)]
pub enum Token {
	/// Identifier: a mnemonic, register, directive name or symbol.
	Identifier(SharedStr, SourceSpan),
	/// Literal number which was already parsed.
	Number(i64, SourceSpan),
	/// Text string delimited by "".
	String(Vec<u8>, SourceSpan),
	/// '#'
	Hash(SourceOffset),
	/// ','
	Comma(SourceOffset),
	/// '+'
	Plus(SourceOffset),
	/// '-'
	Minus(SourceOffset),
	/// '*'
	Star(SourceOffset),
	/// '/'
	Slash(SourceOffset),
	/// '%' when it is not the start of a binary number.
	Percent(SourceOffset),
	/// '&'
	Ampersand(SourceOffset),
	/// '|'
	Pipe(SourceOffset),
	/// '^'
	Caret(SourceOffset),
	/// '~'
	Tilde(SourceOffset),
	/// '<'
	Less(SourceOffset),
	/// '>'
	Greater(SourceOffset),
	/// '<<'
	DoubleLess(SourceOffset),
	/// '>>'
	DoubleGreater(SourceOffset),
	/// '('
	OpenParenthesis(SourceOffset),
	/// ')'
	CloseParenthesis(SourceOffset),
	/// '['
	OpenBracket(SourceOffset),
	/// ']'
	CloseBracket(SourceOffset),
	/// ':'
	Colon(SourceOffset),
	/// '='
	Equals(SourceOffset),
	/// '.'
	Period(SourceOffset),
	/// '$' when it is not the start of a hexadecimal number; the program counter.
	Dollar(SourceOffset),
	/// ASCII newline (\n).
	Newline(SourceOffset),
	/// Synthesized by the token stream once all tokens are consumed.
	EndOfInput(SourceOffset),
}

/// Numeric token class. Parsing code compares classes, never payloads, when it only needs the kind of a token.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum TokenClass {
	Identifier = 1,
	Number,
	String,
	Hash,
	Comma,
	Plus,
	Minus,
	Star,
	Slash,
	Percent,
	Ampersand,
	Pipe,
	Caret,
	Tilde,
	Less,
	Greater,
	DoubleLess,
	DoubleGreater,
	OpenParenthesis,
	CloseParenthesis,
	OpenBracket,
	CloseBracket,
	Colon,
	Equals,
	Period,
	Dollar,
	Newline,
	EndOfInput,
}

impl Token {
	/// The numeric class of this token.
	#[must_use]
	pub const fn class(&self) -> TokenClass {
		match self {
			Self::Identifier(..) => TokenClass::Identifier,
			Self::Number(..) => TokenClass::Number,
			Self::String(..) => TokenClass::String,
			Self::Hash(..) => TokenClass::Hash,
			Self::Comma(..) => TokenClass::Comma,
			Self::Plus(..) => TokenClass::Plus,
			Self::Minus(..) => TokenClass::Minus,
			Self::Star(..) => TokenClass::Star,
			Self::Slash(..) => TokenClass::Slash,
			Self::Percent(..) => TokenClass::Percent,
			Self::Ampersand(..) => TokenClass::Ampersand,
			Self::Pipe(..) => TokenClass::Pipe,
			Self::Caret(..) => TokenClass::Caret,
			Self::Tilde(..) => TokenClass::Tilde,
			Self::Less(..) => TokenClass::Less,
			Self::Greater(..) => TokenClass::Greater,
			Self::DoubleLess(..) => TokenClass::DoubleLess,
			Self::DoubleGreater(..) => TokenClass::DoubleGreater,
			Self::OpenParenthesis(..) => TokenClass::OpenParenthesis,
			Self::CloseParenthesis(..) => TokenClass::CloseParenthesis,
			Self::OpenBracket(..) => TokenClass::OpenBracket,
			Self::CloseBracket(..) => TokenClass::CloseBracket,
			Self::Colon(..) => TokenClass::Colon,
			Self::Equals(..) => TokenClass::Equals,
			Self::Period(..) => TokenClass::Period,
			Self::Dollar(..) => TokenClass::Dollar,
			Self::Newline(..) => TokenClass::Newline,
			Self::EndOfInput(..) => TokenClass::EndOfInput,
		}
	}

	/// Returns the source span where this token is located in the file.
	#[must_use]
	pub fn source_span(&self) -> SourceSpan {
		match self {
			Self::Identifier(_, span) | Self::Number(_, span) | Self::String(_, span) => *span,
			Self::DoubleLess(location) | Self::DoubleGreater(location) => (location.offset(), 2).into(),
			Self::EndOfInput(location) => (location.offset(), 0).into(),
			Self::Hash(location)
			| Self::Comma(location)
			| Self::Plus(location)
			| Self::Minus(location)
			| Self::Star(location)
			| Self::Slash(location)
			| Self::Percent(location)
			| Self::Ampersand(location)
			| Self::Pipe(location)
			| Self::Caret(location)
			| Self::Tilde(location)
			| Self::Less(location)
			| Self::Greater(location)
			| Self::OpenParenthesis(location)
			| Self::CloseParenthesis(location)
			| Self::OpenBracket(location)
			| Self::CloseBracket(location)
			| Self::Colon(location)
			| Self::Equals(location)
			| Self::Period(location)
			| Self::Dollar(location)
			| Self::Newline(location) => (location.offset(), 1).into(),
		}
	}

	/// If this token is an identifier, its text.
	#[must_use]
	pub fn identifier(&self) -> Option<&str> {
		match self {
			Self::Identifier(name, _) => Some(&**name),
			_ => None,
		}
	}

	/// Whether this token ends an operand: a comma separating operands, or the end of the statement.
	#[must_use]
	pub const fn ends_operand(&self) -> bool {
		matches!(self, Self::Comma(..) | Self::Newline(..) | Self::EndOfInput(..))
	}

	/// Whether a binary number or modulus operator may follow this token. After anything that ends an operand value,
	/// '%' is the modulus operator.
	#[must_use]
	pub const fn ends_value(&self) -> bool {
		matches!(
			self,
			Self::Identifier(..)
				| Self::Number(..)
				| Self::String(..)
				| Self::CloseParenthesis(..)
				| Self::CloseBracket(..)
				| Self::Dollar(..)
		)
	}
}

impl Display for TokenClass {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.pad(match self {
			Self::Identifier => "identifier",
			Self::Number => "number",
			Self::String => "string",
			Self::Hash => "'#'",
			Self::Comma => "','",
			Self::Plus => "'+'",
			Self::Minus => "'-'",
			Self::Star => "'*'",
			Self::Slash => "'/'",
			Self::Percent => "'%'",
			Self::Ampersand => "'&'",
			Self::Pipe => "'|'",
			Self::Caret => "'^'",
			Self::Tilde => "'~'",
			Self::Less => "'<'",
			Self::Greater => "'>'",
			Self::DoubleLess => "'<<'",
			Self::DoubleGreater => "'>>'",
			Self::OpenParenthesis => "'('",
			Self::CloseParenthesis => "')'",
			Self::OpenBracket => "'['",
			Self::CloseBracket => "']'",
			Self::Colon => "':'",
			Self::Equals => "'='",
			Self::Period => "'.'",
			Self::Dollar => "'$'",
			Self::Newline => "new line",
			Self::EndOfInput => "end of input",
		})
	}
}

impl Display for Token {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Identifier(name, _) => write!(f, "identifier `{name}`"),
			Self::Number(value, _) => write!(f, "number {value}"),
			_ => self.class().fmt(f),
		}
	}
}
