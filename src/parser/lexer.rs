//! Lexing.

use std::iter::Peekable;
use std::str::CharIndices;
use std::sync::Arc;

use flexstr::SharedStr;
use miette::SourceOffset;

use super::token::Token;
use crate::error::{AssemblyCode, AssemblyError};

/// Lex the given assembly into a list of tokens.
/// # Errors
/// Errors are returned for any syntactical error at the token level, e.g. invalid number literals.
pub fn lex(source_code: &Arc<AssemblyCode>) -> Result<Vec<Token>, Box<AssemblyError>> {
	let text = source_code.text.as_str();
	let mut chars = text.char_indices().peekable();
	let mut tokens: Vec<Token> = Vec::new();

	while let Some((index, chr)) = chars.next() {
		match chr {
			'\n' => tokens.push(Token::Newline(index.into())),
			// \r is treated as white space and ignored.
			_ if chr.is_whitespace() => {},
			';' =>
				while chars.peek().is_some_and(|(_, chr)| *chr != '\n') {
					chars.next();
				},
			'"' => {
				let (text, end) = next_string(&mut chars, index, source_code)?;
				tokens.push(Token::String(text, (index, end - index).into()));
			},
			'\'' => {
				let (value, end) = next_character_literal(&mut chars, index, source_code)?;
				tokens.push(Token::Number(value, (index, end - index).into()));
			},
			'A' ..= 'Z' | 'a' ..= 'z' | '_' => {
				let mut end = consume_while(&mut chars, index + chr.len_utf8(), |chr| {
					chr.is_ascii_alphanumeric() || chr == '_'
				});
				// The shadow register pair of the Z80 is the only identifier with a quote.
				if text[index .. end].eq_ignore_ascii_case("af") && chars.peek().is_some_and(|(_, chr)| *chr == '\'') {
					chars.next();
					end += 1;
				}
				let identifier: SharedStr = text[index .. end].into();
				tokens.push(Token::Identifier(identifier, (index, end - index).into()));
			},
			'0' ..= '9' => {
				let end = consume_while(&mut chars, index + 1, |chr| chr.is_ascii_alphanumeric() || chr == '_');
				let value = parse_number_literal(&text[index .. end], index, source_code)?;
				tokens.push(Token::Number(value, (index, end - index).into()));
			},
			'$' if chars.peek().is_some_and(|(_, chr)| chr.is_ascii_hexdigit()) => {
				let end = consume_while(&mut chars, index + 1, |chr| chr.is_ascii_hexdigit());
				let value = parse_radix(&text[index + 1 .. end], 16, index, source_code)?;
				tokens.push(Token::Number(value, (index, end - index).into()));
			},
			'%' if !tokens.last().is_some_and(Token::ends_value)
				&& chars.peek().is_some_and(|(_, chr)| matches!(chr, '0' | '1')) =>
			{
				let end = consume_while(&mut chars, index + 1, |chr| matches!(chr, '0' | '1'));
				let value = parse_radix(&text[index + 1 .. end], 2, index, source_code)?;
				tokens.push(Token::Number(value, (index, end - index).into()));
			},
			'<' if chars.peek().is_some_and(|(_, chr)| *chr == '<') => {
				chars.next();
				tokens.push(Token::DoubleLess(index.into()));
			},
			'>' if chars.peek().is_some_and(|(_, chr)| *chr == '>') => {
				chars.next();
				tokens.push(Token::DoubleGreater(index.into()));
			},
			'#' | ',' | '+' | '-' | '*' | '/' | '%' | '&' | '|' | '^' | '~' | '<' | '>' | '(' | ')' | '[' | ']'
			| ':' | '=' | '.' | '$' => tokens.push(parse_single_char_tokens(chr, index.into())),
			_ =>
				return Err(AssemblyError::UnexpectedCharacter {
					chr,
					location: (index, chr.len_utf8()).into(),
					src: source_code.clone(),
				}
				.into()),
		}
	}

	Ok(tokens)
}

/// Advances over all characters matching the predicate and returns the byte index after the last consumed one.
fn consume_while(chars: &mut Peekable<CharIndices>, mut end: usize, predicate: impl Fn(char) -> bool) -> usize {
	while let Some((index, chr)) = chars.peek().copied()
		&& predicate(chr)
	{
		chars.next();
		end = index + chr.len_utf8();
	}
	end
}

fn parse_radix(
	digits: &str,
	radix: u32,
	start_index: usize,
	source_code: &Arc<AssemblyCode>,
) -> Result<i64, Box<AssemblyError>> {
	i64::from_str_radix(digits, radix).map_err(|error| {
		AssemblyError::InvalidNumber {
			error,
			location: (start_index, digits.len() + 1).into(),
			src: source_code.clone(),
		}
		.into()
	})
}

/// Number literals starting with a digit: `0x1F`, `0b101`, `1Fh` and plain decimal. Underscores are digit
/// separators.
fn parse_number_literal(
	literal: &str,
	start_index: usize,
	source_code: &Arc<AssemblyCode>,
) -> Result<i64, Box<AssemblyError>> {
	let literal = literal.to_ascii_lowercase().replace('_', "");
	let (digits, radix) = if let Some(hex) = literal.strip_prefix("0x") {
		(hex, 16)
	} else if let Some(hex) = literal.strip_suffix('h')
		&& !hex.is_empty()
		&& hex.chars().all(|chr| chr.is_ascii_hexdigit())
	{
		(hex, 16)
	} else if let Some(binary) = literal.strip_prefix("0b") {
		(binary, 2)
	} else {
		(literal.as_str(), 10)
	};
	i64::from_str_radix(digits, radix).map_err(|error| {
		AssemblyError::InvalidNumber {
			error,
			location: (start_index, literal.len()).into(),
			src: source_code.clone(),
		}
		.into()
	})
}

fn next_string(
	chars: &mut Peekable<CharIndices>,
	start_index: usize,
	source_code: &Arc<AssemblyCode>,
) -> Result<(Vec<u8>, usize), Box<AssemblyError>> {
	let mut text = Vec::new();
	while let Some((index, chr)) = chars.next() {
		match chr {
			'"' => return Ok((text, index + 1)),
			'\\' => text.push(next_escape_sequence(chars, source_code)?),
			_ => {
				let mut buffer = [0; 4];
				text.extend_from_slice(chr.encode_utf8(&mut buffer).as_bytes());
			},
		}
	}
	Err(AssemblyError::UnexpectedEndOfInput {
		expected: "'\"'".into(),
		location: (start_index, source_code.text.len() - start_index).into(),
		src:      source_code.clone(),
	}
	.into())
}

fn next_character_literal(
	chars: &mut Peekable<CharIndices>,
	start_index: usize,
	source_code: &Arc<AssemblyCode>,
) -> Result<(i64, usize), Box<AssemblyError>> {
	let unterminated = || -> Box<AssemblyError> {
		AssemblyError::UnexpectedEndOfInput {
			expected: "character literal".into(),
			location: (start_index, source_code.text.len() - start_index).into(),
			src:      source_code.clone(),
		}
		.into()
	};
	let value = match chars.next() {
		Some((_, '\\')) => next_escape_sequence(chars, source_code)?.into(),
		Some((_, chr)) => i64::from(u32::from(chr)),
		None => return Err(unterminated()),
	};
	match chars.next() {
		Some((index, '\'')) => Ok((value, index + 1)),
		Some((index, chr)) => Err(AssemblyError::ExpectedToken {
			expected: "closing quote".into(),
			actual:   chr.to_string(),
			location: (index, chr.len_utf8()).into(),
			src:      source_code.clone(),
		}
		.into()),
		None => Err(unterminated()),
	}
}

/// Used for parsing escape sequences both in string and character literals.
fn next_escape_sequence(
	chars: &mut Peekable<CharIndices>,
	source_code: &Arc<AssemblyCode>,
) -> Result<u8, Box<AssemblyError>> {
	match chars.next() {
		Some((_, chr @ ('"' | '\'' | '\\'))) => Ok(chr as u8),
		Some((_, 'n')) => Ok(b'\n'),
		Some((_, 'r')) => Ok(b'\r'),
		Some((_, 't')) => Ok(b'\t'),
		Some((_, '0')) => Ok(0),
		Some((index, chr)) => Err(AssemblyError::ExpectedToken {
			expected: "one of the escape characters ' \" \\ n r t 0".into(),
			actual:   chr.to_string(),
			location: (index, chr.len_utf8()).into(),
			src:      source_code.clone(),
		}
		.into()),
		None => Err(AssemblyError::UnexpectedEndOfInput {
			expected: "escape sequence".into(),
			location: (source_code.text.len().saturating_sub(1), 0).into(),
			src:      source_code.clone(),
		}
		.into()),
	}
}

fn parse_single_char_tokens(chr: char, location: SourceOffset) -> Token {
	match chr {
		'#' => Token::Hash(location),
		',' => Token::Comma(location),
		'+' => Token::Plus(location),
		'-' => Token::Minus(location),
		'*' => Token::Star(location),
		'/' => Token::Slash(location),
		'%' => Token::Percent(location),
		'&' => Token::Ampersand(location),
		'|' => Token::Pipe(location),
		'^' => Token::Caret(location),
		'~' => Token::Tilde(location),
		'<' => Token::Less(location),
		'>' => Token::Greater(location),
		'(' => Token::OpenParenthesis(location),
		')' => Token::CloseParenthesis(location),
		'[' => Token::OpenBracket(location),
		']' => Token::CloseBracket(location),
		':' => Token::Colon(location),
		'=' => Token::Equals(location),
		'.' => Token::Period(location),
		'$' => Token::Dollar(location),
		_ => unreachable!(),
	}
}
