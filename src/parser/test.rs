use std::sync::Arc;

use super::{Token, TokenClass, lex};
use crate::{AssemblyCode, AssemblyError};

fn classes(source: &str) -> Vec<TokenClass> {
	lex(&Arc::new(AssemblyCode::new(source, "<test>"))).unwrap().iter().map(Token::class).collect()
}

fn numbers(source: &str) -> Vec<i64> {
	lex(&Arc::new(AssemblyCode::new(source, "<test>")))
		.unwrap()
		.into_iter()
		.filter_map(|token| match token {
			Token::Number(value, _) => Some(value),
			_ => None,
		})
		.collect()
}

#[test]
fn number_formats() {
	assert_eq!(numbers("%101 $ff 0x10 0b11 12 0FFh 'A' '\\n' 1_000"), vec![
		0b101, 0xff, 0x10, 0b11, 12, 0xff, 65, 10, 1000
	]);
}

#[test]
fn percent_is_modulus_after_values() {
	use TokenClass::{Hash, Identifier, Number, Percent};
	assert_eq!(classes("lda #%10"), vec![Identifier, Hash, Number]);
	assert_eq!(classes("a %10"), vec![Identifier, Percent, Number]);
	assert_eq!(classes("7%10"), vec![Number, Percent, Number]);
}

#[test]
fn dollar_alone_is_program_counter() {
	use TokenClass::{Dollar, Identifier, Minus, Number};
	assert_eq!(classes("jr $-2"), vec![Identifier, Dollar, Minus, Number]);
}

#[test]
fn shifts_and_brackets() {
	use TokenClass::{CloseBracket, Comma, DoubleGreater, DoubleLess, Identifier, Less, Number, OpenBracket};
	assert_eq!(classes("1 << 2 >> 3 <x [zp],z"), vec![
		Number,
		DoubleLess,
		Number,
		DoubleGreater,
		Number,
		Less,
		Identifier,
		OpenBracket,
		Identifier,
		CloseBracket,
		Comma,
		Identifier
	]);
}

#[test]
fn shadow_register_pair() {
	let tokens = lex(&Arc::new(AssemblyCode::new("ex af,AF'", "<test>"))).unwrap();
	assert_eq!(tokens.len(), 4);
	assert_eq!(tokens[3].identifier(), Some("AF'"));
	assert_eq!(tokens[3].source_span(), (6, 3).into());
}

#[test]
fn comments_and_newlines() {
	use TokenClass::{Identifier, Newline};
	assert_eq!(classes("nop ; comment, with: tokens\n rts\n"), vec![Identifier, Newline, Identifier, Newline]);
}

#[test]
fn lexer_errors() {
	let source = Arc::new(AssemblyCode::new("lda @", "<test>"));
	assert!(matches!(*lex(&source).unwrap_err(), AssemblyError::UnexpectedCharacter { chr: '@', .. }));
	let source = Arc::new(AssemblyCode::new(".byte \"open", "<test>"));
	assert!(matches!(*lex(&source).unwrap_err(), AssemblyError::UnexpectedEndOfInput { .. }));
	let source = Arc::new(AssemblyCode::new("12ab", "<test>"));
	assert!(matches!(*lex(&source).unwrap_err(), AssemblyError::InvalidNumber { .. }));
}
