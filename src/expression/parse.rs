//! Precedence-climbing expression parser.

use std::sync::Arc;

use super::{BinaryOperator, Expression, UnaryOperator};
use crate::parser::{Token, TokenClass, TokenStream};
use crate::symbols::{SymbolTable, SymbolValue};
use crate::{AssemblyCode, AssemblyError};

/// Everything an operand parse needs besides the token stream: symbol values for folding, the program counter at the
/// start of the statement, and a place to put diagnostics that arise during speculative parsing.
#[derive(Debug)]
pub struct ParseContext<'a> {
	/// Symbols defined so far.
	pub symbols:         &'a SymbolTable,
	/// Value of `*` and `$` in this statement.
	pub program_counter: Expression,
	/// For diagnostics.
	pub source_code:     &'a Arc<AssemblyCode>,
	/// Identifiers that are never symbols, such as register names of the active back end.
	pub reserved:        fn(&str) -> bool,
	/// Diagnostics raised while parsing. Any entry here fails the statement even if a later attempt succeeds.
	pub errors:          Vec<AssemblyError>,
}

impl<'a> ParseContext<'a> {
	/// Creates a context without diagnostics.
	#[must_use]
	pub const fn new(
		symbols: &'a SymbolTable,
		program_counter: Expression,
		source_code: &'a Arc<AssemblyCode>,
		reserved: fn(&str) -> bool,
	) -> Self {
		Self { symbols, program_counter, source_code, reserved, errors: Vec::new() }
	}

	/// Parses an expression whose binary operators all bind at least as tightly as `min_precedence`. On failure,
	/// nothing is consumed.
	pub fn parse_expression(&mut self, stream: &mut TokenStream, min_precedence: u8) -> Option<Expression> {
		stream.attempt(|stream| {
			let mut lhs = self.parse_unary(stream)?;
			while let Some(operator) = BinaryOperator::from_token(stream.peek())
				&& operator.precedence() >= min_precedence
			{
				let before_operator = stream.bookmark();
				let operator_span = stream.advance().source_span();
				let Some(rhs) = self.parse_expression(stream, operator.precedence() + 1) else {
					// Leave the operator for the caller; an operand grammar may give it another meaning.
					stream.restore(before_operator);
					break;
				};
				lhs = if let Some(result) = Expression::binary(operator, lhs, rhs) {
					result
				} else {
					self.errors.push(AssemblyError::DivisionByZero {
						location: operator_span,
						src:      self.source_code.clone(),
					});
					return None;
				};
			}
			Some(lhs)
		})
	}

	fn parse_unary(&mut self, stream: &mut TokenStream) -> Option<Expression> {
		if stream.next_is(TokenClass::Plus) {
			return stream.attempt(|stream| {
				stream.advance();
				self.parse_unary(stream)
			});
		}
		let Some(operator) = UnaryOperator::from_token(stream.peek()) else {
			return self.parse_primary(stream);
		};
		stream.attempt(|stream| {
			let start = stream.advance().source_span().offset();
			let operand = self.parse_unary(stream)?;
			let end = operand.span().offset() + operand.span().len();
			Some(Expression::unary(operator, operand, (start, end - start).into()))
		})
	}

	fn parse_primary(&mut self, stream: &mut TokenStream) -> Option<Expression> {
		match stream.peek().clone() {
			Token::Number(value, span) => {
				stream.advance();
				Some(Expression::constant(value, span))
			},
			Token::Identifier(name, span) => {
				if (self.reserved)(&name) {
					return None;
				}
				stream.advance();
				Some(match self.symbols.lookup(&name) {
					SymbolValue::Constant(value) => Expression::constant(value, span),
					SymbolValue::Deferred | SymbolValue::Undefined => Expression::symbol(name, span),
				})
			},
			Token::Star(..) | Token::Dollar(..) => {
				let span = stream.advance().source_span();
				Some(self.program_counter.clone().with_span(span))
			},
			Token::OpenParenthesis(open) => stream.attempt(|stream| {
				stream.advance();
				let inner = self.parse_expression(stream, 0)?;
				let close = stream.eat(TokenClass::CloseParenthesis)?.source_span();
				let span = (open.offset(), close.offset() + 1 - open.offset()).into();
				Some(Expression::parenthesized(inner, span))
			}),
			_ => None,
		}
	}
}
