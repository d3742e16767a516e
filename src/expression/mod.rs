//! Assembly-time expressions.
//!
//! Expressions are folded eagerly: every constructor computes whether its result is constant and, if so, replaces the
//! whole subtree with a single constant node right away. A tree that survives construction mentions at least one
//! symbol or a relocatable program counter and is kept as-is until link time.

use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use flexstr::SharedStr;
use miette::SourceSpan;

use crate::{AssemblyCode, AssemblyError};

mod operator;
mod parse;

pub use operator::{BinaryOperator, UnaryOperator};
pub use parse::ParseContext;

#[cfg(test)] mod test;

/// Addresses and all other assembly-time integers.
pub type MemoryAddress = i64;

/// The node kinds of an expression tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExpressionKind {
	/// A literal or folded value.
	Constant(MemoryAddress),
	/// A symbol whose value is not known yet.
	SymbolRef(SharedStr),
	/// The program counter in a relocatable section, as an offset from the section start.
	ProgramCounter(MemoryAddress),
	/// A unary operation on a non-constant operand.
	Unary(UnaryOperator, Box<Expression>),
	/// A binary operation where at least one side is non-constant.
	Binary(BinaryOperator, Box<Expression>, Box<Expression>),
	/// `(expr)` as written in the source. Kept even around constants, since operand grammars use parentheses to
	/// signal indirection.
	Parenthesized(Box<Expression>),
}

/// An expression tree with its source location.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Expression {
	kind:     ExpressionKind,
	span:     SourceSpan,
	constant: bool,
}

impl Expression {
	/// A constant value.
	#[must_use]
	pub const fn constant(value: MemoryAddress, span: SourceSpan) -> Self {
		Self { kind: ExpressionKind::Constant(value), span, constant: true }
	}

	/// A reference to a symbol that is not (yet) known to be constant.
	#[must_use]
	pub const fn symbol(name: SharedStr, span: SourceSpan) -> Self {
		Self { kind: ExpressionKind::SymbolRef(name), span, constant: false }
	}

	/// The program counter of a relocatable section.
	#[must_use]
	pub const fn program_counter(offset: MemoryAddress, span: SourceSpan) -> Self {
		Self { kind: ExpressionKind::ProgramCounter(offset), span, constant: false }
	}

	/// Applies a unary operator, folding constant operands.
	#[must_use]
	pub fn unary(operator: UnaryOperator, operand: Self, span: SourceSpan) -> Self {
		match operand.value() {
			Some(value) => Self::constant(operator.execute(value), span),
			None => Self { kind: ExpressionKind::Unary(operator, Box::new(operand)), span, constant: false },
		}
	}

	/// Applies a binary operator, folding constant operands. Returns `None` for a constant division or modulus by
	/// zero; the caller reports it.
	#[must_use]
	pub fn binary(operator: BinaryOperator, lhs: Self, rhs: Self) -> Option<Self> {
		let span = join_spans(lhs.span, rhs.span);
		Some(match (lhs.value(), rhs.value()) {
			(Some(lhs), Some(rhs)) => Self::constant(operator.execute(lhs, rhs)?, span),
			_ => Self { kind: ExpressionKind::Binary(operator, Box::new(lhs), Box::new(rhs)), span, constant: false },
		})
	}

	/// Binary operation with an operator that cannot fail.
	fn infallible(operator: BinaryOperator, lhs: Self, rhs: Self) -> Self {
		debug_assert!(!operator.is_fallible());
		let span = join_spans(lhs.span, rhs.span);
		match (lhs.value(), rhs.value()) {
			(Some(lhs), Some(rhs)) => Self::constant(operator.execute(lhs, rhs).unwrap_or_default(), span),
			_ => Self { kind: ExpressionKind::Binary(operator, Box::new(lhs), Box::new(rhs)), span, constant: false },
		}
	}

	/// Wraps an expression in source-level parentheses.
	#[must_use]
	pub fn parenthesized(inner: Self, span: SourceSpan) -> Self {
		let constant = inner.constant;
		Self { kind: ExpressionKind::Parenthesized(Box::new(inner)), span, constant }
	}

	/// The node kind.
	#[must_use]
	pub const fn kind(&self) -> &ExpressionKind {
		&self.kind
	}

	/// Source location of the whole expression.
	#[must_use]
	pub const fn span(&self) -> SourceSpan {
		self.span
	}

	/// Replaces the source location, e.g. when a program counter expression is copied to where `*` was written.
	#[must_use]
	pub const fn with_span(mut self, span: SourceSpan) -> Self {
		self.span = span;
		self
	}

	/// Whether the value is known at assembly time.
	#[must_use]
	pub const fn is_constant(&self) -> bool {
		self.constant
	}

	/// The folded value, if constant.
	#[must_use]
	pub fn value(&self) -> Option<MemoryAddress> {
		match &self.kind {
			ExpressionKind::Constant(value) => Some(*value),
			ExpressionKind::Parenthesized(inner) if self.constant => inner.value(),
			_ => None,
		}
	}

	/// Whether the outermost node is a source-level parenthesis.
	#[must_use]
	pub const fn is_parenthesized(&self) -> bool {
		matches!(self.kind, ExpressionKind::Parenthesized(..))
	}

	/// Removes one level of source-level parentheses, if present.
	#[must_use]
	pub fn strip_parentheses(self) -> Self {
		match self.kind {
			ExpressionKind::Parenthesized(inner) => *inner,
			_ => self,
		}
	}

	/// Passes the expression through unless it is a constant outside `low..=high`. Non-constant expressions are never
	/// checked here; their range is checked once they are resolved at link time.
	/// # Errors
	/// If the constant value is out of range.
	pub fn check_range(
		self,
		low: MemoryAddress,
		high: MemoryAddress,
		source_code: &Arc<AssemblyCode>,
	) -> Result<Self, Box<AssemblyError>> {
		match self.value() {
			Some(value) if !(low ..= high).contains(&value) => Err(AssemblyError::ValueOutOfRange {
				value,
				low,
				high,
				location: self.span,
				src: source_code.clone(),
			}
			.into()),
			_ => Ok(self),
		}
	}

	/// Keeps only the lowest `bits` bits.
	#[must_use]
	pub fn mask(self, bits: u32) -> Self {
		let mask = if bits >= MemoryAddress::BITS { -1 } else { (1 << bits) - 1 };
		let span = self.span;
		Self::infallible(BinaryOperator::And, self, Self::constant(mask, span))
	}

	/// Shifts left by a positive or right by a negative amount.
	#[must_use]
	pub fn shift(self, amount: i64) -> Self {
		let span = self.span;
		if amount >= 0 {
			Self::infallible(BinaryOperator::LeftShift, self, Self::constant(amount, span))
		} else {
			Self::infallible(BinaryOperator::RightShift, self, Self::constant(amount.wrapping_neg(), span))
		}
	}

	/// `self - (program_counter + adjustment)`, the displacement of a relative branch to this target. Two program
	/// counter offsets in the same relocatable section cancel out to a constant.
	#[must_use]
	pub fn pc_relative(self, program_counter: Self, adjustment: MemoryAddress) -> Self {
		let span = self.span;
		if let (ExpressionKind::ProgramCounter(target), ExpressionKind::ProgramCounter(origin)) =
			(&self.kind, &program_counter.kind)
		{
			return Self::constant(target.wrapping_sub(origin.wrapping_add(adjustment)), span);
		}
		let origin = Self::infallible(BinaryOperator::Add, program_counter, Self::constant(adjustment, span));
		Self::infallible(BinaryOperator::Subtract, self, origin).with_span(span)
	}

	/// `self + offset`, folded.
	#[must_use]
	pub fn offset_by(self, offset: MemoryAddress) -> Self {
		if offset == 0 {
			return self;
		}
		let span = self.span;
		Self::infallible(BinaryOperator::Add, self, Self::constant(offset, span)).with_span(span)
	}

	/// `self | other`, for packing fields into an opcode.
	#[must_use]
	pub fn or(self, other: Self) -> Self {
		let span = self.span;
		Self::infallible(BinaryOperator::Or, self, other).with_span(span)
	}

	/// Evaluates a retained tree at link time. `base` is the load address of the relocatable section, and `symbol`
	/// produces the value of a symbol reference.
	/// # Errors
	/// Whatever the symbol callback reports, and division by zero.
	pub fn evaluate(
		&self,
		base: MemoryAddress,
		source_code: &Arc<AssemblyCode>,
		symbol: &mut impl FnMut(&SharedStr, SourceSpan) -> Result<MemoryAddress, Box<AssemblyError>>,
	) -> Result<MemoryAddress, Box<AssemblyError>> {
		Ok(match &self.kind {
			ExpressionKind::Constant(value) => *value,
			ExpressionKind::SymbolRef(name) => symbol(name, self.span)?,
			ExpressionKind::ProgramCounter(offset) => base.wrapping_add(*offset),
			ExpressionKind::Parenthesized(inner) => inner.evaluate(base, source_code, symbol)?,
			ExpressionKind::Unary(operator, operand) => operator.execute(operand.evaluate(base, source_code, symbol)?),
			ExpressionKind::Binary(operator, lhs, rhs) => {
				let lhs = lhs.evaluate(base, source_code, symbol)?;
				let rhs_value = rhs.evaluate(base, source_code, symbol)?;
				operator.execute(lhs, rhs_value).ok_or_else(|| AssemblyError::DivisionByZero {
					location: rhs.span,
					src:      source_code.clone(),
				})?
			},
		})
	}

	/// All symbol names this expression refers to.
	#[must_use]
	pub fn symbols(&self) -> Vec<&SharedStr> {
		match &self.kind {
			ExpressionKind::Constant(..) | ExpressionKind::ProgramCounter(..) => Vec::new(),
			ExpressionKind::SymbolRef(name) => vec![name],
			ExpressionKind::Parenthesized(inner) | ExpressionKind::Unary(_, inner) => inner.symbols(),
			ExpressionKind::Binary(_, lhs, rhs) => {
				let mut symbols = lhs.symbols();
				symbols.append(&mut rhs.symbols());
				symbols
			},
		}
	}
}

fn join_spans(first: SourceSpan, second: SourceSpan) -> SourceSpan {
	let start = first.offset().min(second.offset());
	let end = (first.offset() + first.len()).max(second.offset() + second.len());
	(start, end - start).into()
}

impl Display for Expression {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match &self.kind {
			ExpressionKind::Constant(value) if *value < 0 => write!(f, "-${:X}", value.unsigned_abs()),
			ExpressionKind::Constant(value) => write!(f, "${value:X}"),
			ExpressionKind::SymbolRef(name) => write!(f, "{name}"),
			ExpressionKind::ProgramCounter(offset) => write!(f, "(*{offset:+})"),
			ExpressionKind::Unary(operator, operand) => write!(f, "{operator}{operand}"),
			ExpressionKind::Binary(operator, lhs, rhs) => write!(f, "({lhs} {operator} {rhs})"),
			ExpressionKind::Parenthesized(inner) => write!(f, "({inner})"),
		}
	}
}
