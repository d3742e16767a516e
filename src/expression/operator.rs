//! Operators for assembly-time calculations.

use std::fmt::{self, Display, Formatter};

use super::MemoryAddress;
use crate::parser::Token;

/// Unary operators for assembly time calculations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOperator {
	/// -expr
	Negate,
	/// ~expr
	Not,
	/// <expr, the low byte.
	LowByte,
	/// >expr, the high byte of the low word.
	HighByte,
}

impl UnaryOperator {
	/// Run the math operation this operator represents.
	#[must_use]
	pub const fn execute(self, value: MemoryAddress) -> MemoryAddress {
		match self {
			Self::Negate => value.wrapping_neg(),
			Self::Not => !value,
			Self::LowByte => value & 0xff,
			Self::HighByte => (value >> 8) & 0xff,
		}
	}

	/// The operator a token stands for in prefix position.
	#[must_use]
	pub const fn from_token(token: &Token) -> Option<Self> {
		match token {
			Token::Minus(..) => Some(Self::Negate),
			Token::Tilde(..) => Some(Self::Not),
			Token::Less(..) => Some(Self::LowByte),
			Token::Greater(..) => Some(Self::HighByte),
			_ => None,
		}
	}
}

impl Display for UnaryOperator {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "{}", match self {
			Self::Negate => '-',
			Self::Not => '~',
			Self::LowByte => '<',
			Self::HighByte => '>',
		})
	}
}

/// The kinds of binary operators supported for assembly-time calculations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOperator {
	/// expr + expr
	Add,
	/// expr - expr
	Subtract,
	/// expr * expr
	Multiply,
	/// expr / expr
	Divide,
	/// expr % expr
	Modulus,
	/// expr << expr
	LeftShift,
	/// expr >> expr
	RightShift,
	/// expr & expr
	And,
	/// expr | expr
	Or,
	/// expr ^ expr
	Xor,
}

impl BinaryOperator {
	/// Run the math operation this binary operator represents. Arithmetic wraps around in 64 bits. Division and
	/// modulus by zero have no result; shift counts outside 0..=63 shift everything out.
	#[must_use]
	pub fn execute(self, lhs: MemoryAddress, rhs: MemoryAddress) -> Option<MemoryAddress> {
		let shift_amount = u32::try_from(rhs).ok().filter(|amount| *amount < MemoryAddress::BITS);
		Some(match self {
			Self::Add => lhs.wrapping_add(rhs),
			Self::Subtract => lhs.wrapping_sub(rhs),
			Self::Multiply => lhs.wrapping_mul(rhs),
			Self::Divide if rhs == 0 => return None,
			Self::Divide => lhs.wrapping_div(rhs),
			Self::Modulus if rhs == 0 => return None,
			Self::Modulus => lhs.wrapping_rem(rhs),
			Self::LeftShift => shift_amount.map_or(0, |amount| lhs << amount),
			Self::RightShift => shift_amount.map_or(if lhs < 0 { -1 } else { 0 }, |amount| lhs >> amount),
			Self::And => lhs & rhs,
			Self::Or => lhs | rhs,
			Self::Xor => lhs ^ rhs,
		})
	}

	/// Binding strength; higher binds tighter. All binary operators are left-associative.
	#[must_use]
	pub const fn precedence(self) -> u8 {
		match self {
			Self::Or => 1,
			Self::Xor => 2,
			Self::And => 3,
			Self::LeftShift | Self::RightShift => 4,
			Self::Add | Self::Subtract => 5,
			Self::Multiply | Self::Divide | Self::Modulus => 6,
		}
	}

	/// The operator a token stands for in infix position.
	#[must_use]
	pub const fn from_token(token: &Token) -> Option<Self> {
		match token {
			Token::Plus(..) => Some(Self::Add),
			Token::Minus(..) => Some(Self::Subtract),
			Token::Star(..) => Some(Self::Multiply),
			Token::Slash(..) => Some(Self::Divide),
			Token::Percent(..) => Some(Self::Modulus),
			Token::DoubleLess(..) => Some(Self::LeftShift),
			Token::DoubleGreater(..) => Some(Self::RightShift),
			Token::Ampersand(..) => Some(Self::And),
			Token::Pipe(..) => Some(Self::Or),
			Token::Caret(..) => Some(Self::Xor),
			_ => None,
		}
	}

	/// Whether this operator can fail at evaluation time.
	#[must_use]
	pub const fn is_fallible(self) -> bool {
		matches!(self, Self::Divide | Self::Modulus)
	}
}

impl Display for BinaryOperator {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "{}", match self {
			Self::Add => "+",
			Self::Subtract => "-",
			Self::Multiply => "*",
			Self::Divide => "/",
			Self::Modulus => "%",
			Self::LeftShift => "<<",
			Self::RightShift => ">>",
			Self::And => "&",
			Self::Or => "|",
			Self::Xor => "^",
		})
	}
}
