//! Z80 operand syntax.

use miette::SourceSpan;

use super::Mode;
use crate::addressing_mode::AddressingMode;
use crate::expression::{Expression, ParseContext};
use crate::parser::{TokenClass, TokenStream};

/// Register codes as they appear in opcodes.
pub(super) const B: u8 = 0;
pub(super) const C: u8 = 1;
pub(super) const D: u8 = 2;
pub(super) const E: u8 = 3;
pub(super) const A: u8 = 7;
/// `(HL)` in the 8-bit register field.
pub(super) const HL_INDIRECT: u8 = 6;

pub(super) const BC: u8 = 0;
pub(super) const DE: u8 = 1;
pub(super) const HL: u8 = 2;
pub(super) const SP: u8 = 3;

const REGISTERS: &[(&str, u8)] = &[("b", B), ("c", C), ("d", D), ("e", E), ("h", 4), ("l", 5), ("a", A)];
const PAIRS: &[(&str, u8)] = &[("bc", BC), ("de", DE), ("hl", HL), ("sp", SP)];
const INDEX_REGISTERS: &[(&str, u8)] = &[("ix", 0), ("iy", 1)];
const SPECIAL_REGISTERS: &[(&str, u8)] = &[("i", 0), ("r", 1)];
const CONDITIONS: &[(&str, u8)] = &[
	("nz", 0),
	("z", 1),
	("nc", 2),
	("c", 3),
	("po", 4),
	("pe", 5),
	("p", 6),
	("m", 7),
	("ne", 0),
	("eq", 1),
	("cc", 2),
	("cs", 3),
	("vc", 4),
	("vs", 5),
	("pl", 6),
	("mi", 7),
];

fn find(names: &[(&str, u8)], name: &str) -> Option<u8> {
	names.iter().find(|(candidate, _)| name.eq_ignore_ascii_case(candidate)).map(|(_, code)| *code)
}

pub(super) fn is_register_or_condition(name: &str) -> bool {
	[REGISTERS, PAIRS, INDEX_REGISTERS, SPECIAL_REGISTERS, CONDITIONS].into_iter().any(|names| find(names, name).is_some())
		|| name.eq_ignore_ascii_case("af")
		|| name.eq_ignore_ascii_case("af'")
}

pub(super) fn match_syntax(
	stream: &mut TokenStream,
	context: &mut ParseContext<'_>,
	allowed: Mode,
) -> Option<AddressingMode<Mode>> {
	let span = stream.peek().source_span();
	if stream.at_operand_end() {
		return allowed.contains(Mode::NONE).then(|| AddressingMode::new(Mode::NONE, span));
	}
	if let Some(register) = stream.attempt(|stream| named(stream, allowed)) {
		return Some(register);
	}
	if stream.next_is(TokenClass::OpenParenthesis) {
		if let Some(indirect) = stream.attempt(|stream| register_indirect(stream)) {
			return Some(indirect);
		}
		if allowed.contains(Mode::INDEXED)
			&& let Some(indexed) = stream.attempt(|stream| indexed(stream, context))
		{
			return Some(indexed);
		}
		if allowed.intersects(Mode::MEMORY | Mode::PORT)
			&& let Some(memory) = stream.attempt(|stream| memory(stream, context, allowed))
		{
			return Some(memory);
		}
	}
	let value = context.parse_expression(stream, 0)?;
	let mode = if allowed.contains(Mode::ADDRESS) {
		Mode::ADDRESS
	} else if allowed.contains(Mode::RELATIVE) {
		Mode::RELATIVE
	} else {
		Mode::IMMEDIATE
	};
	let span = value.span();
	Some(AddressingMode::with_value(mode, value, span))
}

/// Register, register pair and condition names. `C` is the register where a register is allowed and the condition
/// otherwise.
fn named(stream: &mut TokenStream, allowed: Mode) -> Option<AddressingMode<Mode>> {
	let token = stream.advance();
	let name = token.identifier()?;
	let span = token.source_span();
	if !stream.at_operand_end() {
		return None;
	}
	let register = |mode: Mode, names: &[(&str, u8)]| {
		allowed.contains(mode).then(|| find(names, name)).flatten().map(|code| AddressingMode::with_register(mode, code, span))
	};
	register(Mode::REGISTER, REGISTERS)
		.or_else(|| register(Mode::CONDITION, CONDITIONS))
		.or_else(|| register(Mode::PAIR, PAIRS))
		.or_else(|| register(Mode::INDEX, INDEX_REGISTERS))
		.or_else(|| register(Mode::SPECIAL, SPECIAL_REGISTERS))
		.or_else(|| name.eq_ignore_ascii_case("af").then(|| AddressingMode::new(Mode::ACCUMULATOR_FLAGS, span)))
		.or_else(|| name.eq_ignore_ascii_case("af'").then(|| AddressingMode::new(Mode::ALTERNATE_FLAGS, span)))
		// Whatever the slot allows, a register name is a register; the encoder reports the mode mismatch.
		.or_else(|| find(REGISTERS, name).map(|code| AddressingMode::with_register(Mode::REGISTER, code, span)))
		.or_else(|| find(PAIRS, name).map(|code| AddressingMode::with_register(Mode::PAIR, code, span)))
}

/// `(BC)`, `(DE)`, `(HL)`, `(SP)` and `(C)`.
fn register_indirect(stream: &mut TokenStream) -> Option<AddressingMode<Mode>> {
	let open = stream.eat(TokenClass::OpenParenthesis)?.source_span();
	let token = stream.advance();
	let name = token.identifier()?;
	let close = stream.eat(TokenClass::CloseParenthesis)?.source_span();
	if !stream.at_operand_end() {
		return None;
	}
	let span = join(open, close);
	if name.eq_ignore_ascii_case("c") {
		return Some(AddressingMode::new(Mode::PORT_C, span));
	}
	find(PAIRS, name).map(|pair| AddressingMode::with_register(Mode::REGISTER_INDIRECT, pair, span))
}

/// `(IX)`, `(IX+d)` and `(IX-d)`; likewise for IY.
fn indexed(stream: &mut TokenStream, context: &mut ParseContext<'_>) -> Option<AddressingMode<Mode>> {
	let open = stream.eat(TokenClass::OpenParenthesis)?.source_span();
	let token = stream.advance();
	let index = find(INDEX_REGISTERS, token.identifier()?)?;
	let displacement = if stream.next_is(TokenClass::CloseParenthesis) {
		Expression::constant(0, token.source_span())
	} else if stream.eat(TokenClass::Plus).is_some() {
		context.parse_expression(stream, 0)?
	} else if stream.next_is(TokenClass::Minus) {
		context.parse_expression(stream, 0)?
	} else {
		return None;
	};
	let close = stream.eat(TokenClass::CloseParenthesis)?.source_span();
	stream
		.at_operand_end()
		.then(|| AddressingMode::with_register(Mode::INDEXED, index, join(open, close)).and_value(displacement))
}

/// `(nn)` and `(n)`: only an operand that is parenthesized as a whole is indirect; `(5)+1` is an immediate.
fn memory(stream: &mut TokenStream, context: &mut ParseContext<'_>, allowed: Mode) -> Option<AddressingMode<Mode>> {
	let address = context.parse_expression(stream, 0)?;
	if !address.is_parenthesized() || !stream.at_operand_end() {
		return None;
	}
	let span = address.span();
	let mode = if allowed.contains(Mode::PORT) { Mode::PORT } else { Mode::MEMORY };
	Some(AddressingMode::with_value(mode, address.strip_parentheses(), span))
}

fn join(start: SourceSpan, end: SourceSpan) -> SourceSpan {
	(start.offset(), (end.offset() + end.len()).saturating_sub(start.offset())).into()
}
