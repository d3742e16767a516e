//! 65xx operand syntax.
//!
//! Forms are tried in a fixed order; each one either consumes a complete operand or leaves the stream untouched.

use miette::SourceSpan;

use super::{Features, Mode};
use crate::addressing_mode::{AddressingMode, ImmediateWidth, ResolveRequest};
use crate::backend::MachineConfig;
use crate::expression::{Expression, ParseContext};
use crate::parser::{TokenClass, TokenStream};
use crate::AssemblyError;

/// Width prefix of a plain operand.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Width {
	/// No prefix: the narrowing pass decides.
	Automatic,
	/// `<`: base page, low byte of the value.
	Narrow,
	/// `>` or `|`: always a full 16-bit address.
	Wide,
}

pub(super) fn match_syntax(
	stream: &mut TokenStream,
	context: &mut ParseContext<'_>,
	config: &MachineConfig<Features>,
	request: &ResolveRequest<Mode>,
) -> Option<AddressingMode<Mode>> {
	let allowed = request.allowed;
	let span = stream.peek().source_span();

	if stream.at_operand_end() {
		return allowed.contains(Mode::NONE).then(|| AddressingMode::new(Mode::NONE, span));
	}
	if let Some(accumulator) = stream.attempt(|stream| {
		let register = stream.eat_identifier("a")?;
		stream.at_operand_end().then(|| AddressingMode::new(Mode::ACCUMULATOR, register.source_span()))
	}) {
		return Some(accumulator);
	}
	if stream.next_is(TokenClass::Hash) {
		return immediate(stream, context, request);
	}
	if allowed.intersects(Mode::ZERO_PAGE_BIT | Mode::ZERO_PAGE_BIT_RELATIVE) {
		return bit_operand(stream, context, config, request);
	}
	if allowed.intersects(
		Mode::INDIRECT
			| Mode::ZERO_PAGE_INDIRECT
			| Mode::INDEXED_INDIRECT
			| Mode::ABSOLUTE_INDEXED_INDIRECT
			| Mode::INDIRECT_INDEXED
			| Mode::INDIRECT_Z
			| Mode::STACK_INDIRECT_Y,
	) && let Some(operand) = stream.attempt(|stream| indirect(stream, context, config))
	{
		return Some(operand);
	}
	if allowed.contains(Mode::INDIRECT_LONG_Z)
		&& let Some(operand) = stream.attempt(|stream| long_indirect(stream, context, config))
	{
		return Some(operand);
	}
	stream.attempt(|stream| plain(stream, context, allowed))
}

fn immediate(
	stream: &mut TokenStream,
	context: &mut ParseContext<'_>,
	request: &ResolveRequest<Mode>,
) -> Option<AddressingMode<Mode>> {
	let hash = stream.advance().source_span();
	let Some(value) = context.parse_expression(stream, 0) else {
		context.errors.push(AssemblyError::SingleHashInvalid { location: hash, src: context.source_code.clone() });
		return None;
	};
	let span = join(hash, value.span());
	let word = request.allowed.contains(Mode::IMMEDIATE_WORD)
		&& (request.immediate_width == ImmediateWidth::Word || !request.allowed.contains(Mode::IMMEDIATE));
	Some(AddressingMode::with_value(if word { Mode::IMMEDIATE_WORD } else { Mode::IMMEDIATE }, value, span))
}

/// `(...)` forms.
fn indirect(
	stream: &mut TokenStream,
	context: &mut ParseContext<'_>,
	config: &MachineConfig<Features>,
) -> Option<AddressingMode<Mode>> {
	let open = stream.eat(TokenClass::OpenParenthesis)?.source_span();
	let pointer = context.parse_expression(stream, 0)?;
	if stream.eat(TokenClass::Comma).is_some() {
		if stream.eat_identifier("x").is_some() {
			let close = stream.eat(TokenClass::CloseParenthesis)?.source_span();
			return stream
				.at_operand_end()
				.then(|| AddressingMode::with_value(Mode::ABSOLUTE_INDEXED_INDIRECT, pointer, join(open, close)));
		}
		stream.eat_identifier("sp")?;
		stream.eat(TokenClass::CloseParenthesis)?;
		stream.eat(TokenClass::Comma)?;
		let index = stream.eat_identifier("y")?.source_span();
		return Some(AddressingMode::with_value(Mode::STACK_INDIRECT_Y, pointer, join(open, index)));
	}
	let close = stream.eat(TokenClass::CloseParenthesis)?.source_span();
	// A comma also ends an operand, so the index register must be looked for first.
	if stream.eat(TokenClass::Comma).is_none() {
		return stream
			.at_operand_end()
			.then(|| AddressingMode::with_value(Mode::INDIRECT, pointer, join(open, close)));
	}
	let (mode, index) = if let Some(index) = stream.eat_identifier("y") {
		(Mode::INDIRECT_INDEXED, index)
	} else {
		(Mode::INDIRECT_Z, stream.eat_identifier("z")?)
	};
	let pointer = base_page(pointer, context, config)?;
	Some(AddressingMode::with_value(mode, pointer, join(open, index.source_span())))
}

/// `[zp],Z`, also written `[zp]`.
fn long_indirect(
	stream: &mut TokenStream,
	context: &mut ParseContext<'_>,
	config: &MachineConfig<Features>,
) -> Option<AddressingMode<Mode>> {
	let open = stream.eat(TokenClass::OpenBracket)?.source_span();
	let pointer = context.parse_expression(stream, 0)?;
	let mut end = stream.eat(TokenClass::CloseBracket)?.source_span();
	if stream.eat(TokenClass::Comma).is_some() {
		end = stream.eat_identifier("z")?.source_span();
	}
	let pointer = base_page(pointer, context, config)?;
	Some(AddressingMode::with_value(Mode::INDIRECT_LONG_Z, pointer, join(open, end)))
}

/// `bit,zp` and `bit,zp,target`. The bit number is left out if the mnemonic carries it.
fn bit_operand(
	stream: &mut TokenStream,
	context: &mut ParseContext<'_>,
	config: &MachineConfig<Features>,
	request: &ResolveRequest<Mode>,
) -> Option<AddressingMode<Mode>> {
	let start = stream.peek().source_span();
	let bit = match request.implied_index {
		Some(bit) => Expression::constant(bit.into(), start),
		None => {
			let bit = context.parse_expression(stream, 0)?;
			stream.eat(TokenClass::Comma)?;
			bit
		},
	};
	let address = context.parse_expression(stream, 0)?;
	let address = base_page(address, context, config)?;
	if !request.allowed.contains(Mode::ZERO_PAGE_BIT_RELATIVE) {
		let span = join(start, address.span());
		return Some(AddressingMode::with_value(Mode::ZERO_PAGE_BIT, bit, span).and_value(address));
	}
	stream.eat(TokenClass::Comma)?;
	let target = context.parse_expression(stream, 0)?;
	let span = join(start, target.span());
	Some(AddressingMode::with_value(Mode::ZERO_PAGE_BIT_RELATIVE, bit, span).and_value(address).and_value(target))
}

/// An address with an optional width prefix and index register, or a branch target.
fn plain(stream: &mut TokenStream, context: &mut ParseContext<'_>, allowed: Mode) -> Option<AddressingMode<Mode>> {
	let start = stream.peek().source_span();
	let width = if stream.eat(TokenClass::Less).is_some() {
		Width::Narrow
	} else if stream.eat(TokenClass::Greater).is_some() || stream.eat(TokenClass::Pipe).is_some() {
		Width::Wide
	} else {
		Width::Automatic
	};
	let value = context.parse_expression(stream, 0)?;
	let mut end = value.span();

	if allowed.intersects(Mode::RELATIVE | Mode::RELATIVE_LONG) {
		let long = !allowed.contains(Mode::RELATIVE) || (width == Width::Wide && allowed.contains(Mode::RELATIVE_LONG));
		let mode = if long { Mode::RELATIVE_LONG } else { Mode::RELATIVE };
		return Some(AddressingMode::with_value(mode, value, join(start, end)).forced(width != Width::Automatic));
	}

	let index = stream.attempt(|stream| {
		stream.eat(TokenClass::Comma)?;
		["x", "y"].into_iter().find_map(|register| stream.eat_identifier(register).map(|token| (register, token)))
	});
	let (wide, narrow) = match index {
		Some(("x", register)) => {
			end = register.source_span();
			(Mode::ABSOLUTE_X, Mode::ZERO_PAGE_X)
		},
		Some((_, register)) => {
			end = register.source_span();
			(Mode::ABSOLUTE_Y, Mode::ZERO_PAGE_Y)
		},
		None => (Mode::ABSOLUTE, Mode::ZERO_PAGE),
	};
	let span = join(start, end);
	Some(match width {
		Width::Automatic => AddressingMode::with_value(wide, value, span),
		Width::Wide => AddressingMode::with_value(wide, value, span).forced(true),
		Width::Narrow => AddressingMode::with_value(narrow, value.mask(8), span).forced(true),
	})
}

/// Checks a pointer or address that only the base page form exists for, and makes it page-relative.
fn base_page(
	address: Expression,
	context: &mut ParseContext<'_>,
	config: &MachineConfig<Features>,
) -> Option<Expression> {
	match address.value() {
		Some(value) if config.base_page_window().contains(&value) => Some(address.mask(8)),
		Some(value) => {
			context.errors.push(AssemblyError::OutsideBasePage {
				value,
				base: config.base_address(),
				location: address.span(),
				src: context.source_code.clone(),
			});
			None
		},
		None => Some(address.offset_by(-config.base_address())),
	}
}

fn join(start: SourceSpan, end: SourceSpan) -> SourceSpan {
	(start.offset(), (end.offset() + end.len()).saturating_sub(start.offset())).into()
}
