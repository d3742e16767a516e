//! Z80 instruction handlers.
//!
//! Z80 encodings depend on the combination of both operands, so handlers first classify each operand into an
//! [`Operand`] and then match on the pair. Combinations without a native opcode are synthesized from native
//! instructions through [`Encoder::encode`].

use miette::SourceSpan;

use super::resolver::{A, BC, D, DE, E, HL, HL_INDIRECT, SP};
use super::table::IMPLIED;
use super::{Features, Mnemonic, Mode, Z80};
use crate::addressing_mode::AddressingMode;
use crate::backend::flag_names;
use crate::encoder::{Encoder, Instruction};
use crate::expression::Expression;
use crate::output::PatchWidth;
use crate::AssemblyError;

type Result = std::result::Result<(), Box<AssemblyError>>;

/// What an operand means to the encoder.
#[derive(Clone, Debug)]
enum Operand {
	Absent,
	/// An 8-bit register, or `(HL)` as register 6.
	Register(u8),
	Pair(u8),
	/// IX or IY, by prefix byte.
	Index(u8),
	Special(u8),
	/// `(BC)`, `(DE)` or `(SP)`.
	Indirect(u8),
	/// `(IX+d)`, by prefix byte and displacement.
	Indexed(u8, Expression),
	Memory(Expression),
	Port(Expression),
	PortC,
	Immediate(Expression),
	Address(Expression),
	Relative(Expression),
	Condition(u8),
	AccumulatorFlags,
	AlternateFlags,
}

const fn index_prefix(index: u8) -> u8 {
	if index == 0 { 0xdd } else { 0xfd }
}

fn classify(operand: &AddressingMode<Mode>) -> Operand {
	let register = operand.register();
	let mode = operand.mode;
	if mode == Mode::REGISTER {
		Operand::Register(register)
	} else if mode == Mode::PAIR {
		Operand::Pair(register)
	} else if mode == Mode::INDEX {
		Operand::Index(index_prefix(register))
	} else if mode == Mode::SPECIAL {
		Operand::Special(register)
	} else if mode == Mode::REGISTER_INDIRECT {
		if register == HL { Operand::Register(HL_INDIRECT) } else { Operand::Indirect(register) }
	} else if mode == Mode::INDEXED {
		Operand::Indexed(index_prefix(register), operand.value(0))
	} else if mode == Mode::MEMORY {
		Operand::Memory(operand.value(0))
	} else if mode == Mode::PORT {
		Operand::Port(operand.value(0))
	} else if mode == Mode::PORT_C {
		Operand::PortC
	} else if mode == Mode::IMMEDIATE {
		Operand::Immediate(operand.value(0))
	} else if mode == Mode::ADDRESS {
		Operand::Address(operand.value(0))
	} else if mode == Mode::RELATIVE {
		Operand::Relative(operand.value(0))
	} else if mode == Mode::CONDITION {
		Operand::Condition(register)
	} else if mode == Mode::ACCUMULATOR_FLAGS {
		Operand::AccumulatorFlags
	} else if mode == Mode::ALTERNATE_FLAGS {
		Operand::AlternateFlags
	} else {
		Operand::Absent
	}
}

/// Operand builders for synthesized instructions.
fn register(code: u8, span: SourceSpan) -> AddressingMode<Mode> {
	if code == HL_INDIRECT {
		AddressingMode::with_register(Mode::REGISTER_INDIRECT, HL, span)
	} else {
		AddressingMode::with_register(Mode::REGISTER, code, span)
	}
}

const fn condition(code: u8, span: SourceSpan) -> AddressingMode<Mode> {
	AddressingMode::with_register(Mode::CONDITION, code, span)
}

const fn none(span: SourceSpan) -> AddressingMode<Mode> {
	AddressingMode::new(Mode::NONE, span)
}

/// The same indexed operand, `offset` bytes further.
fn displaced(operand: &AddressingMode<Mode>, offset: i64) -> AddressingMode<Mode> {
	AddressingMode { operands: vec![operand.value(0).offset_by(offset)], ..operand.clone() }
}

/// High and low register of a pair.
const fn halves(pair: u8) -> (u8, u8) {
	(pair * 2, pair * 2 + 1)
}

fn emit_byte(encoder: &mut Encoder<'_, Z80>, value: Expression) -> Result {
	encoder.emit_value(value, PatchWidth::Byte)
}

fn emit_word(encoder: &mut Encoder<'_, Z80>, value: Expression) -> Result {
	encoder.emit_value(value, PatchWidth::Word)
}

fn emit_indexed(encoder: &mut Encoder<'_, Z80>, prefix: u8, opcode: u8, displacement: Expression) -> Result {
	encoder.emit(&[prefix, opcode]);
	encoder.emit_value(displacement, PatchWidth::SignedByte)
}

/// The table admitted an operand combination that has no encoding. Reported on the second operand if there is one,
/// since that is where combinations usually go wrong.
fn unencodable(encoder: &Encoder<'_, Z80>, instruction: &Instruction<Z80>) -> Box<AssemblyError> {
	let (operand_index, operand) =
		if instruction.second().is(Mode::NONE) { (0, instruction.first()) } else { (1, instruction.second()) };
	AssemblyError::InvalidAddressingMode {
		mnemonic: instruction.mnemonic.to_string(),
		operand_index,
		legal_modes: Vec::new(),
		location: operand.span,
		src: encoder.source_code().clone(),
	}
	.into()
}

fn require(encoder: &Encoder<'_, Z80>, operand: &AddressingMode<Mode>, features: Features) -> Result {
	if encoder.has(features) {
		return Ok(());
	}
	Err(AssemblyError::UnsupportedAddressingMode {
		mode:     flag_names(operand.mode).join(", "),
		required: flag_names(features).join(", "),
		location: operand.span,
		src:      encoder.source_code().clone(),
	}
	.into())
}

fn invalid_constant(encoder: &Encoder<'_, Z80>, value: &Expression, typename: &str) -> Box<AssemblyError> {
	AssemblyError::InvalidConstant {
		constant: value.to_string(),
		typename: typename.to_owned(),
		location: value.span(),
		src:      encoder.source_code().clone(),
	}
	.into()
}

pub(super) fn implied(encoder: &mut Encoder<'_, Z80>, instruction: &Instruction<Z80>) -> Result {
	let &(_, bytes, _) = IMPLIED
		.iter()
		.find(|(mnemonic, ..)| *mnemonic == instruction.mnemonic)
		.ok_or_else(|| unencodable(encoder, instruction))?;
	encoder.emit(bytes);
	Ok(())
}

fn is_stack_pair(operand: &Operand) -> bool {
	matches!(operand, Operand::Pair(pair) if *pair != SP) || matches!(operand, Operand::Index(_))
}

/// LD in all its forms. Register pair copies and 16-bit loads through `(HL)` or `(IX+d)` are synthesized.
#[allow(clippy::too_many_lines)]
pub(super) fn load(encoder: &mut Encoder<'_, Z80>, instruction: &Instruction<Z80>) -> Result {
	let span = instruction.first().span;
	match (classify(instruction.first()), classify(instruction.second())) {
		(Operand::Register(HL_INDIRECT), Operand::Register(HL_INDIRECT)) => Err(unencodable(encoder, instruction)),
		(Operand::Register(target), Operand::Register(source)) => {
			encoder.emit(&[0x40 | target << 3 | source]);
			Ok(())
		},
		(Operand::Register(target), Operand::Immediate(value)) => {
			encoder.emit(&[0x06 | target << 3]);
			emit_byte(encoder, value)
		},
		(Operand::Register(target), Operand::Indexed(prefix, displacement)) if target != HL_INDIRECT =>
			emit_indexed(encoder, prefix, 0x46 | target << 3, displacement),
		(Operand::Indexed(prefix, displacement), Operand::Register(source)) if source != HL_INDIRECT =>
			emit_indexed(encoder, prefix, 0x70 | source, displacement),
		(Operand::Indexed(prefix, displacement), Operand::Immediate(value)) => {
			emit_indexed(encoder, prefix, 0x36, displacement)?;
			emit_byte(encoder, value)
		},
		(Operand::Register(A), Operand::Indirect(pair @ (BC | DE))) => {
			encoder.emit(&[0x0a | pair << 4]);
			Ok(())
		},
		(Operand::Indirect(pair @ (BC | DE)), Operand::Register(A)) => {
			encoder.emit(&[0x02 | pair << 4]);
			Ok(())
		},
		(Operand::Register(A), Operand::Memory(address)) => {
			encoder.emit(&[0x3a]);
			emit_word(encoder, address)
		},
		(Operand::Memory(address), Operand::Register(A)) => {
			encoder.emit(&[0x32]);
			emit_word(encoder, address)
		},
		(Operand::Register(A), Operand::Special(special)) => {
			encoder.emit(&[0xed, 0x57 | special << 3]);
			Ok(())
		},
		(Operand::Special(special), Operand::Register(A)) => {
			encoder.emit(&[0xed, 0x47 | special << 3]);
			Ok(())
		},
		(Operand::Pair(pair), Operand::Immediate(value)) => {
			encoder.emit(&[0x01 | pair << 4]);
			emit_word(encoder, value)
		},
		(Operand::Index(prefix), Operand::Immediate(value)) => {
			encoder.emit(&[prefix, 0x21]);
			emit_word(encoder, value)
		},
		(Operand::Pair(HL), Operand::Memory(address)) => {
			encoder.emit(&[0x2a]);
			emit_word(encoder, address)
		},
		(Operand::Pair(pair), Operand::Memory(address)) => {
			encoder.emit(&[0xed, 0x4b | pair << 4]);
			emit_word(encoder, address)
		},
		(Operand::Index(prefix), Operand::Memory(address)) => {
			encoder.emit(&[prefix, 0x2a]);
			emit_word(encoder, address)
		},
		(Operand::Memory(address), Operand::Pair(HL)) => {
			encoder.emit(&[0x22]);
			emit_word(encoder, address)
		},
		(Operand::Memory(address), Operand::Pair(pair)) => {
			encoder.emit(&[0xed, 0x43 | pair << 4]);
			emit_word(encoder, address)
		},
		(Operand::Memory(address), Operand::Index(prefix)) => {
			encoder.emit(&[prefix, 0x22]);
			emit_word(encoder, address)
		},
		(Operand::Pair(SP), Operand::Pair(HL)) => {
			encoder.emit(&[0xf9]);
			Ok(())
		},
		(Operand::Pair(SP), Operand::Index(prefix)) => {
			encoder.emit(&[prefix, 0xf9]);
			Ok(())
		},
		(Operand::Pair(target), Operand::Pair(source)) if target != SP && source != SP => {
			encoder.require_synthesis(instruction.mnemonic)?;
			let (target_high, target_low) = halves(target);
			let (source_high, source_low) = halves(source);
			encoder.encode(Mnemonic::Ld, register(target_high, span), register(source_high, span))?;
			encoder.encode(Mnemonic::Ld, register(target_low, span), register(source_low, span))
		},
		(target, source) if is_stack_pair(&target) && is_stack_pair(&source) => {
			encoder.require_synthesis(instruction.mnemonic)?;
			encoder.encode(Mnemonic::Push, instruction.second().clone(), none(span))?;
			encoder.encode(Mnemonic::Pop, instruction.first().clone(), none(span))
		},
		// HL itself would be clobbered halfway through.
		(Operand::Pair(pair @ (BC | DE)), Operand::Register(HL_INDIRECT)) => {
			encoder.require_synthesis(instruction.mnemonic)?;
			let (high, low) = halves(pair);
			let memory = instruction.second().clone();
			let hl = AddressingMode::with_register(Mode::PAIR, HL, memory.span);
			encoder.encode(Mnemonic::Ld, register(low, span), memory.clone())?;
			encoder.encode(Mnemonic::Inc, hl.clone(), none(span))?;
			encoder.encode(Mnemonic::Ld, register(high, span), memory)?;
			encoder.encode(Mnemonic::Dec, hl, none(span))
		},
		(Operand::Register(HL_INDIRECT), Operand::Pair(pair @ (BC | DE))) => {
			encoder.require_synthesis(instruction.mnemonic)?;
			let (high, low) = halves(pair);
			let memory = instruction.first().clone();
			let hl = AddressingMode::with_register(Mode::PAIR, HL, memory.span);
			encoder.encode(Mnemonic::Ld, memory.clone(), register(low, span))?;
			encoder.encode(Mnemonic::Inc, hl.clone(), none(span))?;
			encoder.encode(Mnemonic::Ld, memory, register(high, span))?;
			encoder.encode(Mnemonic::Dec, hl, none(span))
		},
		(Operand::Pair(pair @ (BC | DE | HL)), Operand::Indexed(..)) => {
			encoder.require_synthesis(instruction.mnemonic)?;
			let (high, low) = halves(pair);
			let memory = instruction.second();
			encoder.encode(Mnemonic::Ld, register(low, span), memory.clone())?;
			encoder.encode(Mnemonic::Ld, register(high, span), displaced(memory, 1))
		},
		(Operand::Indexed(..), Operand::Pair(pair @ (BC | DE | HL))) => {
			encoder.require_synthesis(instruction.mnemonic)?;
			let (high, low) = halves(pair);
			let memory = instruction.first();
			encoder.encode(Mnemonic::Ld, memory.clone(), register(low, span))?;
			encoder.encode(Mnemonic::Ld, displaced(memory, 1), register(high, span))
		},
		_ => Err(unencodable(encoder, instruction)),
	}
}

/// PUSH and POP.
pub(super) fn stack(encoder: &mut Encoder<'_, Z80>, instruction: &Instruction<Z80>) -> Result {
	match classify(instruction.first()) {
		Operand::Pair(pair) if pair != SP => encoder.emit(&[instruction.opcode | pair << 4]),
		Operand::AccumulatorFlags => encoder.emit(&[instruction.opcode | 0x30]),
		Operand::Index(prefix) => encoder.emit(&[prefix, instruction.opcode | 0x20]),
		Operand::Immediate(value) if instruction.mnemonic == Mnemonic::Push => {
			require(encoder, instruction.first(), Features::Z80N)?;
			encoder.emit(&[0xed, 0x8a]);
			return encoder.emit_value(value, PatchWidth::WordBigEndian);
		},
		_ => return Err(unencodable(encoder, instruction)),
	}
	Ok(())
}

pub(super) fn exchange(encoder: &mut Encoder<'_, Z80>, instruction: &Instruction<Z80>) -> Result {
	match (classify(instruction.first()), classify(instruction.second())) {
		(Operand::Pair(DE), Operand::Pair(HL)) => encoder.emit(&[0xeb]),
		(Operand::AccumulatorFlags, Operand::AlternateFlags) => encoder.emit(&[0x08]),
		(Operand::Indirect(SP), Operand::Pair(HL)) => encoder.emit(&[0xe3]),
		(Operand::Indirect(SP), Operand::Index(prefix)) => encoder.emit(&[prefix, 0xe3]),
		_ => return Err(unencodable(encoder, instruction)),
	}
	Ok(())
}

/// The eight accumulator operations, and 16-bit addition and subtraction. `SUB B` and `SUB A,B` are the same.
pub(super) fn arithmetic(encoder: &mut Encoder<'_, Z80>, instruction: &Instruction<Z80>) -> Result {
	let (target, source) = match classify(instruction.second()) {
		Operand::Absent => (Operand::Register(A), classify(instruction.first())),
		source => (classify(instruction.first()), source),
	};
	let opcode = instruction.opcode;
	let mnemonic = instruction.mnemonic;
	match (target, source) {
		(Operand::Register(A), Operand::Register(source)) => encoder.emit(&[opcode | source]),
		(Operand::Register(A), Operand::Immediate(value)) => {
			encoder.emit(&[opcode | 0x46]);
			return emit_byte(encoder, value);
		},
		(Operand::Register(A), Operand::Indexed(prefix, displacement)) =>
			return emit_indexed(encoder, prefix, opcode | HL_INDIRECT, displacement),
		(Operand::Pair(HL), Operand::Pair(pair)) if mnemonic == Mnemonic::Add => encoder.emit(&[0x09 | pair << 4]),
		(Operand::Pair(HL), Operand::Pair(pair)) if mnemonic == Mnemonic::Adc => encoder.emit(&[0xed, 0x4a | pair << 4]),
		(Operand::Pair(HL), Operand::Pair(pair)) if mnemonic == Mnemonic::Sbc => encoder.emit(&[0xed, 0x42 | pair << 4]),
		(Operand::Index(prefix), Operand::Pair(pair)) if mnemonic == Mnemonic::Add && pair != HL =>
			encoder.emit(&[prefix, 0x09 | pair << 4]),
		(Operand::Index(prefix), Operand::Index(source)) if mnemonic == Mnemonic::Add && prefix == source =>
			encoder.emit(&[prefix, 0x29]),
		(Operand::Pair(pair @ (BC | DE | HL)), Operand::Register(A)) if mnemonic == Mnemonic::Add => {
			require(encoder, instruction.first(), Features::Z80N)?;
			encoder.emit(&[0xed, 0x33 - pair]);
		},
		(Operand::Pair(pair @ (BC | DE | HL)), Operand::Immediate(value)) if mnemonic == Mnemonic::Add => {
			require(encoder, instruction.first(), Features::Z80N)?;
			encoder.emit(&[0xed, 0x36 - pair]);
			return emit_word(encoder, value);
		},
		_ => return Err(unencodable(encoder, instruction)),
	}
	Ok(())
}

/// INC and DEC.
pub(super) fn increment(encoder: &mut Encoder<'_, Z80>, instruction: &Instruction<Z80>) -> Result {
	let increment = instruction.mnemonic == Mnemonic::Inc;
	match classify(instruction.first()) {
		Operand::Register(register) => encoder.emit(&[instruction.opcode | register << 3]),
		Operand::Pair(pair) => encoder.emit(&[(if increment { 0x03 } else { 0x0b }) | pair << 4]),
		Operand::Index(prefix) => encoder.emit(&[prefix, if increment { 0x23 } else { 0x2b }]),
		Operand::Indexed(prefix, displacement) =>
			return emit_indexed(encoder, prefix, 0x30 | instruction.opcode, displacement),
		_ => return Err(unencodable(encoder, instruction)),
	}
	Ok(())
}

/// Rotates and shifts. A register pair is shifted as a whole through the carry, low byte first for left shifts and
/// high byte first for right shifts.
pub(super) fn shift(encoder: &mut Encoder<'_, Z80>, instruction: &Instruction<Z80>) -> Result {
	match classify(instruction.first()) {
		Operand::Register(register) => encoder.emit(&[0xcb, instruction.opcode | register]),
		Operand::Indexed(prefix, displacement) => {
			encoder.emit(&[prefix, 0xcb]);
			encoder.emit_value(displacement, PatchWidth::SignedByte)?;
			encoder.emit(&[instruction.opcode | HL_INDIRECT]);
		},
		Operand::Pair(pair) if pair != SP => {
			encoder.require_synthesis(instruction.mnemonic)?;
			let span = instruction.first().span;
			let (high, low) = halves(pair);
			let left = matches!(instruction.mnemonic, Mnemonic::Sla | Mnemonic::Rl);
			let (first, second, carry) = if left { (low, high, Mnemonic::Rl) } else { (high, low, Mnemonic::Rr) };
			encoder.encode(instruction.mnemonic, register(first, span), none(span))?;
			return encoder.encode(carry, register(second, span), none(span));
		},
		_ => return Err(unencodable(encoder, instruction)),
	}
	Ok(())
}

/// BIT, RES and SET.
pub(super) fn bit_operation(encoder: &mut Encoder<'_, Z80>, instruction: &Instruction<Z80>) -> Result {
	let bit = instruction.first().value(0).check_range(0, 7, encoder.source_code())?;
	let opcode =
		|register: u8| Expression::constant((instruction.opcode | register).into(), bit.span()).or(bit.clone().shift(3));
	match classify(instruction.second()) {
		Operand::Register(register) => {
			encoder.emit(&[0xcb]);
			emit_byte(encoder, opcode(register))
		},
		Operand::Indexed(prefix, displacement) => {
			encoder.emit(&[prefix, 0xcb]);
			encoder.emit_value(displacement, PatchWidth::SignedByte)?;
			emit_byte(encoder, opcode(HL_INDIRECT))
		},
		_ => Err(unencodable(encoder, instruction)),
	}
}

/// The condition and target of a jump or call, where the condition is optional and comes first.
fn conditional(instruction: &Instruction<Z80>) -> (Option<u8>, &AddressingMode<Mode>) {
	match classify(instruction.first()) {
		Operand::Condition(condition) if !instruction.second().is(Mode::NONE) => (Some(condition), instruction.second()),
		_ => (None, instruction.first()),
	}
}

/// JP. The indirect jumps have no conditional form; a condition on them skips over the jump with the inverse
/// condition.
pub(super) fn jump(encoder: &mut Encoder<'_, Z80>, instruction: &Instruction<Z80>) -> Result {
	let (condition_code, target) = conditional(instruction);
	match (condition_code, classify(target)) {
		(None, Operand::Address(address)) => {
			encoder.emit(&[instruction.opcode]);
			emit_word(encoder, address)
		},
		(Some(code), Operand::Address(address)) => {
			encoder.emit(&[0xc2 | code << 3]);
			emit_word(encoder, address)
		},
		(None, Operand::Register(HL_INDIRECT)) => {
			encoder.emit(&[0xe9]);
			Ok(())
		},
		(None, Operand::Indexed(prefix, displacement)) if displacement.value() == Some(0) => {
			encoder.emit(&[prefix, 0xe9]);
			Ok(())
		},
		(Some(code), Operand::Register(HL_INDIRECT) | Operand::Indexed(..)) => {
			encoder.require_synthesis(instruction.mnemonic)?;
			let span = instruction.first().span;
			let skip = encoder.fresh_label();
			let skip_target = encoder.label_reference(&skip);
			// Conditions come in pairs that differ in the lowest bit; only the first four have a JR form.
			let inverse = code ^ 1;
			if inverse < 4 {
				encoder.encode(
					Mnemonic::Jr,
					condition(inverse, span),
					AddressingMode::with_value(Mode::RELATIVE, skip_target, span),
				)?;
			} else {
				encoder.encode(
					Mnemonic::Jp,
					condition(inverse, span),
					AddressingMode::with_value(Mode::ADDRESS, skip_target, span),
				)?;
			}
			encoder.encode(Mnemonic::Jp, target.clone(), none(span))?;
			encoder.bind_label(skip)
		},
		_ => Err(unencodable(encoder, instruction)),
	}
}

/// JR and DJNZ. JR has no form for the parity and sign conditions; those become an absolute JP.
pub(super) fn relative_jump(encoder: &mut Encoder<'_, Z80>, instruction: &Instruction<Z80>) -> Result {
	let (condition_code, target) = conditional(instruction);
	let Operand::Relative(destination) = classify(target) else {
		return Err(unencodable(encoder, instruction));
	};
	let opcode = match condition_code {
		None => instruction.opcode,
		Some(code) if code < 4 => 0x20 | code << 3,
		Some(code) => {
			encoder.require_synthesis(instruction.mnemonic)?;
			let span = target.span;
			return encoder.encode(
				Mnemonic::Jp,
				condition(code, instruction.first().span),
				AddressingMode::with_value(Mode::ADDRESS, destination, span),
			);
		},
	};
	let start = encoder.program_counter();
	encoder.emit(&[opcode]);
	encoder.emit_value(destination.pc_relative(start, 2), PatchWidth::SignedByte)
}

/// CALL and RET.
pub(super) fn call(encoder: &mut Encoder<'_, Z80>, instruction: &Instruction<Z80>) -> Result {
	if instruction.mnemonic == Mnemonic::Ret {
		match classify(instruction.first()) {
			Operand::Condition(code) => encoder.emit(&[0xc0 | code << 3]),
			_ => encoder.emit(&[instruction.opcode]),
		}
		return Ok(());
	}
	let (condition_code, target) = conditional(instruction);
	let Operand::Address(address) = classify(target) else {
		return Err(unencodable(encoder, instruction));
	};
	encoder.emit(&[condition_code.map_or(instruction.opcode, |code| 0xc4 | code << 3)]);
	emit_word(encoder, address)
}

/// RST: one of the eight restart vectors.
pub(super) fn restart(encoder: &mut Encoder<'_, Z80>, instruction: &Instruction<Z80>) -> Result {
	let vector = instruction.first().value(0);
	match vector.value().and_then(|value| u8::try_from(value).ok()) {
		Some(value) if value % 8 == 0 && value <= 0x38 => {
			encoder.emit(&[instruction.opcode | value]);
			Ok(())
		},
		_ => Err(invalid_constant(encoder, &vector, "restart vector")),
	}
}

pub(super) fn interrupt_mode(encoder: &mut Encoder<'_, Z80>, instruction: &Instruction<Z80>) -> Result {
	let mode = instruction.first().value(0);
	let opcode = match mode.value() {
		Some(0) => 0x46,
		Some(1) => 0x56,
		Some(2) => 0x5e,
		_ => return Err(invalid_constant(encoder, &mode, "interrupt mode")),
	};
	encoder.emit(&[0xed, opcode]);
	Ok(())
}

/// IN and OUT.
pub(super) fn port(encoder: &mut Encoder<'_, Z80>, instruction: &Instruction<Z80>) -> Result {
	let operands = (classify(instruction.first()), classify(instruction.second()));
	match (instruction.mnemonic, operands) {
		(Mnemonic::In, (Operand::Register(A), Operand::Port(port)))
		| (Mnemonic::Out, (Operand::Port(port), Operand::Register(A))) => {
			encoder.emit(&[instruction.opcode]);
			emit_byte(encoder, port)
		},
		(Mnemonic::In, (Operand::Register(register), Operand::PortC)) => {
			encoder.emit(&[0xed, 0x40 | register << 3]);
			Ok(())
		},
		(Mnemonic::Out, (Operand::PortC, Operand::Register(register))) => {
			encoder.emit(&[0xed, 0x41 | register << 3]);
			Ok(())
		},
		_ => Err(unencodable(encoder, instruction)),
	}
}

/// NEXTREG: writes a Next hardware register from an immediate or from A.
pub(super) fn next_register(encoder: &mut Encoder<'_, Z80>, instruction: &Instruction<Z80>) -> Result {
	match (classify(instruction.first()), classify(instruction.second())) {
		(Operand::Immediate(register), Operand::Immediate(value)) => {
			encoder.emit(&[0xed, instruction.opcode]);
			emit_byte(encoder, register)?;
			emit_byte(encoder, value)
		},
		(Operand::Immediate(register), Operand::Register(A)) => {
			encoder.emit(&[0xed, instruction.opcode + 1]);
			emit_byte(encoder, register)
		},
		_ => Err(unencodable(encoder, instruction)),
	}
}

/// MUL D,E.
pub(super) fn multiply(encoder: &mut Encoder<'_, Z80>, instruction: &Instruction<Z80>) -> Result {
	match (classify(instruction.first()), classify(instruction.second())) {
		(Operand::Register(D), Operand::Register(E)) => {
			encoder.emit(&[0xed, instruction.opcode]);
			Ok(())
		},
		_ => Err(unencodable(encoder, instruction)),
	}
}

/// TEST n.
pub(super) fn test(encoder: &mut Encoder<'_, Z80>, instruction: &Instruction<Z80>) -> Result {
	encoder.emit(&[0xed, instruction.opcode]);
	emit_byte(encoder, instruction.first().value(0))
}
