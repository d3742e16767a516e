//! 65xx instruction handlers.

use super::table::{self, CONDITIONAL_JUMPS, GROUP_ONE_OFFSETS, QUADS, READ_MODIFY_WRITE_OFFSETS};
use super::{Features, Mnemonic, Mode, Mos6502};
use crate::addressing_mode::AddressingMode;
use crate::backend::flag_names;
use crate::encoder::{Encoder, Instruction};
use crate::expression::Expression;
use crate::output::PatchWidth;
use crate::AssemblyError;

type Result = std::result::Result<(), Box<AssemblyError>>;

/// Modes with a 16-bit operand.
const WORD_OPERAND: Mode = Mode::ABSOLUTE
	.union(Mode::ABSOLUTE_X)
	.union(Mode::ABSOLUTE_Y)
	.union(Mode::INDIRECT)
	.union(Mode::ABSOLUTE_INDEXED_INDIRECT)
	.union(Mode::IMMEDIATE_WORD);

/// Registers a quad load fills after A, with the transfer that copies A instead.
const QUAD_LOADS: [(Mnemonic, Mnemonic); 3] =
	[(Mnemonic::Ldx, Mnemonic::Tax), (Mnemonic::Ldy, Mnemonic::Tay), (Mnemonic::Ldz, Mnemonic::Taz)];

fn emit_operand(encoder: &mut Encoder<'_, Mos6502>, operand: &AddressingMode<Mode>) -> Result {
	if operand.mode.intersects(Mode::NONE | Mode::ACCUMULATOR) {
		return Ok(());
	}
	let width = if operand.mode.intersects(WORD_OPERAND) {
		PatchWidth::Word
	} else if operand.is(Mode::IMMEDIATE) {
		PatchWidth::Byte
	} else {
		PatchWidth::BasePage
	};
	encoder.emit_value(operand.value(0), width)
}

fn offset(offsets: &[(Mode, u8)], operand: &AddressingMode<Mode>) -> Option<u8> {
	offsets.iter().find(|(mode, _)| operand.is(*mode)).map(|(_, offset)| *offset)
}

/// The table admitted a mode the handler has no encoding for.
fn unencodable(encoder: &Encoder<'_, Mos6502>, instruction: &Instruction<Mos6502>) -> Box<AssemblyError> {
	AssemblyError::InvalidAddressingMode {
		mnemonic:      instruction.mnemonic.to_string(),
		operand_index: 0,
		legal_modes:   Vec::new(),
		location:      instruction.first().span,
		src:           encoder.source_code().clone(),
	}
	.into()
}

fn unsupported_mode(encoder: &Encoder<'_, Mos6502>, operand: &AddressingMode<Mode>, required: Features) -> Box<AssemblyError> {
	AssemblyError::UnsupportedAddressingMode {
		mode:     flag_names(operand.mode).join(", "),
		required: flag_names(required).join(", "),
		location: operand.span,
		src:      encoder.source_code().clone(),
	}
	.into()
}

const fn none(span: miette::SourceSpan) -> AddressingMode<Mode> {
	AddressingMode::new(Mode::NONE, span)
}

pub(super) fn group_one(encoder: &mut Encoder<'_, Mos6502>, instruction: &Instruction<Mos6502>) -> Result {
	let operand = instruction.first();
	if operand.is(Mode::STACK_INDIRECT_Y) {
		let opcode = if instruction.mnemonic == Mnemonic::Sta { 0x82 } else { 0xe2 };
		encoder.emit(&[opcode]);
		return emit_operand(encoder, operand);
	}
	let offset = offset(GROUP_ONE_OFFSETS, operand).ok_or_else(|| unencodable(encoder, instruction))?;
	if operand.is(Mode::INDIRECT_LONG_Z) {
		encoder.emit(&[0xea]);
	}
	encoder.emit(&[instruction.opcode + offset]);
	emit_operand(encoder, operand)
}

pub(super) fn read_modify_write(encoder: &mut Encoder<'_, Mos6502>, instruction: &Instruction<Mos6502>) -> Result {
	let operand = instruction.first();
	let accumulator = operand.mode.intersects(Mode::NONE | Mode::ACCUMULATOR);
	let opcode = match instruction.mnemonic {
		// The CMOS parts found room for INC A and DEC A elsewhere.
		Mnemonic::Inc | Mnemonic::Dec if accumulator => {
			if !encoder.has(Features::CMOS) {
				return Err(unsupported_mode(encoder, operand, Features::CMOS));
			}
			if instruction.mnemonic == Mnemonic::Inc { 0x1a } else { 0x3a }
		},
		_ => instruction.opcode + offset(READ_MODIFY_WRITE_OFFSETS, operand).ok_or_else(|| unencodable(encoder, instruction))?,
	};
	encoder.emit(&[opcode]);
	emit_operand(encoder, operand)
}

pub(super) fn irregular(encoder: &mut Encoder<'_, Mos6502>, instruction: &Instruction<Mos6502>) -> Result {
	let operand = instruction.first();
	let &(_, opcode, requires) = table::forms(instruction.mnemonic)
		.iter()
		.find(|(mode, ..)| operand.is(*mode))
		.ok_or_else(|| unencodable(encoder, instruction))?;
	if !encoder.has(requires) {
		return Err(unsupported_mode(encoder, operand, requires));
	}
	encoder.emit(&[opcode]);
	emit_operand(encoder, operand)
}

pub(super) fn implied(encoder: &mut Encoder<'_, Mos6502>, instruction: &Instruction<Mos6502>) -> Result {
	encoder.emit(&[instruction.opcode]);
	Ok(())
}

/// Relative branches. On the 65CE02, an 8-bit branch whose constant target is out of reach becomes a 16-bit branch.
pub(super) fn branch(encoder: &mut Encoder<'_, Mos6502>, instruction: &Instruction<Mos6502>) -> Result {
	let operand = instruction.first();
	let start = encoder.program_counter();
	let target = operand.value(0);
	let short_displacement = target.clone().pc_relative(start.clone(), 2);
	let out_of_reach = short_displacement.value().is_some_and(|displacement| !(-128 ..= 127).contains(&displacement));
	let long = operand.is(Mode::RELATIVE_LONG) || (out_of_reach && !operand.size_forced && encoder.has(Features::CE02));

	if long {
		let opcode = if instruction.mnemonic == Mnemonic::Bsr { instruction.opcode } else { instruction.opcode | 0x03 };
		encoder.emit(&[opcode]);
		encoder.emit_value(target.pc_relative(start, 3), PatchWidth::SignedWord)
	} else {
		encoder.emit(&[instruction.opcode]);
		encoder.emit_value(short_displacement, PatchWidth::SignedByte)
	}
}

/// RMB, SMB, BBR and BBS.
pub(super) fn bit_operation(encoder: &mut Encoder<'_, Mos6502>, instruction: &Instruction<Mos6502>) -> Result {
	let operand = instruction.first();
	let start = encoder.program_counter();
	let bit = operand.value(0).check_range(0, 7, encoder.source_code())?;
	let opcode = Expression::constant(instruction.opcode.into(), bit.span()).or(bit.mask(3).shift(4));
	encoder.emit_value(opcode, PatchWidth::Byte)?;
	encoder.emit_value(operand.value(1), PatchWidth::BasePage)?;
	if operand.is(Mode::ZERO_PAGE_BIT_RELATIVE) {
		encoder.emit_value(operand.value(2).pc_relative(start, 3), PatchWidth::SignedByte)?;
	}
	Ok(())
}

/// A 32-bit operation: the quad prefix followed by the 8-bit instruction.
pub(super) fn quad(encoder: &mut Encoder<'_, Mos6502>, instruction: &Instruction<Mos6502>) -> Result {
	let &(_, single, _) = QUADS
		.iter()
		.find(|(mnemonic, ..)| *mnemonic == instruction.mnemonic)
		.ok_or_else(|| unencodable(encoder, instruction))?;
	encoder.emit(&[instruction.opcode, instruction.opcode]);
	encoder.encode(single, instruction.first().clone(), instruction.second().clone())
}

/// LDQ. An immediate has no native encoding and is loaded byte by byte into A, X, Y and Z, from least to most
/// significant; a byte equal to the one in A is transferred instead of loaded.
pub(super) fn load_quad(encoder: &mut Encoder<'_, Mos6502>, instruction: &Instruction<Mos6502>) -> Result {
	let operand = instruction.first();
	if !operand.is(Mode::IMMEDIATE) {
		return quad(encoder, instruction);
	}
	encoder.require_synthesis(instruction.mnemonic)?;
	let value = operand.value(0).check_range(i32::MIN.into(), u32::MAX.into(), encoder.source_code())?;
	let span = operand.span;
	let bytes: Vec<Expression> = (0 .. 4).map(|index| value.clone().shift(-8 * index).mask(8)).collect();
	let immediate = |byte: &Expression| AddressingMode::with_value(Mode::IMMEDIATE, byte.clone(), span);

	encoder.encode(Mnemonic::Lda, immediate(&bytes[0]), none(span))?;
	for (byte, (load, transfer)) in bytes[1 ..].iter().zip(QUAD_LOADS) {
		if byte.is_constant() && byte.value() == bytes[0].value() {
			encoder.encode(transfer, none(span), none(span))?;
		} else {
			encoder.encode(load, immediate(byte), none(span))?;
		}
	}
	Ok(())
}

/// Conditional jumps of any distance: a 16-bit branch where the CPU has one, otherwise the inverse branch over an
/// absolute JMP.
pub(super) fn long_conditional_jump(encoder: &mut Encoder<'_, Mos6502>, instruction: &Instruction<Mos6502>) -> Result {
	let &(_, branch, inverse) = CONDITIONAL_JUMPS
		.iter()
		.find(|(jump, ..)| *jump == instruction.mnemonic)
		.ok_or_else(|| unencodable(encoder, instruction))?;
	let span = instruction.first().span;
	let target = instruction.first().value(0);

	if encoder.has(Features::CE02) {
		return encoder.encode(branch, AddressingMode::with_value(Mode::RELATIVE_LONG, target, span), none(span));
	}
	encoder.require_synthesis(instruction.mnemonic)?;
	let skip = encoder.fresh_label();
	let skip_target = encoder.label_reference(&skip);
	encoder.encode(inverse, AddressingMode::with_value(Mode::RELATIVE, skip_target, span), none(span))?;
	encoder.encode(Mnemonic::Jmp, AddressingMode::with_value(Mode::ABSOLUTE, target, span), none(span))?;
	encoder.bind_label(skip)
}
