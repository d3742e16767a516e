//! Z80 instruction table.

use std::collections::HashMap;

use super::handler;
use super::{Features, Mnemonic, Mode, Z80};
use crate::addressing_mode::ImmediateWidth;
use crate::encoder::{Handler, InstructionEntry, InstructionTable};

/// An 8-bit operand: register, `(HL)` or `(IX+d)`.
const BYTE_OPERAND: Mode = Mode::REGISTER.union(Mode::REGISTER_INDIRECT).union(Mode::INDEXED);
const LOAD_OPERAND: Mode = BYTE_OPERAND.union(Mode::PAIR).union(Mode::INDEX).union(Mode::SPECIAL).union(Mode::MEMORY);
const ARITHMETIC_OPERAND: Mode = BYTE_OPERAND.union(Mode::IMMEDIATE).union(Mode::PAIR).union(Mode::INDEX);
const JUMP_TARGET: Mode = Mode::ADDRESS.union(Mode::REGISTER_INDIRECT).union(Mode::INDEXED);

/// Instructions without operands, with their complete encoding.
pub(super) const IMPLIED: &[(Mnemonic, &[u8], Features)] = &[
	(Mnemonic::Nop, &[0x00], Features::Z80),
	(Mnemonic::Halt, &[0x76], Features::Z80),
	(Mnemonic::Di, &[0xf3], Features::Z80),
	(Mnemonic::Ei, &[0xfb], Features::Z80),
	(Mnemonic::Exx, &[0xd9], Features::Z80),
	(Mnemonic::Daa, &[0x27], Features::Z80),
	(Mnemonic::Cpl, &[0x2f], Features::Z80),
	(Mnemonic::Ccf, &[0x3f], Features::Z80),
	(Mnemonic::Scf, &[0x37], Features::Z80),
	(Mnemonic::Rlca, &[0x07], Features::Z80),
	(Mnemonic::Rrca, &[0x0f], Features::Z80),
	(Mnemonic::Rla, &[0x17], Features::Z80),
	(Mnemonic::Rra, &[0x1f], Features::Z80),
	(Mnemonic::Neg, &[0xed, 0x44], Features::Z80),
	(Mnemonic::Reti, &[0xed, 0x4d], Features::Z80),
	(Mnemonic::Retn, &[0xed, 0x45], Features::Z80),
	(Mnemonic::Rld, &[0xed, 0x6f], Features::Z80),
	(Mnemonic::Rrd, &[0xed, 0x67], Features::Z80),
	(Mnemonic::Ldi, &[0xed, 0xa0], Features::Z80),
	(Mnemonic::Cpi, &[0xed, 0xa1], Features::Z80),
	(Mnemonic::Ini, &[0xed, 0xa2], Features::Z80),
	(Mnemonic::Outi, &[0xed, 0xa3], Features::Z80),
	(Mnemonic::Ldd, &[0xed, 0xa8], Features::Z80),
	(Mnemonic::Cpd, &[0xed, 0xa9], Features::Z80),
	(Mnemonic::Ind, &[0xed, 0xaa], Features::Z80),
	(Mnemonic::Outd, &[0xed, 0xab], Features::Z80),
	(Mnemonic::Ldir, &[0xed, 0xb0], Features::Z80),
	(Mnemonic::Cpir, &[0xed, 0xb1], Features::Z80),
	(Mnemonic::Inir, &[0xed, 0xb2], Features::Z80),
	(Mnemonic::Otir, &[0xed, 0xb3], Features::Z80),
	(Mnemonic::Lddr, &[0xed, 0xb8], Features::Z80),
	(Mnemonic::Cpdr, &[0xed, 0xb9], Features::Z80),
	(Mnemonic::Indr, &[0xed, 0xba], Features::Z80),
	(Mnemonic::Otdr, &[0xed, 0xbb], Features::Z80),
	(Mnemonic::Swapnib, &[0xed, 0x23], Features::Z80N),
	(Mnemonic::Mirror, &[0xed, 0x24], Features::Z80N),
	(Mnemonic::Outinb, &[0xed, 0x90], Features::Z80N),
	(Mnemonic::Pixeldn, &[0xed, 0x93], Features::Z80N),
	(Mnemonic::Pixelad, &[0xed, 0x94], Features::Z80N),
	(Mnemonic::Setae, &[0xed, 0x95], Features::Z80N),
	(Mnemonic::Ldix, &[0xed, 0xa4], Features::Z80N),
	(Mnemonic::Ldws, &[0xed, 0xa5], Features::Z80N),
	(Mnemonic::Lddx, &[0xed, 0xac], Features::Z80N),
	(Mnemonic::Ldirx, &[0xed, 0xb4], Features::Z80N),
	(Mnemonic::Ldpirx, &[0xed, 0xb7], Features::Z80N),
	(Mnemonic::Lddrx, &[0xed, 0xbc], Features::Z80N),
];

/// Everything else: base opcode, required features, operand slots and handler.
#[allow(clippy::type_complexity)]
const INSTRUCTIONS: &[(Mnemonic, u8, Features, Mode, Mode, Handler<Z80>)] = &[
	(Mnemonic::Ld, 0x40, Features::Z80, LOAD_OPERAND, LOAD_OPERAND.union(Mode::IMMEDIATE), handler::load),
	(Mnemonic::Push, 0xc5, Features::Z80, Mode::PAIR.union(Mode::ACCUMULATOR_FLAGS).union(Mode::INDEX).union(Mode::IMMEDIATE), Mode::empty(), handler::stack),
	(Mnemonic::Pop, 0xc1, Features::Z80, Mode::PAIR.union(Mode::ACCUMULATOR_FLAGS).union(Mode::INDEX), Mode::empty(), handler::stack),
	(Mnemonic::Ex, 0xeb, Features::Z80, Mode::PAIR.union(Mode::ACCUMULATOR_FLAGS).union(Mode::REGISTER_INDIRECT), Mode::PAIR.union(Mode::ALTERNATE_FLAGS).union(Mode::INDEX), handler::exchange),
	(Mnemonic::Add, 0x80, Features::Z80, ARITHMETIC_OPERAND, ARITHMETIC_OPERAND.union(Mode::NONE), handler::arithmetic),
	(Mnemonic::Adc, 0x88, Features::Z80, ARITHMETIC_OPERAND, ARITHMETIC_OPERAND.union(Mode::NONE), handler::arithmetic),
	(Mnemonic::Sub, 0x90, Features::Z80, ARITHMETIC_OPERAND, ARITHMETIC_OPERAND.union(Mode::NONE), handler::arithmetic),
	(Mnemonic::Sbc, 0x98, Features::Z80, ARITHMETIC_OPERAND, ARITHMETIC_OPERAND.union(Mode::NONE), handler::arithmetic),
	(Mnemonic::And, 0xa0, Features::Z80, ARITHMETIC_OPERAND, ARITHMETIC_OPERAND.union(Mode::NONE), handler::arithmetic),
	(Mnemonic::Xor, 0xa8, Features::Z80, ARITHMETIC_OPERAND, ARITHMETIC_OPERAND.union(Mode::NONE), handler::arithmetic),
	(Mnemonic::Or, 0xb0, Features::Z80, ARITHMETIC_OPERAND, ARITHMETIC_OPERAND.union(Mode::NONE), handler::arithmetic),
	(Mnemonic::Cp, 0xb8, Features::Z80, ARITHMETIC_OPERAND, ARITHMETIC_OPERAND.union(Mode::NONE), handler::arithmetic),
	(Mnemonic::Inc, 0x04, Features::Z80, BYTE_OPERAND.union(Mode::PAIR).union(Mode::INDEX), Mode::empty(), handler::increment),
	(Mnemonic::Dec, 0x05, Features::Z80, BYTE_OPERAND.union(Mode::PAIR).union(Mode::INDEX), Mode::empty(), handler::increment),
	(Mnemonic::Rlc, 0x00, Features::Z80, BYTE_OPERAND, Mode::empty(), handler::shift),
	(Mnemonic::Rrc, 0x08, Features::Z80, BYTE_OPERAND, Mode::empty(), handler::shift),
	(Mnemonic::Rl, 0x10, Features::Z80, BYTE_OPERAND.union(Mode::PAIR), Mode::empty(), handler::shift),
	(Mnemonic::Rr, 0x18, Features::Z80, BYTE_OPERAND.union(Mode::PAIR), Mode::empty(), handler::shift),
	(Mnemonic::Sla, 0x20, Features::Z80, BYTE_OPERAND.union(Mode::PAIR), Mode::empty(), handler::shift),
	(Mnemonic::Sra, 0x28, Features::Z80, BYTE_OPERAND.union(Mode::PAIR), Mode::empty(), handler::shift),
	(Mnemonic::Sll, 0x30, Features::Z80, BYTE_OPERAND, Mode::empty(), handler::shift),
	(Mnemonic::Srl, 0x38, Features::Z80, BYTE_OPERAND.union(Mode::PAIR), Mode::empty(), handler::shift),
	(Mnemonic::Bit, 0x40, Features::Z80, Mode::IMMEDIATE, BYTE_OPERAND, handler::bit_operation),
	(Mnemonic::Res, 0x80, Features::Z80, Mode::IMMEDIATE, BYTE_OPERAND, handler::bit_operation),
	(Mnemonic::Set, 0xc0, Features::Z80, Mode::IMMEDIATE, BYTE_OPERAND, handler::bit_operation),
	(Mnemonic::Jp, 0xc3, Features::Z80, Mode::CONDITION.union(JUMP_TARGET), JUMP_TARGET.union(Mode::NONE), handler::jump),
	(Mnemonic::Jr, 0x18, Features::Z80, Mode::CONDITION.union(Mode::RELATIVE), Mode::RELATIVE.union(Mode::NONE), handler::relative_jump),
	(Mnemonic::Djnz, 0x10, Features::Z80, Mode::RELATIVE, Mode::empty(), handler::relative_jump),
	(Mnemonic::Call, 0xcd, Features::Z80, Mode::CONDITION.union(Mode::ADDRESS), Mode::ADDRESS.union(Mode::NONE), handler::call),
	(Mnemonic::Ret, 0xc9, Features::Z80, Mode::CONDITION.union(Mode::NONE), Mode::empty(), handler::call),
	(Mnemonic::Rst, 0xc7, Features::Z80, Mode::IMMEDIATE, Mode::empty(), handler::restart),
	(Mnemonic::Im, 0x46, Features::Z80, Mode::IMMEDIATE, Mode::empty(), handler::interrupt_mode),
	(Mnemonic::In, 0xdb, Features::Z80, Mode::REGISTER, Mode::PORT.union(Mode::PORT_C), handler::port),
	(Mnemonic::Out, 0xd3, Features::Z80, Mode::PORT.union(Mode::PORT_C), Mode::REGISTER, handler::port),
	(Mnemonic::Nextreg, 0x91, Features::Z80N, Mode::IMMEDIATE, Mode::IMMEDIATE.union(Mode::REGISTER), handler::next_register),
	(Mnemonic::Mul, 0x30, Features::Z80N, Mode::REGISTER, Mode::REGISTER, handler::multiply),
	(Mnemonic::Test, 0x27, Features::Z80N, Mode::IMMEDIATE, Mode::empty(), handler::test),
];

/// Builds the instruction table.
pub(super) fn instruction_table() -> InstructionTable<Z80> {
	let mut table = HashMap::new();
	for &(mnemonic, _, requires) in IMPLIED {
		table.insert(mnemonic, InstructionEntry::new(0, requires, Mode::NONE, Mode::empty(), handler::implied));
	}
	for &(mnemonic, opcode, requires, first, second, handler) in INSTRUCTIONS {
		let entry = InstructionEntry::new(opcode, requires, first, second, handler);
		let entry = if mnemonic == Mnemonic::Ld || mnemonic == Mnemonic::Push {
			entry.immediate(ImmediateWidth::Word)
		} else {
			entry
		};
		table.insert(mnemonic, entry);
	}
	table
}
