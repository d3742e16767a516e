//! Opcode tables of the 65xx family.

use std::collections::HashMap;

use super::handler;
use super::{Features, Mnemonic, Mode, Mos6502};
use crate::addressing_mode::ImmediateWidth;
use crate::encoder::{Handler, InstructionEntry, InstructionTable};

/// Opcode forms of one mnemonic: mode, full opcode and the features the form needs beyond the instruction itself.
pub(super) type Forms = &'static [(Mode, u8, Features)];

/// Group one instructions; the handler adds the mode offset to the base opcode.
const GROUP_ONE: &[(Mnemonic, u8)] = &[
	(Mnemonic::Ora, 0x00),
	(Mnemonic::And, 0x20),
	(Mnemonic::Eor, 0x40),
	(Mnemonic::Adc, 0x60),
	(Mnemonic::Sta, 0x80),
	(Mnemonic::Lda, 0xa0),
	(Mnemonic::Cmp, 0xc0),
	(Mnemonic::Sbc, 0xe0),
];

/// Mode offsets of group one instructions. `(zp)` and `(zp),Z` share an opcode; `[zp],Z` is `(zp),Z` behind a NOP
/// prefix.
pub(super) const GROUP_ONE_OFFSETS: &[(Mode, u8)] = &[
	(Mode::INDEXED_INDIRECT, 0x01),
	(Mode::ZERO_PAGE, 0x05),
	(Mode::IMMEDIATE, 0x09),
	(Mode::ABSOLUTE, 0x0d),
	(Mode::INDIRECT_INDEXED, 0x11),
	(Mode::ZERO_PAGE_INDIRECT, 0x12),
	(Mode::INDIRECT_Z, 0x12),
	(Mode::INDIRECT_LONG_Z, 0x12),
	(Mode::ZERO_PAGE_X, 0x15),
	(Mode::ABSOLUTE_Y, 0x19),
	(Mode::ABSOLUTE_X, 0x1d),
];

/// Read-modify-write instructions.
const READ_MODIFY_WRITE: &[(Mnemonic, u8)] = &[
	(Mnemonic::Asl, 0x00),
	(Mnemonic::Rol, 0x20),
	(Mnemonic::Lsr, 0x40),
	(Mnemonic::Ror, 0x60),
	(Mnemonic::Dec, 0xc0),
	(Mnemonic::Inc, 0xe0),
];

pub(super) const READ_MODIFY_WRITE_OFFSETS: &[(Mode, u8)] = &[
	(Mode::NONE, 0x0a),
	(Mode::ACCUMULATOR, 0x0a),
	(Mode::ZERO_PAGE, 0x06),
	(Mode::ABSOLUTE, 0x0e),
	(Mode::ZERO_PAGE_X, 0x16),
	(Mode::ABSOLUTE_X, 0x1e),
];

/// Instructions whose operands follow no pattern, with their complete opcode forms.
const IRREGULAR: &[(Mnemonic, Features, Forms)] = &[
	(Mnemonic::Ldx, Features::BASE, &[
		(Mode::IMMEDIATE, 0xa2, Features::BASE),
		(Mode::ZERO_PAGE, 0xa6, Features::BASE),
		(Mode::ABSOLUTE, 0xae, Features::BASE),
		(Mode::ZERO_PAGE_Y, 0xb6, Features::BASE),
		(Mode::ABSOLUTE_Y, 0xbe, Features::BASE),
	]),
	(Mnemonic::Stx, Features::BASE, &[
		(Mode::ZERO_PAGE, 0x86, Features::BASE),
		(Mode::ABSOLUTE, 0x8e, Features::BASE),
		(Mode::ZERO_PAGE_Y, 0x96, Features::BASE),
		(Mode::ABSOLUTE_Y, 0x9b, Features::CE02),
	]),
	(Mnemonic::Ldy, Features::BASE, &[
		(Mode::IMMEDIATE, 0xa0, Features::BASE),
		(Mode::ZERO_PAGE, 0xa4, Features::BASE),
		(Mode::ABSOLUTE, 0xac, Features::BASE),
		(Mode::ZERO_PAGE_X, 0xb4, Features::BASE),
		(Mode::ABSOLUTE_X, 0xbc, Features::BASE),
	]),
	(Mnemonic::Sty, Features::BASE, &[
		(Mode::ZERO_PAGE, 0x84, Features::BASE),
		(Mode::ABSOLUTE, 0x8c, Features::BASE),
		(Mode::ZERO_PAGE_X, 0x94, Features::BASE),
		(Mode::ABSOLUTE_X, 0x8b, Features::CE02),
	]),
	(Mnemonic::Cpx, Features::BASE, &[
		(Mode::IMMEDIATE, 0xe0, Features::BASE),
		(Mode::ZERO_PAGE, 0xe4, Features::BASE),
		(Mode::ABSOLUTE, 0xec, Features::BASE),
	]),
	(Mnemonic::Cpy, Features::BASE, &[
		(Mode::IMMEDIATE, 0xc0, Features::BASE),
		(Mode::ZERO_PAGE, 0xc4, Features::BASE),
		(Mode::ABSOLUTE, 0xcc, Features::BASE),
	]),
	(Mnemonic::Bit, Features::BASE, &[
		(Mode::ZERO_PAGE, 0x24, Features::BASE),
		(Mode::ABSOLUTE, 0x2c, Features::BASE),
		(Mode::ZERO_PAGE_X, 0x34, Features::CMOS),
		(Mode::ABSOLUTE_X, 0x3c, Features::CMOS),
		(Mode::IMMEDIATE, 0x89, Features::CMOS),
	]),
	(Mnemonic::Stz, Features::CMOS, &[
		(Mode::ZERO_PAGE, 0x64, Features::CMOS),
		(Mode::ZERO_PAGE_X, 0x74, Features::CMOS),
		(Mode::ABSOLUTE, 0x9c, Features::CMOS),
		(Mode::ABSOLUTE_X, 0x9e, Features::CMOS),
	]),
	(Mnemonic::Tsb, Features::CMOS, &[(Mode::ZERO_PAGE, 0x04, Features::CMOS), (Mode::ABSOLUTE, 0x0c, Features::CMOS)]),
	(Mnemonic::Trb, Features::CMOS, &[(Mode::ZERO_PAGE, 0x14, Features::CMOS), (Mode::ABSOLUTE, 0x1c, Features::CMOS)]),
	(Mnemonic::Jmp, Features::BASE, &[
		(Mode::ABSOLUTE, 0x4c, Features::BASE),
		(Mode::INDIRECT, 0x6c, Features::BASE),
		(Mode::ABSOLUTE_INDEXED_INDIRECT, 0x7c, Features::CMOS),
	]),
	(Mnemonic::Jsr, Features::BASE, &[
		(Mode::ABSOLUTE, 0x20, Features::BASE),
		(Mode::INDIRECT, 0x22, Features::CE02),
		(Mode::ABSOLUTE_INDEXED_INDIRECT, 0x23, Features::CE02),
	]),
	(Mnemonic::Ldz, Features::CE02, &[
		(Mode::IMMEDIATE, 0xa3, Features::CE02),
		(Mode::ABSOLUTE, 0xab, Features::CE02),
		(Mode::ABSOLUTE_X, 0xbb, Features::CE02),
	]),
	(Mnemonic::Cpz, Features::CE02, &[
		(Mode::IMMEDIATE, 0xc2, Features::CE02),
		(Mode::ZERO_PAGE, 0xd4, Features::CE02),
		(Mode::ABSOLUTE, 0xdc, Features::CE02),
	]),
	(Mnemonic::Phw, Features::CE02, &[
		(Mode::IMMEDIATE_WORD, 0xf4, Features::CE02),
		(Mode::ABSOLUTE, 0xfc, Features::CE02),
	]),
	(Mnemonic::Asw, Features::CE02, &[(Mode::ABSOLUTE, 0xcb, Features::CE02)]),
	(Mnemonic::Row, Features::CE02, &[(Mode::ABSOLUTE, 0xeb, Features::CE02)]),
	(Mnemonic::Inw, Features::CE02, &[(Mode::ZERO_PAGE, 0xe3, Features::CE02)]),
	(Mnemonic::Dew, Features::CE02, &[(Mode::ZERO_PAGE, 0xc3, Features::CE02)]),
	(Mnemonic::Asr, Features::CE02, &[
		(Mode::NONE, 0x43, Features::CE02),
		(Mode::ACCUMULATOR, 0x43, Features::CE02),
		(Mode::ZERO_PAGE, 0x44, Features::CE02),
		(Mode::ZERO_PAGE_X, 0x54, Features::CE02),
	]),
	(Mnemonic::Rtn, Features::CE02, &[(Mode::IMMEDIATE, 0x62, Features::CE02)]),
];

const IMPLIED: &[(Mnemonic, u8, Features)] = &[
	(Mnemonic::Brk, 0x00, Features::BASE),
	(Mnemonic::Php, 0x08, Features::BASE),
	(Mnemonic::Clc, 0x18, Features::BASE),
	(Mnemonic::Plp, 0x28, Features::BASE),
	(Mnemonic::Sec, 0x38, Features::BASE),
	(Mnemonic::Rti, 0x40, Features::BASE),
	(Mnemonic::Pha, 0x48, Features::BASE),
	(Mnemonic::Cli, 0x58, Features::BASE),
	(Mnemonic::Rts, 0x60, Features::BASE),
	(Mnemonic::Pla, 0x68, Features::BASE),
	(Mnemonic::Sei, 0x78, Features::BASE),
	(Mnemonic::Dey, 0x88, Features::BASE),
	(Mnemonic::Txa, 0x8a, Features::BASE),
	(Mnemonic::Tya, 0x98, Features::BASE),
	(Mnemonic::Txs, 0x9a, Features::BASE),
	(Mnemonic::Tay, 0xa8, Features::BASE),
	(Mnemonic::Tax, 0xaa, Features::BASE),
	(Mnemonic::Clv, 0xb8, Features::BASE),
	(Mnemonic::Tsx, 0xba, Features::BASE),
	(Mnemonic::Iny, 0xc8, Features::BASE),
	(Mnemonic::Dex, 0xca, Features::BASE),
	(Mnemonic::Cld, 0xd8, Features::BASE),
	(Mnemonic::Inx, 0xe8, Features::BASE),
	(Mnemonic::Nop, 0xea, Features::BASE),
	(Mnemonic::Sed, 0xf8, Features::BASE),
	(Mnemonic::Phy, 0x5a, Features::CMOS),
	(Mnemonic::Ply, 0x7a, Features::CMOS),
	(Mnemonic::Phx, 0xda, Features::CMOS),
	(Mnemonic::Plx, 0xfa, Features::CMOS),
	(Mnemonic::Cle, 0x02, Features::CE02),
	(Mnemonic::See, 0x03, Features::CE02),
	(Mnemonic::Tsy, 0x0b, Features::CE02),
	(Mnemonic::Inz, 0x1b, Features::CE02),
	(Mnemonic::Tys, 0x2b, Features::CE02),
	(Mnemonic::Dez, 0x3b, Features::CE02),
	(Mnemonic::Neg, 0x42, Features::CE02),
	(Mnemonic::Taz, 0x4b, Features::CE02),
	(Mnemonic::Map, 0x5c, Features::CE02),
	(Mnemonic::Tab, 0x5b, Features::CE02),
	(Mnemonic::Tza, 0x6b, Features::CE02),
	(Mnemonic::Tba, 0x7b, Features::CE02),
	(Mnemonic::Phz, 0xdb, Features::CE02),
	(Mnemonic::Plz, 0xfb, Features::CE02),
];

/// Conditional branches; the 16-bit form of each is the 8-bit opcode with the low two bits set.
const BRANCHES: &[(Mnemonic, u8, Features)] = &[
	(Mnemonic::Bpl, 0x10, Features::BASE),
	(Mnemonic::Bmi, 0x30, Features::BASE),
	(Mnemonic::Bvc, 0x50, Features::BASE),
	(Mnemonic::Bvs, 0x70, Features::BASE),
	(Mnemonic::Bcc, 0x90, Features::BASE),
	(Mnemonic::Bcs, 0xb0, Features::BASE),
	(Mnemonic::Bne, 0xd0, Features::BASE),
	(Mnemonic::Beq, 0xf0, Features::BASE),
	(Mnemonic::Bra, 0x80, Features::CMOS),
];

/// Rockwell bit instructions; the handler puts the bit number into bits 4 to 6.
const BIT_OPERATIONS: &[(Mnemonic, u8, Mode)] = &[
	(Mnemonic::Rmb, 0x07, Mode::ZERO_PAGE_BIT),
	(Mnemonic::Smb, 0x87, Mode::ZERO_PAGE_BIT),
	(Mnemonic::Bbr, 0x0f, Mode::ZERO_PAGE_BIT_RELATIVE),
	(Mnemonic::Bbs, 0x8f, Mode::ZERO_PAGE_BIT_RELATIVE),
];

/// Conditional jumps: the jump, the branch it uses when the target is in reach, and the inverse branch that skips
/// over an absolute jump otherwise.
pub(super) const CONDITIONAL_JUMPS: &[(Mnemonic, Mnemonic, Mnemonic)] = &[
	(Mnemonic::Jpl, Mnemonic::Bpl, Mnemonic::Bmi),
	(Mnemonic::Jmi, Mnemonic::Bmi, Mnemonic::Bpl),
	(Mnemonic::Jvc, Mnemonic::Bvc, Mnemonic::Bvs),
	(Mnemonic::Jvs, Mnemonic::Bvs, Mnemonic::Bvc),
	(Mnemonic::Jcc, Mnemonic::Bcc, Mnemonic::Bcs),
	(Mnemonic::Jcs, Mnemonic::Bcs, Mnemonic::Bcc),
	(Mnemonic::Jne, Mnemonic::Bne, Mnemonic::Beq),
	(Mnemonic::Jeq, Mnemonic::Beq, Mnemonic::Bne),
];

const QUAD_MEMORY: Mode = Mode::ZERO_PAGE
	.union(Mode::ABSOLUTE)
	.union(Mode::ZERO_PAGE_INDIRECT)
	.union(Mode::INDIRECT_Z)
	.union(Mode::INDIRECT_LONG_Z);
const QUAD_SHIFT: Mode = Mode::NONE
	.union(Mode::ACCUMULATOR)
	.union(Mode::ZERO_PAGE)
	.union(Mode::ZERO_PAGE_X)
	.union(Mode::ABSOLUTE)
	.union(Mode::ABSOLUTE_X);

/// 45GS02 quad instructions: the 8-bit instruction that does the work behind the quad prefix, and the modes the
/// 32-bit form supports.
pub(super) const QUADS: &[(Mnemonic, Mnemonic, Mode)] = &[
	(Mnemonic::Ldq, Mnemonic::Lda, QUAD_MEMORY),
	(Mnemonic::Stq, Mnemonic::Sta, QUAD_MEMORY),
	(Mnemonic::Adcq, Mnemonic::Adc, QUAD_MEMORY),
	(Mnemonic::Sbcq, Mnemonic::Sbc, QUAD_MEMORY),
	(Mnemonic::Andq, Mnemonic::And, QUAD_MEMORY),
	(Mnemonic::Orq, Mnemonic::Ora, QUAD_MEMORY),
	(Mnemonic::Eorq, Mnemonic::Eor, QUAD_MEMORY),
	(Mnemonic::Cmpq, Mnemonic::Cmp, QUAD_MEMORY),
	(Mnemonic::Bitq, Mnemonic::Bit, Mode::ZERO_PAGE.union(Mode::ABSOLUTE)),
	(Mnemonic::Aslq, Mnemonic::Asl, QUAD_SHIFT),
	(Mnemonic::Rolq, Mnemonic::Rol, QUAD_SHIFT),
	(Mnemonic::Lsrq, Mnemonic::Lsr, QUAD_SHIFT),
	(Mnemonic::Rorq, Mnemonic::Ror, QUAD_SHIFT),
	(Mnemonic::Asrq, Mnemonic::Asr, QUAD_SHIFT.difference(Mode::ABSOLUTE).difference(Mode::ABSOLUTE_X)),
	(Mnemonic::Inq, Mnemonic::Inc, QUAD_SHIFT),
	(Mnemonic::Deq, Mnemonic::Dec, QUAD_SHIFT),
];

/// The full opcode forms of an irregular instruction.
pub(super) fn forms(mnemonic: Mnemonic) -> Forms {
	IRREGULAR.iter().find(|(candidate, ..)| *candidate == mnemonic).map(|&(_, _, forms)| forms).unwrap_or_default()
}

/// The union of all modes in a list of forms.
fn modes(forms: Forms) -> Mode {
	forms.iter().fold(Mode::empty(), |modes, (mode, ..)| modes.union(*mode))
}

fn entry(opcode: u8, requires: Features, modes: Mode, handler: Handler<Mos6502>) -> InstructionEntry<Mos6502> {
	InstructionEntry::new(opcode, requires, modes, Mode::empty(), handler)
}

/// Builds the instruction table.
pub(super) fn instruction_table() -> InstructionTable<Mos6502> {
	let mut table = HashMap::new();

	let group_one_modes =
		GROUP_ONE_OFFSETS.iter().fold(Mode::empty(), |modes, (mode, _)| modes.union(*mode)).union(Mode::STACK_INDIRECT_Y);
	for &(mnemonic, opcode) in GROUP_ONE {
		let modes = if mnemonic == Mnemonic::Sta {
			group_one_modes.difference(Mode::IMMEDIATE)
		} else if mnemonic == Mnemonic::Lda {
			group_one_modes
		} else {
			group_one_modes.difference(Mode::STACK_INDIRECT_Y)
		};
		table.insert(mnemonic, entry(opcode, Features::BASE, modes, handler::group_one));
	}

	let read_modify_write_modes = READ_MODIFY_WRITE_OFFSETS.iter().fold(Mode::empty(), |modes, (mode, _)| modes.union(*mode));
	for &(mnemonic, opcode) in READ_MODIFY_WRITE {
		table.insert(mnemonic, entry(opcode, Features::BASE, read_modify_write_modes, handler::read_modify_write));
	}

	for &(mnemonic, requires, forms) in IRREGULAR {
		let entry = entry(0, requires, modes(forms), handler::irregular);
		let entry = if mnemonic == Mnemonic::Phw { entry.immediate(ImmediateWidth::Word) } else { entry };
		table.insert(mnemonic, entry);
	}

	for &(mnemonic, opcode, requires) in IMPLIED {
		table.insert(mnemonic, entry(opcode, requires, Mode::NONE, handler::implied));
	}

	for &(mnemonic, opcode, requires) in BRANCHES {
		table.insert(mnemonic, entry(opcode, requires, Mode::RELATIVE | Mode::RELATIVE_LONG, handler::branch));
	}
	table.insert(Mnemonic::Bsr, entry(0x63, Features::CE02, Mode::RELATIVE_LONG, handler::branch));

	for &(mnemonic, opcode, mode) in BIT_OPERATIONS {
		table.insert(mnemonic, entry(opcode, Features::ROCKWELL, mode, handler::bit_operation));
	}

	for &(mnemonic, ..) in CONDITIONAL_JUMPS {
		table.insert(mnemonic, entry(0, Features::BASE, Mode::ABSOLUTE, handler::long_conditional_jump));
	}

	for &(mnemonic, _, modes) in QUADS {
		let quad = if mnemonic == Mnemonic::Ldq {
			entry(0x42, Features::GS02, modes | Mode::IMMEDIATE, handler::load_quad).immediate(ImmediateWidth::DoubleWord)
		} else {
			entry(0x42, Features::GS02, modes, handler::quad)
		};
		table.insert(mnemonic, quad);
	}

	table
}
