//! MOS 6502 family back end: NMOS 6502, 65C02 with the Rockwell bit instructions, 65CE02/4510 and the MEGA65 45GS02.

use std::fmt::{self, Display, Formatter};
use std::sync::{Arc, LazyLock};

use bitflags::bitflags;
use miette::SourceSpan;
use retroasm_derive::{Parse, VariantName};

use crate::addressing_mode::{AddressingMode, ResolveRequest};
use crate::backend::{Backend, MachineConfig};
use crate::encoder::InstructionTable;
use crate::expression::ParseContext;
use crate::parser::TokenStream;
use crate::{AssemblyCode, VariantName};

mod handler;
mod resolver;
mod table;

#[cfg(test)] mod test;

bitflags! {
	/// Optional parts of the instruction set.
	#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
	pub struct Features: u32 {
		/// The NMOS 6502 instruction set.
		const BASE = 1 << 0;
		/// 65C02 additions: `(zp)`, `(abs,X)`, STZ, BRA, PHX and friends.
		const CMOS = 1 << 1;
		/// RMB, SMB, BBR and BBS.
		const ROCKWELL = 1 << 2;
		/// 65CE02 additions: the Z and B registers, 16-bit branches, word operations, `(d,SP),Y`.
		const CE02 = 1 << 3;
		/// 45GS02 additions: 32-bit quad operations and `[zp],Z`.
		const GS02 = 1 << 4;
	}
}

bitflags! {
	/// 65xx addressing modes.
	#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
	pub struct Mode: u32 {
		/// No operand.
		const NONE = 1 << 0;
		/// `A`
		const ACCUMULATOR = 1 << 1;
		/// `#byte`
		const IMMEDIATE = 1 << 2;
		/// `#word`
		const IMMEDIATE_WORD = 1 << 3;
		/// `zp`
		const ZERO_PAGE = 1 << 4;
		/// `zp,X`
		const ZERO_PAGE_X = 1 << 5;
		/// `zp,Y`
		const ZERO_PAGE_Y = 1 << 6;
		/// `abs`
		const ABSOLUTE = 1 << 7;
		/// `abs,X`
		const ABSOLUTE_X = 1 << 8;
		/// `abs,Y`
		const ABSOLUTE_Y = 1 << 9;
		/// `(abs)`
		const INDIRECT = 1 << 10;
		/// `(zp)`
		const ZERO_PAGE_INDIRECT = 1 << 11;
		/// `(zp,X)`
		const INDEXED_INDIRECT = 1 << 12;
		/// `(abs,X)`
		const ABSOLUTE_INDEXED_INDIRECT = 1 << 13;
		/// `(zp),Y`
		const INDIRECT_INDEXED = 1 << 14;
		/// `(zp),Z`
		const INDIRECT_Z = 1 << 15;
		/// `[zp],Z` or `[zp]`, 32-bit pointer
		const INDIRECT_LONG_Z = 1 << 16;
		/// `(d,SP),Y`
		const STACK_INDIRECT_Y = 1 << 17;
		/// 8-bit branch target
		const RELATIVE = 1 << 18;
		/// 16-bit branch target
		const RELATIVE_LONG = 1 << 19;
		/// `bit,zp`
		const ZERO_PAGE_BIT = 1 << 20;
		/// `bit,zp,target`
		const ZERO_PAGE_BIT_RELATIVE = 1 << 21;
	}
}

/// 65xx mnemonics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Parse, VariantName)]
#[allow(missing_docs)]
pub enum Mnemonic {
	// Group one
	Ora,
	And,
	Eor,
	Adc,
	Sta,
	Lda,
	Cmp,
	Sbc,
	// Read-modify-write
	Asl,
	Rol,
	Lsr,
	Ror,
	Dec,
	Inc,
	// Irregular operands
	Ldx,
	Stx,
	Ldy,
	Sty,
	Cpx,
	Cpy,
	Bit,
	Ldz,
	Cpz,
	Stz,
	Tsb,
	Trb,
	Jmp,
	Jsr,
	Phw,
	Asw,
	Row,
	Inw,
	Dew,
	Asr,
	Rtn,
	// Implied
	Nop,
	Brk,
	Rti,
	Rts,
	Clc,
	Sec,
	Cli,
	Sei,
	Clv,
	Cld,
	Sed,
	Dex,
	Dey,
	Inx,
	Iny,
	Tax,
	Txa,
	Tay,
	Tya,
	Tsx,
	Txs,
	Pha,
	Pla,
	Php,
	Plp,
	Phx,
	Plx,
	Phy,
	Ply,
	Cle,
	See,
	Tsy,
	Inz,
	Tys,
	Dez,
	Neg,
	Taz,
	Tab,
	Tza,
	Tba,
	Phz,
	Plz,
	Map,
	// Branches
	Bpl,
	Bmi,
	Bvc,
	Bvs,
	Bcc,
	Bcs,
	Bne,
	Beq,
	Bra,
	Bsr,
	// Rockwell bit operations
	Rmb,
	Smb,
	Bbr,
	Bbs,
	// 45GS02 quad operations
	Ldq,
	Stq,
	Adcq,
	Sbcq,
	Andq,
	Orq,
	Eorq,
	Cmpq,
	Bitq,
	Aslq,
	Rolq,
	Lsrq,
	Rorq,
	Asrq,
	Inq,
	Deq,
	// Conditional jumps of any distance
	Jpl,
	Jmi,
	Jvc,
	Jvs,
	Jcc,
	Jcs,
	Jne,
	Jeq,
}

impl Display for Mnemonic {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.pad(&self.variant_name().to_ascii_uppercase())
	}
}

/// The 65xx back end.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Mos6502;

static TABLE: LazyLock<InstructionTable<Mos6502>> = LazyLock::new(table::instruction_table);

impl Backend for Mos6502 {
	type Features = Features;
	type Mnemonic = Mnemonic;
	type Mode = Mode;

	const FAMILY: &'static str = "6502";
	const NARROWING: &'static [(Mode, Mode)] = &[
		(Mode::ABSOLUTE, Mode::ZERO_PAGE),
		(Mode::ABSOLUTE_X, Mode::ZERO_PAGE_X),
		(Mode::ABSOLUTE_Y, Mode::ZERO_PAGE_Y),
		(Mode::INDIRECT, Mode::ZERO_PAGE_INDIRECT),
		(Mode::ABSOLUTE_INDEXED_INDIRECT, Mode::INDEXED_INDIRECT),
	];
	const NO_OPERAND: Mode = Mode::NONE;

	fn table() -> &'static InstructionTable<Self> {
		&TABLE
	}

	fn cpu(name: &str) -> Option<Features> {
		let cmos = Features::BASE.union(Features::CMOS).union(Features::ROCKWELL);
		Some(match name.to_ascii_lowercase().as_str() {
			"6502" => Features::BASE,
			"65c02" => cmos,
			"65ce02" | "4510" => cmos.union(Features::CE02),
			"45gs02" => Features::all(),
			_ => return None,
		})
	}

	fn default_features() -> Features {
		Features::BASE
	}

	fn is_reserved(name: &str) -> bool {
		["a", "x", "y", "z", "sp"].iter().any(|register| name.eq_ignore_ascii_case(register))
	}

	fn mnemonic(name: &str, location: SourceSpan, src: &Arc<AssemblyCode>) -> Option<(Mnemonic, Option<u8>)> {
		let lowercase = name.to_ascii_lowercase();
		// rmb0-rmb7, smb0-smb7, bbr0-bbr7 and bbs0-bbs7 carry the bit number.
		if lowercase.len() == 4
			&& let Some(bit) = lowercase[3 ..].parse::<u8>().ok().filter(|bit| *bit < 8)
		{
			let mnemonic = match &lowercase[.. 3] {
				"rmb" => Mnemonic::Rmb,
				"smb" => Mnemonic::Smb,
				"bbr" => Mnemonic::Bbr,
				"bbs" => Mnemonic::Bbs,
				_ => return None,
			};
			return Some((mnemonic, Some(bit)));
		}
		if !<Mnemonic as crate::parser::Parse>::is_valid(&lowercase) {
			return None;
		}
		<Mnemonic as crate::parser::Parse>::parse(&lowercase, location, src.clone()).ok().map(|mnemonic| (mnemonic, None))
	}

	fn match_syntax(
		stream: &mut TokenStream,
		context: &mut ParseContext<'_>,
		config: &MachineConfig<Features>,
		request: &ResolveRequest<Mode>,
	) -> Option<AddressingMode<Mode>> {
		resolver::match_syntax(stream, context, config, request)
	}

	fn mode_requirement(mode: Mode) -> Features {
		if mode.intersects(Mode::ZERO_PAGE_INDIRECT | Mode::ABSOLUTE_INDEXED_INDIRECT) {
			Features::CMOS
		} else if mode.intersects(Mode::ZERO_PAGE_BIT | Mode::ZERO_PAGE_BIT_RELATIVE) {
			Features::ROCKWELL
		} else if mode
			.intersects(Mode::INDIRECT_Z | Mode::STACK_INDIRECT_Y | Mode::RELATIVE_LONG | Mode::IMMEDIATE_WORD)
		{
			Features::CE02
		} else if mode.intersects(Mode::INDIRECT_LONG_Z) {
			Features::GS02
		} else {
			Features::BASE
		}
	}
}
