//! Zilog Z80 back end, with the ZX Spectrum Next Z80N extension.

use std::fmt::{self, Display, Formatter};
use std::sync::LazyLock;

use bitflags::bitflags;
use retroasm_derive::{Parse, VariantName};

use crate::VariantName;
use crate::addressing_mode::{AddressingMode, ResolveRequest};
use crate::backend::{Backend, MachineConfig};
use crate::encoder::InstructionTable;
use crate::expression::ParseContext;
use crate::parser::TokenStream;

mod handler;
mod resolver;
mod table;

#[cfg(test)] mod test;

bitflags! {
	/// Optional parts of the instruction set.
	#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
	pub struct Features: u32 {
		/// The documented Z80 instruction set.
		const Z80 = 1 << 0;
		/// ZX Spectrum Next additions.
		const Z80N = 1 << 1;
	}
}

bitflags! {
	/// Z80 operand forms.
	#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
	pub struct Mode: u32 {
		/// No operand.
		const NONE = 1 << 0;
		/// `B C D E H L A`
		const REGISTER = 1 << 1;
		/// `BC DE HL SP`
		const PAIR = 1 << 2;
		/// `AF`
		const ACCUMULATOR_FLAGS = 1 << 3;
		/// `AF'`
		const ALTERNATE_FLAGS = 1 << 4;
		/// `IX IY`
		const INDEX = 1 << 5;
		/// `I R`
		const SPECIAL = 1 << 6;
		/// `NZ Z NC C PO PE P M`
		const CONDITION = 1 << 7;
		/// `n` or `nn`
		const IMMEDIATE = 1 << 8;
		/// `(BC) (DE) (HL) (SP)`
		const REGISTER_INDIRECT = 1 << 9;
		/// `(IX+d) (IY+d)`
		const INDEXED = 1 << 10;
		/// `(C)`
		const PORT_C = 1 << 11;
		/// `(nn)`
		const MEMORY = 1 << 12;
		/// `(n)`
		const PORT = 1 << 13;
		/// `nn` as a jump or call target
		const ADDRESS = 1 << 14;
		/// `e`, a relative jump target
		const RELATIVE = 1 << 15;
	}
}

/// Z80 and Z80N mnemonics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Parse, VariantName)]
#[allow(missing_docs)]
pub enum Mnemonic {
	Ld,
	Push,
	Pop,
	Ex,
	Add,
	Adc,
	Sub,
	Sbc,
	And,
	Xor,
	Or,
	Cp,
	Inc,
	Dec,
	Rlc,
	Rrc,
	Rl,
	Rr,
	Sla,
	Sra,
	Sll,
	Srl,
	Bit,
	Res,
	Set,
	Jp,
	Jr,
	Djnz,
	Call,
	Ret,
	Rst,
	Im,
	In,
	Out,
	Nop,
	Halt,
	Di,
	Ei,
	Exx,
	Daa,
	Cpl,
	Ccf,
	Scf,
	Rlca,
	Rrca,
	Rla,
	Rra,
	Neg,
	Reti,
	Retn,
	Rld,
	Rrd,
	Ldi,
	Ldir,
	Ldd,
	Lddr,
	Cpi,
	Cpir,
	Cpd,
	Cpdr,
	Ini,
	Inir,
	Ind,
	Indr,
	Outi,
	Otir,
	Outd,
	Otdr,
	// Z80N
	Nextreg,
	Mul,
	Test,
	Swapnib,
	Mirror,
	Pixeldn,
	Pixelad,
	Setae,
	Outinb,
	Ldix,
	Ldws,
	Lddx,
	Ldirx,
	Ldpirx,
	Lddrx,
}

impl Display for Mnemonic {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.pad(&self.variant_name().to_ascii_uppercase())
	}
}

/// The Z80 back end.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Z80;

static TABLE: LazyLock<InstructionTable<Z80>> = LazyLock::new(table::instruction_table);

impl Backend for Z80 {
	type Features = Features;
	type Mnemonic = Mnemonic;
	type Mode = Mode;

	const FAMILY: &'static str = "Z80";
	const NARROWING: &'static [(Mode, Mode)] = &[];
	const NO_OPERAND: Mode = Mode::NONE;

	fn table() -> &'static InstructionTable<Self> {
		&TABLE
	}

	fn cpu(name: &str) -> Option<Features> {
		Some(match name.to_ascii_lowercase().as_str() {
			"z80" => Features::Z80,
			"z80n" => Features::Z80 | Features::Z80N,
			_ => return None,
		})
	}

	fn default_features() -> Features {
		Features::Z80
	}

	fn is_reserved(name: &str) -> bool {
		resolver::is_register_or_condition(name)
	}

	fn match_syntax(
		stream: &mut TokenStream,
		context: &mut ParseContext<'_>,
		_config: &MachineConfig<Features>,
		request: &ResolveRequest<Mode>,
	) -> Option<AddressingMode<Mode>> {
		resolver::match_syntax(stream, context, request.allowed)
	}
}
