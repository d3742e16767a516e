//! The plug-in contract between the shared assembler core and a CPU family.

use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::ops::RangeInclusive;
use std::sync::Arc;

use bitflags::Flags;
use miette::SourceSpan;

use crate::addressing_mode::{AddressingMode, ResolveRequest};
use crate::encoder::InstructionTable;
use crate::expression::{MemoryAddress, ParseContext};
use crate::parser::{Parse, TokenStream};
use crate::AssemblyCode;

/// A CPU family. Implementors supply vocabulary (mnemonics, addressing modes, features), the operand grammar and the
/// instruction table; the core supplies everything else.
pub trait Backend: Sized + 'static {
	/// Mnemonics of this family. `Display` is the canonical upper-case spelling.
	type Mnemonic: Copy + Eq + Hash + Debug + Display + Parse + Send + Sync + 'static;
	/// Addressing modes, one flag each. Masks of several flags describe what an operand slot allows.
	type Mode: Flags<Bits = u32> + Copy + Eq + Debug + Send + Sync + 'static;
	/// CPU features that instructions and addressing modes can require.
	type Features: Flags<Bits = u32> + Copy + Eq + Debug + Send + Sync + 'static;

	/// Family name for diagnostics.
	const FAMILY: &'static str;
	/// The mode of an absent operand.
	const NO_OPERAND: Self::Mode;
	/// Pairs of (wide, narrow) modes with identical syntax that differ only in address width. The narrow mode reaches
	/// the current base page.
	const NARROWING: &'static [(Self::Mode, Self::Mode)];
	/// The last address of the CPU's address space. Origins beyond it are rejected.
	const HIGHEST_ADDRESS: MemoryAddress = 0xffff;

	/// The instruction table. Every mnemonic must have an entry.
	fn table() -> &'static InstructionTable<Self>;

	/// Feature set of a CPU, by its lower-case name as used by `.cpu` and `--cpu`.
	fn cpu(name: &str) -> Option<Self::Features>;

	/// Features active before any `.cpu` directive.
	fn default_features() -> Self::Features;

	/// Whether an identifier is a register or condition name that never refers to a symbol.
	fn is_reserved(name: &str) -> bool;

	/// Finds a mnemonic by name. Some families fold an operand into the mnemonic, e.g. the bit number of `bbr3`,
	/// which is returned as the implied index.
	fn mnemonic(name: &str, location: SourceSpan, src: &Arc<AssemblyCode>) -> Option<(Self::Mnemonic, Option<u8>)> {
		let lowercase = name.to_ascii_lowercase();
		if !Self::Mnemonic::is_valid(&lowercase) {
			return None;
		}
		Self::Mnemonic::parse(&lowercase, location, src.clone()).ok().map(|mnemonic| (mnemonic, None))
	}

	/// Tries the operand syntax forms of this family in priority order and returns the first that matches. Forms
	/// that cannot produce any mode in `request.allowed` are skipped. On `None`, the caller restores the stream.
	fn match_syntax(
		stream: &mut TokenStream,
		context: &mut ParseContext<'_>,
		config: &MachineConfig<Self::Features>,
		request: &ResolveRequest<Self::Mode>,
	) -> Option<AddressingMode<Self::Mode>>;

	/// Features an addressing mode needs, independent of the instruction using it.
	fn mode_requirement(_mode: Self::Mode) -> Self::Features {
		Self::Features::empty()
	}
}

/// Ambient machine state. Read-only while a statement is assembled; directives change it between statements.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MachineConfig<F> {
	/// Active CPU features.
	pub features:               F,
	/// Page number (high byte) of the base page that short addressing modes reach.
	pub base_page:              MemoryAddress,
	/// Whether instructions without a native encoding may be synthesized from several native ones.
	pub synthetic_instructions: bool,
}

impl<F> MachineConfig<F> {
	/// A configuration with the base page at page zero and synthesis enabled.
	pub const fn new(features: F) -> Self {
		Self { features, base_page: 0, synthetic_instructions: true }
	}

	/// The addresses the base page covers.
	#[must_use]
	pub const fn base_page_window(&self) -> RangeInclusive<MemoryAddress> {
		let start = self.base_page * 0x100;
		start ..= start + 0xff
	}

	/// First address of the base page.
	#[must_use]
	pub const fn base_address(&self) -> MemoryAddress {
		self.base_page * 0x100
	}
}

/// Human-readable names of all flags set in a mask, e.g. `zero page x` for `ZERO_PAGE_X`.
pub fn flag_names<F: Flags>(flags: F) -> Vec<String> {
	flags.iter_names().map(|(name, _)| name.to_ascii_lowercase().replace('_', " ")).collect()
}
