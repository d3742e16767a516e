//! Retargetable assembler core for 8-bit CPU families.
//!
//! Source text is lexed into tokens and split into statements by the [`assembler`] driver. Instructions are handed to
//! a [`Backend`], which resolves operands into addressing modes and encodes them through its instruction table.
//! Values that are not known yet become patches in the output [`output::Section`] and are filled in when linking.
//!
//! Two back ends exist: [`Mos6502`] for the 6502 up to the MEGA65 45GS02, and [`Z80`] for the Z80 and the Z80N.
#![allow(clippy::module_name_repetitions)]

use std::cmp::min;
use std::sync::Arc;

#[macro_use] mod log;

pub mod addressing_mode;
pub mod assembler;
pub mod backend;
pub mod cli;
pub mod encoder;
mod error;
pub mod expression;
pub mod mos6502;
pub mod output;
pub mod parser;
pub mod symbols;
pub mod z80;

#[cfg(test)] mod test;

pub use assembler::{AssembledProgram, assemble};
pub use backend::{Backend, MachineConfig};
pub use error::{AssemblyCode, AssemblyError};
pub use mos6502::Mos6502;
pub use z80::Z80;

#[cfg(feature = "binaries")]
shadow_rs::shadow!(buildinfo);

/// Provides the name of an enum variant, as written in the source. Used for mnemonics in diagnostics.
pub trait VariantName {
	/// The variant identifier.
	fn variant_name(&self) -> &'static str;
}

/// Assembles source text for back end `B` with its default features and collects all diagnostics.
///
/// # Errors
/// Any error the assembly run produced. Warnings are dropped; use [`assemble`] with your own
/// [`Frontend`](cli::Frontend) to see them.
pub fn run_assembler_on_source<B: Backend>(text: &str, name: &str) -> Result<AssembledProgram, Box<AssemblyError>> {
	let source_code = Arc::new(AssemblyCode::new(text, name));
	let frontend = cli::default_frontend();
	assemble::<B>(&source_code, MachineConfig::new(B::default_features()), &*frontend)
}

/// Assembles and links source text for back end `B`, placing relocatable code at address 0.
///
/// # Errors
/// Assembly and link errors.
pub fn run_assembler<B: Backend>(text: &str, name: &str) -> Result<Vec<u8>, Box<AssemblyError>> {
	run_assembler_on_source::<B>(text, name)?.link(0)
}

/// Formats bytes like a hex editor, 16 per line. With `emphasis`, that byte is highlighted in brackets.
#[must_use]
pub fn pretty_hex(bytes: &[u8], emphasis: Option<usize>) -> String {
	let mut string = String::new();
	// need approximately high nibble + low nibble + ' ' per byte
	string.reserve(bytes.len() * 3);
	let mut index = 0;
	while index * 16 < bytes.len() {
		let start = index * 16;
		let section = &bytes[start .. min(start + 16, bytes.len())];
		for (offset, byte) in section.iter().enumerate() {
			if emphasis == Some(start + offset) {
				string += &format!("[{byte:02X}]");
			} else {
				string += &format!(" {byte:02X}");
			}
		}
		string.push('\n');
		index += 1;
	}
	string
}
