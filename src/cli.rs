//! Command-line interface related structures, and the frontend abstraction through which diagnostics leave the
//! assembler.

use std::fmt::Debug;
use std::sync::Arc;

use miette::Diagnostic;
use parking_lot::Mutex;

use crate::AssemblyError;

/// Interface between the assembler and whatever presents its diagnostics. The assembler never prints anything
/// itself; it asks the frontend about warning policy and hands every diagnostic to it.
pub trait Frontend: Debug + Send + Sync {
	/// Whether the given warning should be promoted to an error.
	fn is_error(&self, warning: &AssemblyError) -> bool;
	/// Whether the given warning should be silenced.
	fn is_ignored(&self, warning: &AssemblyError) -> bool;
	/// Receives a diagnostic that passed the ignore filter.
	fn report_diagnostic_impl(&self, diagnostic: AssemblyError);

	/// Report a diagnostic. Errors are always passed on, warnings and advice only if they are not ignored.
	fn report_diagnostic(&self, diagnostic: AssemblyError) {
		if matches!(diagnostic.severity(), Some(miette::Severity::Error) | None) || !self.is_ignored(&diagnostic) {
			self.report_diagnostic_impl(diagnostic);
		}
	}
}

/// Frontend that keeps every reported diagnostic for later inspection. This is the default for library use.
#[derive(Debug, Default)]
pub struct DiagnosticCollector {
	/// The reported diagnostics, in report order.
	pub diagnostics: Mutex<Vec<AssemblyError>>,
	/// Warning codes that are turned into errors.
	pub error_codes: Vec<String>,
	/// Warning codes that are silenced.
	pub ignored_codes: Vec<String>,
}

impl DiagnosticCollector {
	/// Removes and returns all diagnostics collected so far.
	pub fn take(&self) -> Vec<AssemblyError> {
		std::mem::take(&mut *self.diagnostics.lock())
	}

	/// Number of diagnostics collected so far.
	#[must_use]
	pub fn len(&self) -> usize {
		self.diagnostics.lock().len()
	}

	/// Whether nothing was reported.
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl Frontend for DiagnosticCollector {
	fn is_error(&self, warning: &AssemblyError) -> bool {
		code_matches(&self.error_codes, warning)
	}

	fn is_ignored(&self, warning: &AssemblyError) -> bool {
		code_matches(&self.ignored_codes, warning)
	}

	fn report_diagnostic_impl(&self, diagnostic: AssemblyError) {
		self.diagnostics.lock().push(diagnostic);
	}
}

const error_prefix: &str = "retroasm::";

/// Checks a diagnostic against a list of user-given codes. Codes may omit the `retroasm::` prefix, and `all` matches
/// everything.
fn code_matches(codes: &[String], diagnostic: &AssemblyError) -> bool {
	let code = diagnostic.code_string();
	codes.iter().any(|given| {
		given == "all" || *given == code || code.strip_prefix(error_prefix).is_some_and(|short| short == given)
	})
}

/// Returns a default frontend that collects diagnostics without any warning policy.
#[must_use]
pub fn default_frontend() -> Arc<DiagnosticCollector> {
	Arc::new(DiagnosticCollector::default())
}

#[cfg(feature = "binaries")]
mod clap_dependent {
	use std::path::PathBuf;

	use clap::{Args, Parser, ValueEnum};

	use super::{Frontend, code_matches};
	use crate::AssemblyError;
	use crate::expression::MemoryAddress;

	/// Specification of which warnings to silence and which to promote.
	#[derive(Debug, Clone, Eq, PartialEq, Default, Args)]
	pub struct ErrorOptions {
		/// Warnings to silence. Use `all` to silence every warning.
		#[arg(long, short = 'w', num_args = 1, action = clap::ArgAction::Append)]
		pub ignore: Vec<String>,
		/// Warnings to turn into a hard error. Use `all` to promote every warning.
		#[arg(long, short = 'W', num_args = 1, action = clap::ArgAction::Append)]
		pub error:  Vec<String>,
	}

	/// Frontend that prints diagnostics to standard error through miette's graphical handler.
	#[derive(Debug, Clone)]
	pub struct TerminalFrontend {
		/// Warning policy.
		pub options: ErrorOptions,
	}

	impl Frontend for TerminalFrontend {
		fn is_error(&self, warning: &AssemblyError) -> bool {
			code_matches(&self.options.error, warning)
		}

		fn is_ignored(&self, warning: &AssemblyError) -> bool {
			code_matches(&self.options.ignore, warning)
		}

		fn report_diagnostic_impl(&self, diagnostic: AssemblyError) {
			eprintln!("{:?}", miette::Report::new(diagnostic));
		}
	}

	/// Retargetable assembler for 8-bit CPU families.
	#[derive(Parser)]
	#[command(version = crate::buildinfo::PKG_VERSION, about, long_about = None)]
	pub struct RetroasmCli {
		/// Assembly file to assemble, or `-` to read from standard input.
		pub input:                 PathBuf,
		/// Binary output file. Standard output is used if this is not given.
		pub output:                Option<PathBuf>,
		/// CPU to assemble for. This selects the back end and its initial feature set; `.cpu` can change the
		/// feature set within the same family later.
		#[arg(long, short = 'c', default_value = "6502")]
		pub cpu:                   Cpu,
		/// Format to output to.
		///
		/// - plain: Output just the binary data.
		///
		/// - hexdump: Dump hexadecimal representation in a pretty format like in a hex editor.
		#[arg(long, short = 'f', default_value = "plain")]
		pub output_format:         OutputFormat,
		/// Load address for code that never sets an origin with `.org`.
		#[arg(long, short = 'b', default_value = "0", value_parser = parse_address)]
		pub base:                  MemoryAddress,
		/// Reject anything that needs a synthesized instruction sequence.
		#[arg(long)]
		pub no_synth:              bool,
		/// Verbosity level to use.
		#[arg(long, short, action = clap::ArgAction::Count)]
		pub verbose:               u8,
		#[command(flatten)]
		pub warning_flags:         ErrorOptions,
	}

	/// The CPUs selectable on the command line.
	#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
	pub enum Cpu {
		/// NMOS 6502.
		#[value(name = "6502")]
		Mos6502,
		/// CMOS 65C02 with the Rockwell bit instructions.
		#[value(name = "65c02")]
		Wdc65c02,
		/// CSG 65CE02.
		#[value(name = "65ce02")]
		Csg65ce02,
		/// CSG 4510, a 65CE02 core with MAP.
		#[value(name = "4510")]
		Csg4510,
		/// MEGA65 45GS02.
		#[value(name = "45gs02")]
		Mega45gs02,
		/// Zilog Z80.
		#[value(name = "z80")]
		Z80,
		/// ZX Spectrum Next Z80N.
		#[value(name = "z80n")]
		Z80n,
	}

	impl Cpu {
		/// Name used by the back end's `.cpu` table.
		#[must_use]
		pub const fn name(self) -> &'static str {
			match self {
				Self::Mos6502 => "6502",
				Self::Wdc65c02 => "65c02",
				Self::Csg65ce02 => "65ce02",
				Self::Csg4510 => "4510",
				Self::Mega45gs02 => "45gs02",
				Self::Z80 => "z80",
				Self::Z80n => "z80n",
			}
		}
	}

	/// Output formats.
	#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
	#[repr(u8)]
	pub enum OutputFormat {
		/// Raw binary.
		Plain,
		/// Hex dump.
		#[value(name = "hexdump")]
		HexDump,
	}

	fn parse_address(text: &str) -> Result<MemoryAddress, String> {
		let (digits, radix) = if let Some(hex) = text.strip_prefix('$').or_else(|| text.strip_prefix("0x")) {
			(hex, 16)
		} else {
			(text, 10)
		};
		let address = MemoryAddress::from_str_radix(digits, radix).map_err(|error| error.to_string())?;
		if (0 ..= 0xffff).contains(&address) { Ok(address) } else { Err(format!("{text} is not a 16-bit address")) }
	}
}

#[cfg(feature = "binaries")]
pub use clap_dependent::*;
