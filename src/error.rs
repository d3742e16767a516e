//! Error and diagnostic types.

use std::num::ParseIntError;
use std::path::PathBuf;
use std::sync::Arc;

use miette::{Diagnostic, MietteError, MietteSpanContents, Severity, SourceCode, SourceSpan, SpanContents};
use thiserror::Error;

use crate::cli::Frontend;
use crate::expression::MemoryAddress;

/// The source code for an assembly error.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct AssemblyCode {
	/// The source text.
	pub text: String,
	/// The source code location; canonicalized if it refers to a file on disk.
	pub name: PathBuf,
}

impl AssemblyCode {
	/// Create a new source code struct by loading a file's contents.
	/// # Errors
	/// If reading the file fails (doesn't exist, permissions wrong, I/O error etc.)
	pub fn from_file(filename: &str) -> Result<Arc<Self>, std::io::Error> {
		let mut path = PathBuf::from(filename);
		if path.is_relative() {
			path = std::env::current_dir()?.join(path);
		}
		path = path.canonicalize()?;
		let contents = std::fs::read_to_string(&path)?;
		Ok(Arc::new(Self { name: path, text: contents }))
	}

	/// Like [`Self::from_file`], but the I/O error is wrapped into an assembly error.
	/// # Errors
	/// If reading the file fails.
	pub fn from_file_or_assembly_error(file_name: &str) -> Result<Arc<Self>, Box<AssemblyError>> {
		Self::from_file(file_name).map_err(|os_error| {
			AssemblyError::FileNotFound {
				os_error,
				file_name: file_name.to_string(),
				src: Arc::new(Self::new(file_name, "<<arguments>>")),
				location: (0, file_name.len()).into(),
			}
			.into()
		})
	}

	/// Create source code from in-memory text.
	#[must_use]
	pub fn new(text: &str, name: &str) -> Self {
		Self { text: text.to_owned(), name: PathBuf::from(name) }
	}

	/// Returns a copy of the file name of this source code.
	#[must_use]
	pub fn file_name(&self) -> String {
		self.name.as_os_str().to_string_lossy().to_string()
	}
}

impl SourceCode for AssemblyCode {
	fn read_span<'a>(
		&'a self,
		span: &SourceSpan,
		context_lines_before: usize,
		context_lines_after: usize,
	) -> Result<Box<dyn SpanContents<'a> + 'a>, MietteError> {
		let result = self.text.read_span(span, context_lines_before, context_lines_after)?;
		let retval = Box::new(MietteSpanContents::new_named(
			self.file_name(),
			result.data(),
			*result.span(),
			result.line(),
			result.column(),
			result.line_count(),
		));
		Ok(retval)
	}
}

/// All types of errors that the assembler can report to the user.
#[derive(Error, Debug, Diagnostic)]
#[allow(clippy::module_name_repetitions, missing_docs)]
pub enum AssemblyError {
	//#region Run-level errors
	#[error("File \"{file_name}\" was not found")]
	#[diagnostic(code(retroasm::file_not_found), severity(Error))]
	FileNotFound {
		#[source]
		os_error:  std::io::Error,
		file_name: String,
		#[source_code]
		src:       Arc<AssemblyCode>,
		#[label("File was requested here")]
		location:  SourceSpan,
	},

	#[error("Assembly failed with {count} error(s)")]
	#[diagnostic(code(retroasm::assembly_failed), severity(Error))]
	AssemblyFailed {
		count:  usize,
		#[related]
		errors: Vec<AssemblyError>,
	},
	//#endregion
	//#region Syntax errors: detected in the lexer and while binding operands
	#[error("Unexpected character {chr}")]
	#[diagnostic(code(retroasm::syntax::unexpected_character), severity(Error))]
	UnexpectedCharacter {
		chr:      char,
		#[label("Unexpected")]
		location: SourceSpan,
		#[source_code]
		src:      Arc<AssemblyCode>,
	},

	#[error("Invalid number: {error}")]
	#[diagnostic(code(retroasm::syntax::invalid_number), severity(Error))]
	InvalidNumber {
		error:    ParseIntError,
		#[label("{error}")]
		location: SourceSpan,
		#[source_code]
		src:      Arc<AssemblyCode>,
	},

	#[error("Unexpected end of input, expected {expected}")]
	#[diagnostic(code(retroasm::syntax::unexpected_end), severity(Error))]
	UnexpectedEndOfInput {
		expected: String,
		#[label("There should be a {expected} here")]
		location: SourceSpan,
		#[source_code]
		src:      Arc<AssemblyCode>,
	},

	#[error("Expected {expected}")]
	#[diagnostic(code(retroasm::syntax::expected_token), severity(Error))]
	ExpectedToken {
		expected: String,
		actual:   String,
		#[label("This {actual} is invalid here")]
		location: SourceSpan,
		#[source_code]
		src:      Arc<AssemblyCode>,
	},

	#[error("Expected an expression")]
	#[diagnostic(code(retroasm::syntax::expected_expression), severity(Error))]
	ExpectedExpression {
		#[label("No valid expression starts here")]
		location: SourceSpan,
		#[source_code]
		src:      Arc<AssemblyCode>,
	},

	#[error("Single '#' is not a valid addressing mode")]
	#[diagnostic(
		code(retroasm::syntax::single_hash_invalid),
		help("Add a number to make this an immediate operand"),
		severity(Error)
	)]
	SingleHashInvalid {
		#[label("This is not an addressing mode")]
		location: SourceSpan,
		#[source_code]
		src:      Arc<AssemblyCode>,
	},

	#[error("`{constant}` is not valid for {typename}")]
	#[diagnostic(code(retroasm::syntax::invalid_constant), severity(Error))]
	InvalidConstant {
		constant: String,
		typename: String,
		#[source_code]
		src:      Arc<AssemblyCode>,
		#[label("Not a valid {typename}")]
		location: SourceSpan,
	},

	#[error("Unknown mnemonic `{name}` for {cpu_family}")]
	#[diagnostic(code(retroasm::syntax::unknown_mnemonic), severity(Error))]
	UnknownMnemonic {
		name:       String,
		cpu_family: String,
		#[label("Not an instruction, directive or label definition")]
		location:   SourceSpan,
		#[source_code]
		src:        Arc<AssemblyCode>,
	},

	#[error("Unknown directive `.{name}`")]
	#[diagnostic(
		code(retroasm::syntax::unknown_directive),
		help("Supported directives are .org, .byte, .word, .long, .dword, .cpu, .basepage and .synth"),
		severity(Error)
	)]
	UnknownDirective {
		name:     String,
		#[label("Unknown directive")]
		location: SourceSpan,
		#[source_code]
		src:      Arc<AssemblyCode>,
	},

	#[error("`{mnemonic}` is missing its {} operand", ordinal(*.operand_index))]
	#[diagnostic(code(retroasm::syntax::missing_operand), severity(Error))]
	MissingOperand {
		mnemonic:      String,
		operand_index: usize,
		#[label("Operand expected after this")]
		location:      SourceSpan,
		#[source_code]
		src:           Arc<AssemblyCode>,
	},

	#[error("There are dangling tokens after this statement")]
	#[diagnostic(code(retroasm::syntax::dangling_tokens), help("Remove these tokens"), severity(Error))]
	DanglingTokens {
		#[label("Dangling tokens here")]
		location: SourceSpan,
		#[source_code]
		src:      Arc<AssemblyCode>,
	},

	#[error("Invalid addressing mode for the {} operand of `{mnemonic}`", ordinal(*.operand_index))]
	#[diagnostic(
		code(retroasm::invalid_addressing_mode),
		severity(Error),
		help("The instruction `{mnemonic}` accepts the modes {} here", .legal_modes.join(", "))
	)]
	InvalidAddressingMode {
		mnemonic:      String,
		operand_index: usize,
		legal_modes:   Vec<String>,
		#[source_code]
		src:           Arc<AssemblyCode>,
		#[label("No addressing mode matches this operand")]
		location:      SourceSpan,
	},
	//#endregion
	//#region Range and width errors
	#[error("The value {value} is out of range for this operand")]
	#[diagnostic(code(retroasm::value_out_of_range), help("Legal values are {low} to {high} inclusive"), severity(Error))]
	ValueOutOfRange {
		value:    MemoryAddress,
		low:      MemoryAddress,
		high:     MemoryAddress,
		#[label("Out of range")]
		location: SourceSpan,
		#[source_code]
		src:      Arc<AssemblyCode>,
	},

	#[error("The address ${value:04X} is outside the base page ${base:04X}-${:04X}", *.base + 0xff)]
	#[diagnostic(
		code(retroasm::outside_base_page),
		help("This addressing mode only reaches the 256 bytes of the base page; use an absolute mode or move the base page"),
		severity(Error)
	)]
	OutsideBasePage {
		value:    MemoryAddress,
		base:     MemoryAddress,
		#[label("Only a base page address is valid here")]
		location: SourceSpan,
		#[source_code]
		src:      Arc<AssemblyCode>,
	},

	#[error("Division by zero")]
	#[diagnostic(code(retroasm::division_by_zero), severity(Error))]
	DivisionByZero {
		#[label("The divisor of this operation is zero")]
		location: SourceSpan,
		#[source_code]
		src:      Arc<AssemblyCode>,
	},

	#[error("The value {value} does not fit into a {width_bits}-bit {}field", if *.signed { "signed " } else { "" })]
	#[diagnostic(code(retroasm::patch_out_of_range), severity(Error))]
	PatchOutOfRange {
		value:      MemoryAddress,
		width_bits: u8,
		signed:     bool,
		#[label("This expression resolved to {value}")]
		location:   SourceSpan,
		#[source_code]
		src:        Arc<AssemblyCode>,
	},

	#[error("Section starting at {section_start:04X} overlaps earlier output, which extends up to {previous_end:04X}")]
	#[diagnostic(
		code(retroasm::overlapping_sections),
		help("Move the origin past the end of the earlier code"),
		severity(Error)
	)]
	OverlappingSections {
		section_start: MemoryAddress,
		previous_end:  MemoryAddress,
		#[label("Section starts here")]
		location:      SourceSpan,
		#[source_code]
		src:           Arc<AssemblyCode>,
	},
	//#endregion
	//#region Capability errors
	#[error("`{mnemonic}` is not available on the active CPU")]
	#[diagnostic(code(retroasm::unsupported_instruction), help("This instruction requires: {required}"), severity(Error))]
	UnsupportedInstruction {
		mnemonic: String,
		required: String,
		#[label("Not supported by {active}")]
		location: SourceSpan,
		active:   String,
		#[source_code]
		src:      Arc<AssemblyCode>,
	},

	#[error("The addressing mode {mode} is not available on the active CPU")]
	#[diagnostic(code(retroasm::unsupported_addressing_mode), help("This addressing mode requires: {required}"), severity(Error))]
	UnsupportedAddressingMode {
		mode:     String,
		required: String,
		#[label("Used here")]
		location: SourceSpan,
		#[source_code]
		src:      Arc<AssemblyCode>,
	},

	#[error("`{mnemonic}` with these operands needs a synthesized instruction sequence, but synthesis is disabled")]
	#[diagnostic(
		code(retroasm::synthesis_disabled),
		help("Enable synthetic instructions with `.synth on` or drop the --no-synth flag"),
		severity(Error)
	)]
	SynthesisDisabled {
		mnemonic: String,
		#[label("No native encoding")]
		location: SourceSpan,
		#[source_code]
		src:      Arc<AssemblyCode>,
	},
	//#endregion
	//#region Symbol errors
	#[error("Symbol '{name}' is defined more than once")]
	#[diagnostic(code(retroasm::redefined_symbol), severity(Error))]
	RedefinedSymbol {
		name:     String,
		#[label("Redefined here")]
		location: SourceSpan,
		#[label("First defined here")]
		previous: SourceSpan,
		#[source_code]
		src:      Arc<AssemblyCode>,
	},

	#[error("Symbol '{name}' can not be resolved to a value")]
	#[diagnostic(
		code(retroasm::unresolved_symbol),
		help("Any symbol must be defined somewhere. Did you misspell the symbol's name?"),
		severity(Error)
	)]
	UnresolvedSymbol {
		name:     String,
		#[label("Used here")]
		location: SourceSpan,
		#[source_code]
		src:      Arc<AssemblyCode>,
	},

	#[error("Symbol '{name}' is defined in terms of itself")]
	#[diagnostic(code(retroasm::recursive_symbol), severity(Error))]
	RecursiveSymbol {
		name:     String,
		#[label("Resolving this needs its own value")]
		location: SourceSpan,
		#[source_code]
		src:      Arc<AssemblyCode>,
	},
	//#endregion
	//#region Internal invariant violations; these abort the run
	#[error("Operand resolved to more than one addressing mode: {modes}")]
	#[diagnostic(
		code(retroasm::internal::ambiguous_addressing_mode),
		help("This is an assembler bug; the instruction table admits two modes with the same syntax"),
		severity(Error)
	)]
	AmbiguousAddressingMode {
		modes:    String,
		#[label("Ambiguous operand")]
		location: SourceSpan,
		#[source_code]
		src:      Arc<AssemblyCode>,
	},

	#[error("No instruction table entry for `{mnemonic}`")]
	#[diagnostic(
		code(retroasm::internal::missing_table_entry),
		help("This is an assembler bug; every mnemonic must have a table entry"),
		severity(Error)
	)]
	MissingTableEntry {
		mnemonic: String,
		#[label("For this instruction")]
		location: SourceSpan,
		#[source_code]
		src:      Arc<AssemblyCode>,
	},
	//#endregion
	//#region Test-only errors
	#[cfg(test)]
	#[error("Test comment has invalid format")]
	#[diagnostic(
		code(retroasm::syntax::invalid_test_comment),
		help(
			"Test comments consist of a series of space-delimited bytes, given as hexadecimal, for example `;= 0F AA \
			 B8` for three bytes"
		),
		severity(Error)
	)]
	InvalidTestComment {
		#[label("This ';=' comment is invalid: {basis}")]
		location: SourceSpan,
		#[source_code]
		src:      Arc<AssemblyCode>,
		basis:    ParseIntError,
	},
	//#endregion
	//#region Warnings and advice
	#[error(
		"The value {value:02X} is being used as a {size}-bit operand here, but it is larger than this. The extra \
		 upper bits are truncated."
	)]
	#[diagnostic(code(retroasm::value_too_large), help("Remove these upper bits"), severity(Warning))]
	ValueTooLarge {
		value:    MemoryAddress,
		size:     u8,
		#[label("{size}-bit operand")]
		location: SourceSpan,
		#[source_code]
		src:      Arc<AssemblyCode>,
	},

	#[error("`{mnemonic}` was expanded into {count} instructions")]
	#[diagnostic(code(retroasm::synthesized_instruction), severity(Advice))]
	SynthesizedInstruction {
		mnemonic: String,
		count:    usize,
		#[label("Synthesized")]
		location: SourceSpan,
		#[source_code]
		src:      Arc<AssemblyCode>,
	},
	//#endregion
}

const fn ordinal(index: usize) -> &'static str {
	match index {
		0 => "first",
		1 => "second",
		_ => "third",
	}
}

impl AssemblyError {
	/// Report this diagnostic through the frontend, or hand it back as an error if the frontend (or the diagnostic's
	/// own severity) says it must stop the current statement.
	/// # Errors
	/// If this diagnostic is an error under the frontend's policy.
	pub fn report_or_throw(self, options: &dyn Frontend) -> Result<(), Box<Self>> {
		if self.is_error(options) {
			return Err(self.into());
		}
		options.report_diagnostic(self);
		Ok(())
	}

	/// Whether this diagnostic counts as an error, either by its own severity or through promotion by the frontend.
	#[must_use]
	pub fn is_error(&self, options: &dyn Frontend) -> bool {
		self.severity().unwrap_or(Severity::Error) == Severity::Error || options.is_error(self)
	}

	/// Whether this diagnostic is an internal invariant violation, which aborts the whole run instead of only the
	/// current statement.
	#[must_use]
	pub const fn is_internal(&self) -> bool {
		matches!(self, Self::AmbiguousAddressingMode { .. } | Self::MissingTableEntry { .. })
	}

	/// Returns the diagnostic code as a string, e.g. `retroasm::value_out_of_range`.
	#[must_use]
	pub fn code_string(&self) -> String {
		self.code().map(|code| code.to_string()).unwrap_or_default()
	}
}
