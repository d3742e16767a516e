//! [`AddressingMode`] descriptors and the family-independent half of operand resolution.

use bitflags::Flags;
use miette::SourceSpan;

use crate::backend::{Backend, MachineConfig, flag_names};
use crate::expression::{Expression, ParseContext};
use crate::parser::TokenStream;
use crate::{AssemblyError, trace};

/// A resolved operand: exactly one addressing mode plus whatever the mode carries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddressingMode<M> {
	/// The mode, a single flag.
	pub mode:        M,
	/// Up to three expressions: an address or immediate, a displacement, or bit number, address and branch target.
	pub operands:    Vec<Expression>,
	/// Register number, condition number or similar small index the mode selects.
	pub register:    Option<u8>,
	/// The source forced the width with a prefix such as `<` or `|`; such operands are never narrowed.
	pub size_forced: bool,
	/// Source location of the operand.
	pub span:        SourceSpan,
}

impl<M: Flags<Bits = u32> + Copy> AddressingMode<M> {
	/// A mode without expressions.
	#[must_use]
	pub const fn new(mode: M, span: SourceSpan) -> Self {
		Self { mode, operands: Vec::new(), register: None, size_forced: false, span }
	}

	/// A mode with one expression.
	#[must_use]
	pub fn with_value(mode: M, value: Expression, span: SourceSpan) -> Self {
		Self { mode, operands: vec![value], register: None, size_forced: false, span }
	}

	/// A register-selecting mode.
	#[must_use]
	pub const fn with_register(mode: M, register: u8, span: SourceSpan) -> Self {
		Self { mode, operands: Vec::new(), register: Some(register), size_forced: false, span }
	}

	/// Adds an expression.
	#[must_use]
	pub fn and_value(mut self, value: Expression) -> Self {
		self.operands.push(value);
		self
	}

	/// Marks the width as forced by the source.
	#[must_use]
	pub const fn forced(mut self, size_forced: bool) -> Self {
		self.size_forced = size_forced;
		self
	}

	/// The `index`th expression. Handlers only ask for expressions their mode carries; a missing one reads as zero.
	#[must_use]
	pub fn value(&self, index: usize) -> Expression {
		debug_assert!(index < self.operands.len(), "mode {:?} has no operand {index}", self.mode.bits());
		self.operands.get(index).cloned().unwrap_or_else(|| Expression::constant(0, self.span))
	}

	/// The register index, or zero.
	#[must_use]
	pub fn register(&self) -> u8 {
		self.register.unwrap_or_default()
	}

	/// Whether this is the given mode.
	#[must_use]
	pub fn is(&self, mode: M) -> bool {
		self.mode.bits() == mode.bits()
	}
}

/// How wide an immediate operand of the instruction is.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ImmediateWidth {
	/// 8 bits.
	#[default]
	Byte,
	/// 16 bits.
	Word,
	/// 32 bits.
	DoubleWord,
}

/// The constraints of one operand slot.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ResolveRequest<M> {
	/// Mask of the modes the slot allows.
	pub allowed:         M,
	/// Width of immediates in this slot.
	pub immediate_width: ImmediateWidth,
	/// An operand implied by the mnemonic itself, such as the bit number of `bbr3`.
	pub implied_index:   Option<u8>,
}

/// Resolves one operand. On `Ok(None)`, the stream is exactly where it was before the call; diagnostics explaining the
/// failure, if any, are in the context.
/// # Errors
/// Only internal invariant violations: a back end produced a descriptor with more than one mode.
pub fn resolve<B: Backend>(
	stream: &mut TokenStream,
	context: &mut ParseContext<'_>,
	config: &MachineConfig<B::Features>,
	request: &ResolveRequest<B::Mode>,
) -> Result<Option<AddressingMode<B::Mode>>, Box<AssemblyError>> {
	let start = stream.bookmark();
	trace!("resolving {:?} from {}", flag_names(request.allowed), stream.peek());

	let Some(mut resolved) = B::match_syntax(stream, context, config, request) else {
		stream.restore(start);
		return Ok(None);
	};
	if resolved.mode.bits().count_ones() != 1 {
		return Err(AssemblyError::AmbiguousAddressingMode {
			modes:    flag_names(resolved.mode).join(", "),
			location: resolved.span,
			src:      context.source_code.clone(),
		}
		.into());
	}
	if !resolved.size_forced && !narrow::<B>(&mut resolved, request.allowed, config, context) {
		stream.restore(start);
		return Ok(None);
	}
	if !request.allowed.contains(resolved.mode) {
		trace!("{:?} not allowed here", flag_names(resolved.mode));
		stream.restore(start);
		return Ok(None);
	}
	Ok(Some(resolved))
}

/// The width-narrowing pass. Runs once, after the syntax match. Returns false if the operand is unusable: a constant
/// outside the base page where only the narrow mode is allowed.
fn narrow<B: Backend>(
	resolved: &mut AddressingMode<B::Mode>,
	allowed: B::Mode,
	config: &MachineConfig<B::Features>,
	context: &mut ParseContext<'_>,
) -> bool {
	let Some(&(wide, narrow)) = B::NARROWING.iter().find(|(wide, _)| resolved.is(*wide)) else {
		return true;
	};
	if !allowed.contains(narrow) || resolved.operands.is_empty() {
		return true;
	}
	let wide_allowed = allowed.contains(wide);
	let address = resolved.operands.remove(0);
	let (mode, address) = match address.value() {
		Some(value) if config.base_page_window().contains(&value) => {
			log::debug!("narrowing {:?} operand {value:#x} to the base page", flag_names(wide));
			(narrow, address.mask(8))
		},
		Some(value) if !wide_allowed => {
			context.errors.push(AssemblyError::OutsideBasePage {
				value,
				base: config.base_address(),
				location: address.span(),
				src: context.source_code.clone(),
			});
			return false;
		},
		// Only the link step can check this address, through the base page patch width.
		None if !wide_allowed => (narrow, address.offset_by(-config.base_address())),
		_ => (wide, address),
	};
	resolved.mode = mode;
	resolved.operands.insert(0, address);
	true
}

#[cfg(test)]
mod test {
	use std::collections::HashMap;
	use std::sync::{Arc, LazyLock};

	use proptest::prelude::*;

	use super::*;
	use crate::encoder::InstructionTable;
	use crate::parser::lex;
	use crate::symbols::SymbolTable;
	use crate::{AssemblyCode, Mos6502, Z80, mos6502, z80};

	/// Runs [`resolve`] on operand text and reports whether the cursor moved.
	fn resolve_text<B: Backend>(
		text: &str,
		features: B::Features,
		request: &ResolveRequest<B::Mode>,
	) -> (Result<Option<AddressingMode<B::Mode>>, Box<AssemblyError>>, bool) {
		let source = Arc::new(AssemblyCode::new(text, "<test>"));
		let mut stream = TokenStream::new(lex(&source).unwrap(), text.len());
		let symbols = SymbolTable::default();
		let mut context = ParseContext::new(&symbols, Expression::constant(0, (0, 0).into()), &source, B::is_reserved);
		let before = stream.bookmark();
		let result = resolve::<B>(&mut stream, &mut context, &MachineConfig::new(features), request);
		(result, stream.bookmark() != before)
	}

	const fn request<M>(allowed: M) -> ResolveRequest<M> {
		ResolveRequest { allowed, immediate_width: ImmediateWidth::Byte, implied_index: None }
	}

	/// Everything except the branch and bit forms, which take over the whole operand when allowed.
	fn addresses() -> ResolveRequest<mos6502::Mode> {
		request(mos6502::Mode::all().difference(
			mos6502::Mode::RELATIVE
				| mos6502::Mode::RELATIVE_LONG
				| mos6502::Mode::ZERO_PAGE_BIT
				| mos6502::Mode::ZERO_PAGE_BIT_RELATIVE,
		))
	}

	const MOS6502_OPERANDS: &[&str] = &[
		"", "a", "x", "#$12", "#", "$12", "$1234", "$12,x", "$1234,y", "<$1234", "|$12", ">$12", "($12),y", "($12),z",
		"($12,x)", "($1234)", "($1234,x)", "($12,sp),y", "[$12],z", "[$12]", "(", "($12", "($12),", "$12,", "label,x",
		"7,$12,0", "$12,*", "(5)+1",
	];

	const Z80_OPERANDS: &[&str] = &[
		"", "a", "b", "hl", "bc", "af", "af'", "ix", "i", "r", "nz", "pe", "(hl)", "(bc)", "(sp)", "(ix+5)", "(iy-2)",
		"(ix)", "(c)", "($1234)", "(5)+1", "$1234", "#5", "(ix", "(hl", "5,3", "label",
	];

	proptest! {
		#[test]
		fn mos6502_resolution_is_pure_or_exclusive(
			text in prop::sample::select(MOS6502_OPERANDS),
			allowed in any::<u32>().prop_map(mos6502::Mode::from_bits_truncate),
		) {
			let (result, moved) = resolve_text::<Mos6502>(text, mos6502::Features::all(), &request(allowed));
			match result.unwrap() {
				Some(resolved) => {
					prop_assert_eq!(resolved.mode.bits().count_ones(), 1);
					prop_assert!(allowed.contains(resolved.mode));
				},
				None => prop_assert!(!moved, "`{}` moved the cursor without resolving", text),
			}
		}

		#[test]
		fn z80_resolution_is_pure_or_exclusive(
			text in prop::sample::select(Z80_OPERANDS),
			allowed in any::<u32>().prop_map(z80::Mode::from_bits_truncate),
		) {
			let (result, moved) = resolve_text::<Z80>(text, z80::Features::all(), &request(allowed));
			match result.unwrap() {
				Some(resolved) => {
					prop_assert_eq!(resolved.mode.bits().count_ones(), 1);
					prop_assert!(allowed.contains(resolved.mode));
				},
				None => prop_assert!(!moved, "`{}` moved the cursor without resolving", text),
			}
		}
	}

	#[test]
	fn disallowed_forms_leave_the_cursor_alone() {
		let (result, moved) =
			resolve_text::<Mos6502>("($12),y", mos6502::Features::all(), &request(mos6502::Mode::IMMEDIATE));
		assert!(result.unwrap().is_none());
		assert!(!moved);

		let (result, moved) = resolve_text::<Mos6502>("($12),y", mos6502::Features::all(), &addresses());
		assert!(result.unwrap().unwrap().is(mos6502::Mode::INDIRECT_INDEXED));
		assert!(moved);
	}

	#[test]
	fn narrowing_only_applies_to_unforced_constants() {
		let all = addresses();
		let (result, _) = resolve_text::<Mos6502>("$0012", mos6502::Features::all(), &all);
		let resolved = result.unwrap().unwrap();
		assert!(resolved.is(mos6502::Mode::ZERO_PAGE));
		assert_eq!(resolved.value(0).value(), Some(0x12));

		let (result, _) = resolve_text::<Mos6502>("|$0012", mos6502::Features::all(), &all);
		assert!(result.unwrap().unwrap().is(mos6502::Mode::ABSOLUTE));
		let (result, _) = resolve_text::<Mos6502>("later", mos6502::Features::all(), &all);
		assert!(result.unwrap().unwrap().is(mos6502::Mode::ABSOLUTE));
	}

	/// A back end whose syntax matcher claims two modes at once.
	struct Ambiguous;

	static EMPTY_TABLE: LazyLock<InstructionTable<Ambiguous>> = LazyLock::new(HashMap::new);

	impl Backend for Ambiguous {
		type Features = mos6502::Features;
		type Mnemonic = mos6502::Mnemonic;
		type Mode = mos6502::Mode;

		const FAMILY: &'static str = "ambiguous";
		const NARROWING: &'static [(mos6502::Mode, mos6502::Mode)] = &[];
		const NO_OPERAND: mos6502::Mode = mos6502::Mode::NONE;

		fn table() -> &'static InstructionTable<Self> {
			&EMPTY_TABLE
		}

		fn cpu(_name: &str) -> Option<mos6502::Features> {
			None
		}

		fn default_features() -> mos6502::Features {
			mos6502::Features::BASE
		}

		fn is_reserved(_name: &str) -> bool {
			false
		}

		fn match_syntax(
			stream: &mut TokenStream,
			_context: &mut ParseContext<'_>,
			_config: &MachineConfig<mos6502::Features>,
			_request: &ResolveRequest<mos6502::Mode>,
		) -> Option<AddressingMode<mos6502::Mode>> {
			let span = stream.advance().source_span();
			Some(AddressingMode::new(mos6502::Mode::ZERO_PAGE | mos6502::Mode::ABSOLUTE, span))
		}
	}

	#[test]
	fn several_modes_are_an_internal_error() {
		let (result, _) =
			resolve_text::<Ambiguous>("$12", mos6502::Features::BASE, &request(mos6502::Mode::all()));
		let error = result.unwrap_err();
		assert!(matches!(&*error, AssemblyError::AmbiguousAddressingMode { modes, .. } if modes == "zero page, absolute"));
	}
}
