//! Output sections, patches and the single-module link step.

use std::sync::Arc;

use miette::SourceSpan;

use crate::expression::{Expression, MemoryAddress};
use crate::symbols::SymbolTable;
use crate::{AssemblyCode, AssemblyError};

/// Where encoders put their bytes.
pub trait OutputSink {
	/// Appends constant bytes.
	fn emit_bytes(&mut self, bytes: &[u8]);

	/// Appends a value of the given width. A constant is written right away (truncated to the width); anything else
	/// reserves zero bytes and records a patch at the current offset.
	fn emit_expression(&mut self, expression: Expression, width: PatchWidth);

	/// The current output address: absolute if the section has an origin, otherwise the offset from its start.
	fn current_position(&self) -> MemoryAddress;
}

/// Size, byte order and legal range of an emitted value.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PatchWidth {
	/// 8 bits, either signed or unsigned.
	Byte,
	/// 8-bit signed displacement.
	SignedByte,
	/// 8-bit unsigned offset into the base page.
	BasePage,
	/// 16 bits little endian, either signed or unsigned.
	Word,
	/// 16-bit signed little endian displacement.
	SignedWord,
	/// 16 bits big endian.
	WordBigEndian,
	/// 24 bits little endian.
	Long,
	/// 32 bits little endian.
	DoubleWord,
}

impl PatchWidth {
	/// Width in bits.
	#[must_use]
	pub const fn bits(self) -> u8 {
		match self {
			Self::Byte | Self::SignedByte | Self::BasePage => 8,
			Self::Word | Self::SignedWord | Self::WordBigEndian => 16,
			Self::Long => 24,
			Self::DoubleWord => 32,
		}
	}

	/// Width in bytes.
	#[must_use]
	pub const fn byte_count(self) -> usize {
		self.bits() as usize / 8
	}

	/// Whether only the signed interpretation is legal.
	#[must_use]
	pub const fn is_signed(self) -> bool {
		matches!(self, Self::SignedByte | Self::SignedWord)
	}

	/// The legal values for this width: the signed range for displacements, the page offsets for base page operands,
	/// the union of the signed and unsigned range otherwise.
	#[must_use]
	pub const fn range(self) -> (MemoryAddress, MemoryAddress) {
		let bits = self.bits() as u32;
		let low = -(1 << (bits - 1));
		match self {
			Self::BasePage => (0, 0xff),
			_ if self.is_signed() => (low, (1 << (bits - 1)) - 1),
			_ => (low, (1 << bits) - 1),
		}
	}

	/// Encodes a value in this width's byte order, truncating it.
	#[must_use]
	pub fn encode(self, value: MemoryAddress) -> Vec<u8> {
		let bytes = value.to_le_bytes();
		let mut encoded = bytes[.. self.byte_count()].to_vec();
		if self == Self::WordBigEndian {
			encoded.reverse();
		}
		encoded
	}
}

/// A value that could not be computed at emission time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Patch {
	/// Byte offset in the section.
	pub offset:     usize,
	/// Width of the reserved bytes.
	pub width:      PatchWidth,
	/// The value to write once all symbols are known.
	pub expression: Expression,
}

/// A saved section state; see [`Section::rollback`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Checkpoint {
	data_length:  usize,
	patch_length: usize,
}

/// A contiguous stretch of output.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Section {
	origin:  Option<MemoryAddress>,
	data:    Vec<u8>,
	patches: Vec<Patch>,
}

impl Section {
	/// Creates an empty section; `None` makes it relocatable.
	#[must_use]
	pub const fn new(origin: Option<MemoryAddress>) -> Self {
		Self { origin, data: Vec::new(), patches: Vec::new() }
	}

	/// The absolute origin, if any.
	#[must_use]
	pub const fn origin(&self) -> Option<MemoryAddress> {
		self.origin
	}

	/// Gives a relocatable section a fixed origin.
	pub const fn set_origin(&mut self, origin: MemoryAddress) {
		self.origin = Some(origin);
	}

	/// The bytes emitted so far, with zeros where patches go.
	#[must_use]
	pub fn data(&self) -> &[u8] {
		&self.data
	}

	/// The patches recorded so far.
	#[must_use]
	pub fn patches(&self) -> &[Patch] {
		&self.patches
	}

	/// Number of bytes emitted so far.
	#[must_use]
	pub fn len(&self) -> usize {
		self.data.len()
	}

	/// Whether nothing was emitted.
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.data.is_empty()
	}

	/// The current position as an expression: constant in absolute sections, a program counter offset in
	/// relocatable ones.
	#[must_use]
	pub fn position_expression(&self, span: SourceSpan) -> Expression {
		match self.origin {
			Some(origin) => Expression::constant(origin + self.data.len() as MemoryAddress, span),
			None => Expression::program_counter(self.data.len() as MemoryAddress, span),
		}
	}

	/// Saves the current state.
	#[must_use]
	pub fn checkpoint(&self) -> Checkpoint {
		Checkpoint { data_length: self.data.len(), patch_length: self.patches.len() }
	}

	/// Discards everything emitted after the checkpoint.
	pub fn rollback(&mut self, checkpoint: Checkpoint) {
		self.data.truncate(checkpoint.data_length);
		self.patches.truncate(checkpoint.patch_length);
	}

	/// Resolves all patches and returns the final bytes. `base` is the load address of relocatable code.
	/// # Errors
	/// Every patch that cannot be resolved or does not fit its width.
	pub fn link(
		&self,
		base: MemoryAddress,
		symbols: &SymbolTable,
		source_code: &Arc<AssemblyCode>,
	) -> Result<Vec<u8>, Vec<AssemblyError>> {
		let mut data = self.data.clone();
		let mut errors = Vec::new();
		for patch in &self.patches {
			match symbols.evaluate(&patch.expression, base, source_code) {
				Ok(value) => {
					let (low, high) = patch.width.range();
					if (low ..= high).contains(&value) {
						data[patch.offset .. patch.offset + patch.width.byte_count()]
							.copy_from_slice(&patch.width.encode(value));
					} else {
						errors.push(AssemblyError::PatchOutOfRange {
							value,
							width_bits: patch.width.bits(),
							signed: patch.width.is_signed(),
							location: patch.expression.span(),
							src: source_code.clone(),
						});
					}
				},
				Err(error) => errors.push(*error),
			}
		}
		if errors.is_empty() { Ok(data) } else { Err(errors) }
	}
}

impl OutputSink for Section {
	fn emit_bytes(&mut self, bytes: &[u8]) {
		self.data.extend_from_slice(bytes);
	}

	fn emit_expression(&mut self, expression: Expression, width: PatchWidth) {
		if let Some(value) = expression.value() {
			self.data.extend(width.encode(value));
		} else {
			log::debug!("patch at offset {:#x}: {} ({:?})", self.data.len(), expression, width);
			self.patches.push(Patch { offset: self.data.len(), width, expression });
			self.data.resize(self.data.len() + width.byte_count(), 0);
		}
	}

	fn current_position(&self) -> MemoryAddress {
		self.origin.unwrap_or(0) + self.data.len() as MemoryAddress
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn span() -> SourceSpan {
		(0, 0).into()
	}

	#[test]
	fn deferred_word_records_patch() {
		let mut section = Section::new(Some(0x1000));
		section.emit_bytes(&[0x4c]);
		section.emit_expression(Expression::symbol("target".into(), span()), PatchWidth::Word);
		assert_eq!(section.data(), &[0x4c, 0, 0]);
		assert_eq!(section.patches().len(), 1);
		assert_eq!(section.patches()[0].offset, 1);
		assert_eq!(section.patches()[0].width.bits(), 16);
		assert_eq!(section.current_position(), 0x1003);
	}

	#[test]
	fn constants_are_written_directly() {
		let mut section = Section::new(None);
		section.emit_expression(Expression::constant(0x1234, span()), PatchWidth::Word);
		section.emit_expression(Expression::constant(0x1234, span()), PatchWidth::WordBigEndian);
		section.emit_expression(Expression::constant(-2, span()), PatchWidth::SignedByte);
		section.emit_expression(Expression::constant(0x0012_3456, span()), PatchWidth::Long);
		assert_eq!(section.data(), &[0x34, 0x12, 0x12, 0x34, 0xfe, 0x56, 0x34, 0x12]);
		assert!(section.patches().is_empty());
	}

	#[test]
	fn rollback_discards_output() {
		let mut section = Section::new(None);
		section.emit_bytes(&[1]);
		let checkpoint = section.checkpoint();
		section.emit_bytes(&[2, 3]);
		section.emit_expression(Expression::symbol("x".into(), span()), PatchWidth::Byte);
		section.rollback(checkpoint);
		assert_eq!(section.data(), &[1]);
		assert!(section.patches().is_empty());
	}

	#[test]
	fn link_resolves_and_checks_ranges() {
		let source = Arc::new(AssemblyCode::new("", "<test>"));
		let mut symbols = SymbolTable::default();
		symbols.define("target".into(), Expression::program_counter(2, span()), span(), &source).unwrap();
		let mut section = Section::new(None);
		section.emit_expression(Expression::symbol("target".into(), span()), PatchWidth::Word);
		section.emit_expression(
			Expression::symbol("target".into(), span()).pc_relative(section.position_expression(span()), 1),
			PatchWidth::SignedByte,
		);
		assert_eq!(section.link(0x0800, &symbols, &source).unwrap(), vec![0x02, 0x08, 0xff]);

		let mut section = Section::new(None);
		section.emit_expression(Expression::symbol("target".into(), span()), PatchWidth::Byte);
		let errors = section.link(0x0800, &symbols, &source).unwrap_err();
		assert!(matches!(errors.as_slice(), [AssemblyError::PatchOutOfRange { value: 0x0802, width_bits: 8, .. }]));
	}

	#[test]
	fn ranges() {
		assert_eq!(PatchWidth::Byte.range(), (-128, 255));
		assert_eq!(PatchWidth::SignedByte.range(), (-128, 127));
		assert_eq!(PatchWidth::BasePage.range(), (0, 255));
		assert_eq!(PatchWidth::SignedWord.range(), (-32768, 32767));
		assert_eq!(PatchWidth::DoubleWord.range(), (-0x8000_0000, 0xffff_ffff));
	}
}
