//! Table-driven instruction dispatch and the emission interface handlers work against.

use std::collections::HashMap;
use std::sync::Arc;

use bitflags::Flags;
use flexstr::SharedStr;
use miette::SourceSpan;

use crate::addressing_mode::{AddressingMode, ImmediateWidth, ResolveRequest, resolve};
use crate::backend::{Backend, MachineConfig, flag_names};
use crate::cli::Frontend;
use crate::expression::{Expression, MemoryAddress, ParseContext};
use crate::output::{OutputSink, PatchWidth, Section};
use crate::parser::{TokenClass, TokenStream};
use crate::symbols::SymbolTable;
use crate::{AssemblyCode, AssemblyError, trace};

/// Emits the bytes for one instruction. Handlers may call [`Encoder::encode`] to build synthesized sequences from
/// other instructions.
pub type Handler<B> = fn(&mut Encoder<'_, B>, &Instruction<B>) -> Result<(), Box<AssemblyError>>;

/// The instruction table of a back end.
pub type InstructionTable<B> = HashMap<<B as Backend>::Mnemonic, InstructionEntry<B>>;

/// Static description of one mnemonic.
pub struct InstructionEntry<B: Backend> {
	/// Base opcode the handler packs mode bits into.
	pub opcode:          u8,
	/// Features the instruction needs.
	pub requires:        B::Features,
	/// Allowed modes of the two operand slots. An empty mask means the slot does not exist.
	pub operands:        [B::Mode; 2],
	/// Width of immediate operands.
	pub immediate_width: ImmediateWidth,
	/// The handler.
	pub handler:         Handler<B>,
}

impl<B: Backend> InstructionEntry<B> {
	/// Creates an entry with byte-sized immediates.
	#[must_use]
	pub fn new(opcode: u8, requires: B::Features, first: B::Mode, second: B::Mode, handler: Handler<B>) -> Self {
		Self { opcode, requires, operands: [first, second], immediate_width: ImmediateWidth::Byte, handler }
	}

	/// Changes the immediate width.
	#[must_use]
	pub const fn immediate(mut self, immediate_width: ImmediateWidth) -> Self {
		self.immediate_width = immediate_width;
		self
	}
}

/// An instruction with resolved operands, as handed to the handler.
#[derive(Debug)]
pub struct Instruction<B: Backend> {
	/// The mnemonic.
	pub mnemonic:      B::Mnemonic,
	/// Base opcode from the table.
	pub opcode:        u8,
	/// Operands; absent ones have the no-operand mode.
	pub operands:      [AddressingMode<B::Mode>; 2],
	/// Index folded into the mnemonic, e.g. the 3 of `bbr3`.
	pub implied_index: Option<u8>,
}

impl<B: Backend> Instruction<B> {
	/// The first operand.
	#[must_use]
	pub const fn first(&self) -> &AddressingMode<B::Mode> {
		&self.operands[0]
	}

	/// The second operand.
	#[must_use]
	pub const fn second(&self) -> &AddressingMode<B::Mode> {
		&self.operands[1]
	}
}

/// Encodes the instructions of one statement into a section.
pub struct Encoder<'a, B: Backend> {
	section:      &'a mut Section,
	symbols:      &'a mut SymbolTable,
	config:       &'a MachineConfig<B::Features>,
	source_code:  &'a Arc<AssemblyCode>,
	frontend:     &'a dyn Frontend,
	span:         SourceSpan,
	instructions: usize,
	synthesized:  bool,
}

impl<'a, B: Backend> Encoder<'a, B> {
	/// Creates an encoder for the statement at `span`.
	pub fn new(
		section: &'a mut Section,
		symbols: &'a mut SymbolTable,
		config: &'a MachineConfig<B::Features>,
		source_code: &'a Arc<AssemblyCode>,
		frontend: &'a dyn Frontend,
		span: SourceSpan,
	) -> Self {
		Self { section, symbols, config, source_code, frontend, span, instructions: 0, synthesized: false }
	}

	/// Assembles one source instruction: checks the CPU features, resolves the operands from the stream, checks the
	/// resolved modes and runs the handler.
	/// # Errors
	/// Any diagnostic of the statement.
	pub fn dispatch(
		&mut self,
		mnemonic: B::Mnemonic,
		implied_index: Option<u8>,
		stream: &mut TokenStream,
	) -> Result<(), Box<AssemblyError>> {
		let entry = self.entry(mnemonic)?;
		self.check_instruction(mnemonic, entry)?;
		let operands = self.resolve_operands(mnemonic, entry, implied_index, stream)?;
		self.finish(mnemonic, entry, operands, implied_index)
	}

	/// Encodes an instruction from already resolved operands. This is how handlers synthesize sequences: every part
	/// passes the same checks as a source instruction.
	/// # Errors
	/// Any diagnostic of the encoded instruction.
	pub fn encode(
		&mut self,
		mnemonic: B::Mnemonic,
		first: AddressingMode<B::Mode>,
		second: AddressingMode<B::Mode>,
	) -> Result<(), Box<AssemblyError>> {
		trace!("synthesizing {mnemonic}");
		let entry = self.entry(mnemonic)?;
		self.check_instruction(mnemonic, entry)?;
		self.finish(mnemonic, entry, [first, second], None)
	}

	fn entry(&self, mnemonic: B::Mnemonic) -> Result<&'static InstructionEntry<B>, Box<AssemblyError>> {
		B::table().get(&mnemonic).ok_or_else(|| {
			AssemblyError::MissingTableEntry {
				mnemonic: mnemonic.to_string(),
				location: self.span,
				src:      self.source_code.clone(),
			}
			.into()
		})
	}

	fn check_instruction(&self, mnemonic: B::Mnemonic, entry: &InstructionEntry<B>) -> Result<(), Box<AssemblyError>> {
		if self.config.features.contains(entry.requires) {
			Ok(())
		} else {
			Err(AssemblyError::UnsupportedInstruction {
				mnemonic: mnemonic.to_string(),
				required: flag_names(entry.requires).join(", "),
				active:   flag_names(self.config.features).join(", "),
				location: self.span,
				src:      self.source_code.clone(),
			}
			.into())
		}
	}

	fn resolve_operands(
		&self,
		mnemonic: B::Mnemonic,
		entry: &InstructionEntry<B>,
		implied_index: Option<u8>,
		stream: &mut TokenStream,
	) -> Result<[AddressingMode<B::Mode>; 2], Box<AssemblyError>> {
		let mut context = ParseContext::new(
			&*self.symbols,
			self.section.position_expression(self.span),
			self.source_code,
			B::is_reserved,
		);
		let end_span = stream.peek().source_span();
		let mut operands = [AddressingMode::new(B::NO_OPERAND, end_span), AddressingMode::new(B::NO_OPERAND, end_span)];

		for (index, allowed) in entry.operands.into_iter().enumerate() {
			if allowed.is_empty() {
				break;
			}
			if index > 0 && stream.eat(TokenClass::Comma).is_none() {
				if allowed.contains(B::NO_OPERAND) {
					break;
				}
				return Err(AssemblyError::MissingOperand {
					mnemonic:      mnemonic.to_string(),
					operand_index: index,
					location:      stream.peek().source_span(),
					src:           self.source_code.clone(),
				}
				.into());
			}
			let request = ResolveRequest { allowed, immediate_width: entry.immediate_width, implied_index };
			let operand_span = operand_span(stream);
			match resolve::<B>(stream, &mut context, self.config, &request)? {
				Some(operand) => operands[index] = operand,
				None => {
					// A diagnostic from the resolver explains the failure better than a generic mode error.
					if !context.errors.is_empty() {
						return Err(context.errors.swap_remove(0).into());
					}
					return Err(AssemblyError::InvalidAddressingMode {
						mnemonic: mnemonic.to_string(),
						operand_index: index,
						legal_modes: flag_names(allowed),
						location: operand_span,
						src: self.source_code.clone(),
					}
					.into());
				},
			}
		}
		if context.errors.is_empty() { Ok(operands) } else { Err(context.errors.swap_remove(0).into()) }
	}

	fn finish(
		&mut self,
		mnemonic: B::Mnemonic,
		entry: &InstructionEntry<B>,
		operands: [AddressingMode<B::Mode>; 2],
		implied_index: Option<u8>,
	) -> Result<(), Box<AssemblyError>> {
		for (index, (operand, allowed)) in operands.iter().zip(entry.operands).enumerate() {
			if allowed.is_empty() {
				continue;
			}
			if !allowed.contains(operand.mode) {
				return Err(AssemblyError::InvalidAddressingMode {
					mnemonic: mnemonic.to_string(),
					operand_index: index,
					legal_modes: flag_names(allowed),
					location: operand.span,
					src: self.source_code.clone(),
				}
				.into());
			}
			let required = B::mode_requirement(operand.mode);
			if !self.config.features.contains(required) {
				return Err(AssemblyError::UnsupportedAddressingMode {
					mode:     flag_names(operand.mode).join(", "),
					required: flag_names(required).join(", "),
					location: operand.span,
					src:      self.source_code.clone(),
				}
				.into());
			}
		}
		self.instructions += 1;
		let instruction = Instruction { mnemonic, opcode: entry.opcode, operands, implied_index };
		(entry.handler)(self, &instruction)
	}

	/// Appends raw bytes.
	pub fn emit(&mut self, bytes: &[u8]) {
		self.section.emit_bytes(bytes);
	}

	/// Appends a value after checking constants against the width's range.
	/// # Errors
	/// If the value is a constant that does not fit.
	pub fn emit_value(&mut self, value: Expression, width: PatchWidth) -> Result<(), Box<AssemblyError>> {
		let (low, high) = width.range();
		let value = value.check_range(low, high, self.source_code)?;
		self.section.emit_expression(value, width);
		Ok(())
	}

	/// Appends a value that is truncated to the width on purpose, e.g. the low byte of a split word.
	pub fn emit_truncated(&mut self, value: Expression, width: PatchWidth) {
		let bits = u32::from(width.bits());
		self.section.emit_expression(value.mask(bits), width);
	}

	/// The address of the instruction being emitted.
	#[must_use]
	pub fn program_counter(&self) -> Expression {
		self.section.position_expression(self.span)
	}

	/// The current output address as a number; see [`OutputSink::current_position`].
	#[must_use]
	pub fn current_position(&self) -> MemoryAddress {
		self.section.current_position()
	}

	/// A new label that the source cannot refer to.
	pub fn fresh_label(&mut self) -> SharedStr {
		self.symbols.fresh_synthetic_label()
	}

	/// An expression referring to a label.
	#[must_use]
	pub fn label_reference(&self, label: &SharedStr) -> Expression {
		Expression::symbol(label.clone(), self.span)
	}

	/// Defines a label at the current position.
	/// # Errors
	/// If the label exists already.
	pub fn bind_label(&mut self, label: SharedStr) -> Result<(), Box<AssemblyError>> {
		let position = self.program_counter();
		self.symbols.define(label, position, self.span, self.source_code)
	}

	/// Fails unless synthesized instruction sequences are enabled.
	/// # Errors
	/// If synthesis is disabled.
	pub fn require_synthesis(&mut self, mnemonic: B::Mnemonic) -> Result<(), Box<AssemblyError>> {
		if self.config.synthetic_instructions {
			log::debug!("synthesizing {mnemonic} at {:#x}", self.current_position());
			self.synthesized = true;
			Ok(())
		} else {
			Err(AssemblyError::SynthesisDisabled {
				mnemonic: mnemonic.to_string(),
				location: self.span,
				src:      self.source_code.clone(),
			}
			.into())
		}
	}

	/// Whether all the given features are active.
	#[must_use]
	pub fn has(&self, features: B::Features) -> bool {
		self.config.features.contains(features)
	}

	/// The source, for diagnostics raised by handlers.
	#[must_use]
	pub const fn source_code(&self) -> &Arc<AssemblyCode> {
		self.source_code
	}

	/// Source location of the statement.
	#[must_use]
	pub const fn span(&self) -> SourceSpan {
		self.span
	}

	/// Reports a warning, or fails if the frontend promotes it to an error.
	/// # Errors
	/// If the warning is promoted.
	pub fn warn(&self, warning: AssemblyError) -> Result<(), Box<AssemblyError>> {
		warning.report_or_throw(self.frontend)
	}

	/// How many instructions were encoded so far, including synthesized parts.
	#[must_use]
	pub const fn instruction_count(&self) -> usize {
		self.instructions
	}

	/// Whether a handler expanded the statement into a synthesized sequence.
	#[must_use]
	pub const fn is_synthesized(&self) -> bool {
		self.synthesized
	}
}

/// The span of the tokens up to the end of the operand.
fn operand_span(stream: &TokenStream) -> SourceSpan {
	let start = stream.peek().source_span();
	let mut end = start;
	let mut index = 0;
	while !stream.peek_nth(index).ends_operand() {
		end = stream.peek_nth(index).source_span();
		index += 1;
	}
	(start.offset(), end.offset() + end.len() - start.offset()).into()
}
