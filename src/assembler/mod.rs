//! The statement driver.
//!
//! Splits the token stream into statements, defines labels and constants, runs directives and hands instructions to
//! the back end's [`Encoder`]. A failing statement is reported and skipped with its output rolled back, so that one
//! run surfaces every error in the file.
#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_possible_wrap)]

use std::sync::Arc;

use flexstr::SharedStr;
use miette::SourceSpan;

use crate::backend::{Backend, MachineConfig};
use crate::cli::Frontend;
use crate::encoder::Encoder;
use crate::expression::{Expression, MemoryAddress, ParseContext};
use crate::output::Section;
use crate::parser::{Token, TokenClass, TokenStream, lex};
use crate::symbols::SymbolTable;
use crate::{AssemblyCode, AssemblyError, trace};

mod directive;

/// A section together with the place in the source that started it.
#[derive(Clone, Debug)]
pub struct AssembledSection {
	/// The output.
	pub section: Section,
	/// The `.org` directive that opened the section, or the start of the file.
	pub span:    SourceSpan,
}

/// Where the output of one statement ended up.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ListingEntry {
	/// 1-based source line of the statement.
	pub line:    usize,
	/// Index into [`AssembledProgram::sections`].
	pub section: usize,
	/// Byte offset within the section.
	pub offset:  usize,
	/// Number of bytes the statement produced.
	pub length:  usize,
}

/// The result of assembling one source file, before linking.
#[derive(Debug)]
pub struct AssembledProgram {
	/// The assembled source.
	pub source_code: Arc<AssemblyCode>,
	/// Output sections in source order. Only the first one can be relocatable.
	pub sections:    Vec<AssembledSection>,
	/// All labels and constants.
	pub symbols:     SymbolTable,
	/// One entry per statement, in source order.
	pub listing:     Vec<ListingEntry>,
}

impl AssembledProgram {
	/// Resolves the patches of every section. Relocatable code is placed at `base`. Returns the load address and the
	/// bytes of each section.
	/// # Errors
	/// All link errors of all sections, collected into [`AssemblyError::AssemblyFailed`].
	pub fn link_sections(&self, base: MemoryAddress) -> Result<Vec<(MemoryAddress, Vec<u8>)>, Box<AssemblyError>> {
		let mut errors = Vec::new();
		let mut linked = Vec::with_capacity(self.sections.len());
		for AssembledSection { section, .. } in &self.sections {
			match section.link(base, &self.symbols, &self.source_code) {
				Ok(data) => linked.push((section.origin().unwrap_or(base), data)),
				Err(mut section_errors) => errors.append(&mut section_errors),
			}
		}
		if errors.is_empty() {
			Ok(linked)
		} else {
			Err(AssemblyError::AssemblyFailed { count: errors.len(), errors }.into())
		}
	}

	/// Links the program into one contiguous image that starts at the lowest section address. Gaps between sections
	/// are filled with zeros.
	/// # Errors
	/// Link errors, and sections that overlap.
	pub fn link(&self, base: MemoryAddress) -> Result<Vec<u8>, Box<AssemblyError>> {
		let mut sections: Vec<_> = self
			.link_sections(base)?
			.into_iter()
			.zip(&self.sections)
			.filter(|((_, data), _)| !data.is_empty())
			.map(|((origin, data), section)| (origin, data, section.span))
			.collect();
		sections.sort_by_key(|(origin, ..)| *origin);

		let Some(&(start, ..)) = sections.first() else {
			return Ok(Vec::new());
		};
		let mut image = Vec::new();
		for (origin, data, span) in sections {
			let offset = (origin - start) as usize;
			if offset < image.len() {
				return Err(AssemblyError::OverlappingSections {
					section_start: origin,
					previous_end:  start + image.len() as MemoryAddress - 1,
					location:      span,
					src:           self.source_code.clone(),
				}
				.into());
			}
			image.resize(offset, 0);
			image.extend_from_slice(&data);
		}
		log::debug!("linked {} bytes starting at {start:#06x}", image.len());
		Ok(image)
	}
}

/// Assembles a source file for the back end `B`.
///
/// # Errors
/// Tokenizer errors and internal errors are returned directly. Statement errors are collected; if there were any, the
/// result is [`AssemblyError::AssemblyFailed`] carrying all of them. Warnings and advice go to the frontend.
pub fn assemble<B: Backend>(
	source_code: &Arc<AssemblyCode>,
	config: MachineConfig<B::Features>,
	frontend: &dyn Frontend,
) -> Result<AssembledProgram, Box<AssemblyError>> {
	let tokens = lex(source_code)?;
	let mut stream = TokenStream::new(tokens, source_code.text.len());
	let mut assembler = Assembler::<B>::new(source_code, config, frontend);

	while !stream.is_exhausted() {
		if stream.eat(TokenClass::Newline).is_some() {
			continue;
		}
		assembler.statement(&mut stream)?;
	}
	assembler.finish()
}

/// Mutable state of one assembly run.
struct Assembler<'a, B: Backend> {
	source_code: &'a Arc<AssemblyCode>,
	frontend:    &'a dyn Frontend,
	config:      MachineConfig<B::Features>,
	sections:    Vec<AssembledSection>,
	symbols:     SymbolTable,
	listing:     Vec<ListingEntry>,
	errors:      Vec<AssemblyError>,
	/// Offsets at which source lines start.
	line_starts: Vec<usize>,
}

impl<'a, B: Backend> Assembler<'a, B> {
	fn new(source_code: &'a Arc<AssemblyCode>, config: MachineConfig<B::Features>, frontend: &'a dyn Frontend) -> Self {
		let line_starts = std::iter::once(0)
			.chain(source_code.text.match_indices('\n').map(|(index, _)| index + 1))
			.collect();
		Self {
			source_code,
			frontend,
			config,
			sections: vec![AssembledSection { section: Section::new(None), span: (0, 0).into() }],
			symbols: SymbolTable::default(),
			listing: Vec::new(),
			errors: Vec::new(),
			line_starts,
		}
	}

	fn finish(self) -> Result<AssembledProgram, Box<AssemblyError>> {
		if !self.errors.is_empty() {
			return Err(AssemblyError::AssemblyFailed { count: self.errors.len(), errors: self.errors }.into());
		}
		Ok(AssembledProgram {
			source_code: self.source_code.clone(),
			sections:    self.sections,
			symbols:     self.symbols,
			listing:     self.listing,
		})
	}

	fn line_of(&self, offset: usize) -> usize {
		self.line_starts.partition_point(|&start| start <= offset)
	}

	fn current_section(&mut self) -> &mut Section {
		let index = self.sections.len() - 1;
		&mut self.sections[index].section
	}

	/// Assembles one statement and leaves the stream on its newline. Only internal errors are returned.
	fn statement(&mut self, stream: &mut TokenStream) -> Result<(), Box<AssemblyError>> {
		let line = self.line_of(stream.peek().source_span().offset());
		let section_index = self.sections.len() - 1;
		let checkpoint = self.current_section().checkpoint();
		let start_offset = self.current_section().len();

		let result = self.statement_body(stream).and_then(|()| {
			if stream.at_statement_end() {
				Ok(())
			} else {
				Err(AssemblyError::DanglingTokens { location: rest_of_statement(stream), src: self.source_code.clone() }
					.into())
			}
		});
		match result {
			Ok(()) => {
				let section = self.sections.len() - 1;
				// An `.org` statement starts its output in the new section.
				let offset = if section == section_index { start_offset } else { 0 };
				let length = self.sections[section].section.len() - offset;
				self.listing.push(ListingEntry { line, section, offset, length });
			},
			Err(error) if error.is_internal() => return Err(error),
			Err(error) => {
				trace!("statement on line {line} failed: {error}");
				self.sections[section_index].section.rollback(checkpoint);
				self.errors.push(*error);
				stream.skip_statement();
			},
		}
		Ok(())
	}

	fn statement_body(&mut self, stream: &mut TokenStream) -> Result<(), Box<AssemblyError>> {
		let label = stream.attempt(|stream| {
			let Token::Identifier(name, span) = stream.advance() else {
				return None;
			};
			stream.eat(TokenClass::Colon).map(|_| (name, span))
		});
		// A label in front of `.org` names the new origin.
		let labels_origin = stream.next_is(TokenClass::Period)
			&& stream.peek_nth(1).identifier().is_some_and(|name| name.eq_ignore_ascii_case("org"));
		if let Some((name, span)) = label.clone()
			&& !labels_origin
		{
			self.define_label(name, span)?;
		}
		if !stream.at_statement_end() {
			self.instruction_or_directive(stream)?;
		}
		if let Some((name, span)) = label
			&& labels_origin
		{
			self.define_label(name, span)?;
		}
		Ok(())
	}

	fn define_label(&mut self, name: SharedStr, span: SourceSpan) -> Result<(), Box<AssemblyError>> {
		let position = self.current_section().position_expression(span);
		self.symbols.define(name, position, span, self.source_code)
	}

	fn instruction_or_directive(&mut self, stream: &mut TokenStream) -> Result<(), Box<AssemblyError>> {
		match stream.advance() {
			Token::Period(_) => self.directive(stream),
			Token::Identifier(name, span) =>
				if stream.eat(TokenClass::Equals).is_some() || stream.eat_identifier("equ").is_some() {
					self.constant(name, span, stream)
				} else {
					self.instruction(&name, span, stream)
				},
			token => Err(AssemblyError::ExpectedToken {
				expected: "instruction, directive or label".to_owned(),
				actual:   token.to_string(),
				location: token.source_span(),
				src:      self.source_code.clone(),
			}
			.into()),
		}
	}

	/// `name = expr` and `name equ expr`.
	fn constant(&mut self, name: SharedStr, span: SourceSpan, stream: &mut TokenStream) -> Result<(), Box<AssemblyError>> {
		let value = self.expression(stream)?;
		self.symbols.define(name, value, span, self.source_code)
	}

	/// Parses one expression in the context of the current statement.
	fn expression(&mut self, stream: &mut TokenStream) -> Result<Expression, Box<AssemblyError>> {
		let location = stream.peek().source_span();
		let program_counter = self.current_section().position_expression(location);
		let mut context = ParseContext::new(&self.symbols, program_counter, self.source_code, B::is_reserved);
		let value = context.parse_expression(stream, 0);
		if !context.errors.is_empty() {
			return Err(context.errors.swap_remove(0).into());
		}
		value.ok_or_else(|| AssemblyError::ExpectedExpression { location, src: self.source_code.clone() }.into())
	}

	fn instruction(&mut self, name: &str, span: SourceSpan, stream: &mut TokenStream) -> Result<(), Box<AssemblyError>> {
		let (mnemonic, implied_index) = B::mnemonic(name, span, self.source_code).ok_or_else(|| {
			AssemblyError::UnknownMnemonic {
				name:       name.to_owned(),
				cpu_family: B::FAMILY.to_owned(),
				location:   span,
				src:        self.source_code.clone(),
			}
		})?;
		let statement_span = join(span, rest_of_statement(stream));
		let index = self.sections.len() - 1;
		let mut encoder = Encoder::<B>::new(
			&mut self.sections[index].section,
			&mut self.symbols,
			&self.config,
			self.source_code,
			self.frontend,
			statement_span,
		);
		encoder.dispatch(mnemonic, implied_index, stream)?;
		if encoder.is_synthesized() {
			encoder.warn(AssemblyError::SynthesizedInstruction {
				mnemonic: mnemonic.to_string(),
				count:    encoder.instruction_count() - 1,
				location: statement_span,
				src:      self.source_code.clone(),
			})?;
		}
		Ok(())
	}
}

/// The span from the current token to the end of the statement.
fn rest_of_statement(stream: &TokenStream) -> SourceSpan {
	let start = stream.peek().source_span();
	let mut end = start;
	let mut index = 0;
	while !matches!(stream.peek_nth(index), Token::Newline(..) | Token::EndOfInput(..)) {
		end = stream.peek_nth(index).source_span();
		index += 1;
	}
	join(start, end)
}

fn join(start: SourceSpan, end: SourceSpan) -> SourceSpan {
	(start.offset(), (end.offset() + end.len()).saturating_sub(start.offset())).into()
}

#[cfg(test)]
mod test;
