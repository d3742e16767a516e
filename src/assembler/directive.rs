//! Directive assembly functions.

use miette::SourceSpan;
use retroasm_derive::Parse;

use super::{AssembledSection, Assembler};
use crate::backend::Backend;
use crate::encoder::Encoder;
use crate::expression::Expression;
use crate::output::{OutputSink, PatchWidth, Section};
use crate::parser::{Parse, Token, TokenClass, TokenStream};
use crate::AssemblyError;

/// The directives, by their name after the period.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Parse)]
enum Directive {
	Org,
	Byte,
	Db,
	Word,
	Dw,
	Long,
	Dword,
	Dd,
	Cpu,
	Basepage,
	Synth,
}

impl<B: Backend> Assembler<'_, B> {
	/// Assembles the directive after the leading period.
	pub(super) fn directive(&mut self, stream: &mut TokenStream) -> Result<(), Box<AssemblyError>> {
		let token = stream.advance();
		let Some(name) = token.identifier() else {
			return Err(AssemblyError::ExpectedToken {
				expected: "directive name".to_owned(),
				actual:   token.to_string(),
				location: token.source_span(),
				src:      self.source_code.clone(),
			}
			.into());
		};
		let location = token.source_span();
		let lowercase = name.to_ascii_lowercase();
		if !Directive::is_valid(&lowercase) {
			return Err(AssemblyError::UnknownDirective {
				name: name.to_owned(),
				location,
				src: self.source_code.clone(),
			}
			.into());
		}
		match Directive::parse(&lowercase, location, self.source_code.clone())? {
			Directive::Org => self.origin(stream, location),
			Directive::Byte | Directive::Db => self.data(stream, PatchWidth::Byte),
			Directive::Word | Directive::Dw => self.data(stream, PatchWidth::Word),
			Directive::Long => self.data(stream, PatchWidth::Long),
			Directive::Dword | Directive::Dd => self.data(stream, PatchWidth::DoubleWord),
			Directive::Cpu => self.cpu(stream),
			Directive::Basepage => {
				let page = self.constant_argument(stream, "base page")?;
				let page = page.check_range(0, 0xff, self.source_code)?;
				self.config.base_page = page.value().unwrap_or_default();
				log::debug!("base page is now {:#06x}", self.config.base_address());
				Ok(())
			},
			Directive::Synth => self.synth(stream),
		}
	}

	/// `.org`: code continues at a new absolute address. An empty section is moved instead of starting a new one.
	fn origin(&mut self, stream: &mut TokenStream, span: SourceSpan) -> Result<(), Box<AssemblyError>> {
		let origin = self
			.constant_argument(stream, "origin")?
			.check_range(0, B::HIGHEST_ADDRESS, self.source_code)?
			.value()
			.unwrap_or_default();
		log::debug!("origin {origin:#06x}");
		if self.current_section().is_empty() {
			let index = self.sections.len() - 1;
			self.sections[index].span = span;
			self.current_section().set_origin(origin);
		} else {
			self.sections.push(AssembledSection { section: Section::new(Some(origin)), span });
		}
		Ok(())
	}

	/// `.byte`, `.word`, `.long` and `.dword`: comma-separated values, plus strings for `.byte`.
	fn data(&mut self, stream: &mut TokenStream, width: PatchWidth) -> Result<(), Box<AssemblyError>> {
		loop {
			if width == PatchWidth::Byte
				&& let Token::String(text, _) = stream.peek()
			{
				let text = text.clone();
				stream.advance();
				self.current_section().emit_bytes(&text);
			} else {
				let value = self.expression(stream)?;
				let span = value.span();
				let index = self.sections.len() - 1;
				let mut encoder = Encoder::<B>::new(
					&mut self.sections[index].section,
					&mut self.symbols,
					&self.config,
					self.source_code,
					self.frontend,
					span,
				);
				match value.value() {
					Some(constant) if !(width.range().0 ..= width.range().1).contains(&constant) => {
						encoder.warn(AssemblyError::ValueTooLarge {
							value:    constant,
							size:     width.bits(),
							location: span,
							src:      self.source_code.clone(),
						})?;
						encoder.emit_truncated(value, width);
					},
					_ => encoder.emit_value(value, width)?,
				}
			}
			if stream.eat(TokenClass::Comma).is_none() {
				return Ok(());
			}
		}
	}

	/// `.cpu name`. The name may be written as an identifier, a string or a number such as `6502`. Names like `65c02`
	/// are not valid tokens and must be quoted.
	fn cpu(&mut self, stream: &mut TokenStream) -> Result<(), Box<AssemblyError>> {
		let token = stream.advance();
		let name = match &token {
			Token::Identifier(name, _) => name.to_string(),
			Token::String(text, _) => String::from_utf8_lossy(text).into_owned(),
			Token::Number(number, _) => number.to_string(),
			_ => return Err(self.expected("CPU name", &token)),
		};
		let features = B::cpu(&name).ok_or_else(|| AssemblyError::InvalidConstant {
			constant: name.clone(),
			typename: format!("{} CPU", B::FAMILY),
			location: token.source_span(),
			src:      self.source_code.clone(),
		})?;
		log::debug!("switching to CPU {name}");
		self.config.features = features;
		Ok(())
	}

	/// `.synth on` or `.synth off`.
	fn synth(&mut self, stream: &mut TokenStream) -> Result<(), Box<AssemblyError>> {
		let token = stream.advance();
		let enabled = match token.identifier().map(str::to_ascii_lowercase).as_deref() {
			Some("on") => true,
			Some("off") => false,
			_ => return Err(self.expected("`on` or `off`", &token)),
		};
		self.config.synthetic_instructions = enabled;
		Ok(())
	}

	/// An argument that must be known right away.
	fn constant_argument(
		&mut self,
		stream: &mut TokenStream,
		typename: &str,
	) -> Result<Expression, Box<AssemblyError>> {
		let value = self.expression(stream)?;
		if value.is_constant() {
			return Ok(value);
		}
		Err(AssemblyError::InvalidConstant {
			constant: value.to_string(),
			typename: typename.to_owned(),
			location: value.span(),
			src:      self.source_code.clone(),
		}
		.into())
	}

	fn expected(&self, expected: &str, token: &Token) -> Box<AssemblyError> {
		AssemblyError::ExpectedToken {
			expected: expected.to_owned(),
			actual:   token.to_string(),
			location: token.source_span(),
			src:      self.source_code.clone(),
		}
		.into()
	}
}
