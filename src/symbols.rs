//! Symbol table.

use std::collections::HashMap;
use std::sync::Arc;

use flexstr::SharedStr;
use miette::SourceSpan;

use crate::expression::{Expression, MemoryAddress};
use crate::{AssemblyCode, AssemblyError};

/// A defined symbol: a label or a `name = value` constant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Symbol {
	/// The value, possibly only resolvable at link time.
	pub value:      Expression,
	/// Where the symbol was defined.
	pub definition: SourceSpan,
}

/// What a lookup knows about a symbol at this point of the assembly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymbolValue {
	/// Defined with a value known now.
	Constant(MemoryAddress),
	/// Defined, but the value depends on the load address or on other deferred symbols.
	Deferred,
	/// Not defined so far. Forward references are legal; only link time reports missing symbols.
	Undefined,
}

/// All symbols of one source file.
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
	symbols:           HashMap<String, Symbol>,
	synthetic_counter: usize,
}

impl SymbolTable {
	/// Defines a symbol.
	/// # Errors
	/// If the symbol is already defined.
	pub fn define(
		&mut self,
		name: SharedStr,
		value: Expression,
		definition: SourceSpan,
		source_code: &Arc<AssemblyCode>,
	) -> Result<(), Box<AssemblyError>> {
		if let Some(previous) = self.symbols.get(&*name) {
			return Err(AssemblyError::RedefinedSymbol {
				name:     name.to_string(),
				location: definition,
				previous: previous.definition,
				src:      source_code.clone(),
			}
			.into());
		}
		log::debug!("{name} = {value}");
		self.symbols.insert(name.to_string(), Symbol { value, definition });
		Ok(())
	}

	/// Looks up a symbol for constant folding.
	#[must_use]
	pub fn lookup(&self, name: &str) -> SymbolValue {
		match self.symbols.get(name) {
			Some(Symbol { value, .. }) => value.value().map_or(SymbolValue::Deferred, SymbolValue::Constant),
			None => SymbolValue::Undefined,
		}
	}

	/// The full definition of a symbol.
	#[must_use]
	pub fn get(&self, name: &str) -> Option<&Symbol> {
		self.symbols.get(name)
	}

	/// A new label name for synthesized code. The angle brackets keep it apart from every name the tokenizer can
	/// produce.
	pub fn fresh_synthetic_label(&mut self) -> SharedStr {
		self.synthetic_counter += 1;
		format!("<synthetic {}>", self.synthetic_counter).into()
	}

	/// Iterates over all symbols in no particular order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &Symbol)> {
		self.symbols.iter().map(|(name, symbol)| (name.as_str(), symbol))
	}

	/// Evaluates an expression at link time, resolving symbols recursively.
	/// # Errors
	/// Undefined or self-referential symbols, and division by zero.
	pub fn evaluate(
		&self,
		expression: &Expression,
		base: MemoryAddress,
		source_code: &Arc<AssemblyCode>,
	) -> Result<MemoryAddress, Box<AssemblyError>> {
		self.evaluate_impl(expression, base, source_code, &mut Vec::new())
	}

	/// The implementation for [`Self::evaluate`]. `resolution_attempts` holds the symbols currently being resolved to
	/// detect recursive definitions.
	fn evaluate_impl(
		&self,
		expression: &Expression,
		base: MemoryAddress,
		source_code: &Arc<AssemblyCode>,
		resolution_attempts: &mut Vec<SharedStr>,
	) -> Result<MemoryAddress, Box<AssemblyError>> {
		expression.evaluate(base, source_code, &mut |name, usage| {
			let symbol = self.symbols.get(&**name).ok_or_else(|| AssemblyError::UnresolvedSymbol {
				name:     name.to_string(),
				location: usage,
				src:      source_code.clone(),
			})?;
			if resolution_attempts.contains(name) {
				return Err(AssemblyError::RecursiveSymbol {
					name:     name.to_string(),
					location: symbol.definition,
					src:      source_code.clone(),
				}
				.into());
			}
			resolution_attempts.push(name.clone());
			let value = self.evaluate_impl(&symbol.value, base, source_code, resolution_attempts);
			resolution_attempts.pop();
			value
		})
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn source() -> Arc<AssemblyCode> {
		Arc::new(AssemblyCode::new("a = b\nb = a\n", "<test>"))
	}

	#[test]
	fn redefinition_is_reported() {
		let source = source();
		let mut symbols = SymbolTable::default();
		symbols.define("a".into(), Expression::constant(1, (0, 1).into()), (0, 1).into(), &source).unwrap();
		let error = symbols.define("a".into(), Expression::constant(2, (6, 1).into()), (6, 1).into(), &source);
		assert!(matches!(*error.unwrap_err(), AssemblyError::RedefinedSymbol { previous, .. } if previous == SourceSpan::from((0, 1))));
		assert_eq!(symbols.lookup("a"), SymbolValue::Constant(1));
	}

	#[test]
	fn lookup_kinds() {
		let source = source();
		let mut symbols = SymbolTable::default();
		symbols.define("label".into(), Expression::program_counter(4, (0, 1).into()), (0, 1).into(), &source).unwrap();
		assert_eq!(symbols.lookup("label"), SymbolValue::Deferred);
		assert_eq!(symbols.lookup("missing"), SymbolValue::Undefined);
		assert_eq!(symbols.evaluate(&Expression::symbol("label".into(), (0, 1).into()), 0x1000, &source).unwrap(), 0x1004);
	}

	#[test]
	fn recursive_definitions_are_detected() {
		let source = source();
		let mut symbols = SymbolTable::default();
		symbols.define("a".into(), Expression::symbol("b".into(), (4, 1).into()), (0, 1).into(), &source).unwrap();
		symbols.define("b".into(), Expression::symbol("a".into(), (10, 1).into()), (6, 1).into(), &source).unwrap();
		let error = symbols.evaluate(&Expression::symbol("a".into(), (0, 1).into()), 0, &source).unwrap_err();
		assert!(matches!(*error, AssemblyError::RecursiveSymbol { .. }));
		let error = symbols.evaluate(&Expression::symbol("c".into(), (0, 1).into()), 0, &source).unwrap_err();
		assert!(matches!(*error, AssemblyError::UnresolvedSymbol { .. }));
	}

	#[test]
	fn synthetic_labels_are_unique() {
		let mut symbols = SymbolTable::default();
		let first = symbols.fresh_synthetic_label();
		let second = symbols.fresh_synthetic_label();
		assert_ne!(first, second);
		assert!(first.starts_with('<'));
	}
}
