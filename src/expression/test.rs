use std::sync::Arc;

use proptest::prelude::*;

use super::*;
use crate::parser::{TokenStream, lex};
use crate::symbols::SymbolTable;

fn span() -> SourceSpan {
	(0, 0).into()
}

fn parse_with(text: &str, symbols: &SymbolTable) -> (Option<Expression>, Vec<AssemblyError>, TokenStream) {
	let source = Arc::new(AssemblyCode::new(text, "<test>"));
	let mut stream = TokenStream::new(lex(&source).unwrap(), text.len());
	let mut context = ParseContext::new(symbols, Expression::program_counter(0x10, span()), &source, |name| {
		name.eq_ignore_ascii_case("x")
	});
	let expression = context.parse_expression(&mut stream, 0);
	(expression, context.errors, stream)
}

fn evaluate(text: &str) -> Option<MemoryAddress> {
	parse_with(text, &SymbolTable::default()).0.and_then(|expression| expression.value())
}

#[test]
fn precedence_and_associativity() {
	assert_eq!(evaluate("1 + 2 * 3"), Some(7));
	assert_eq!(evaluate("10 - 4 - 3"), Some(3));
	assert_eq!(evaluate("1 | 2 ^ 3 & 6"), Some(1 | (2 ^ (3 & 6))));
	assert_eq!(evaluate("1 << 2 + 1"), Some(8));
	assert_eq!(evaluate("(1 + 2) * 3"), Some(9));
	assert_eq!(evaluate("-2 * 3"), Some(-6));
	assert_eq!(evaluate("~0"), Some(-1));
	assert_eq!(evaluate("<$1234"), Some(0x34));
	assert_eq!(evaluate(">$1234"), Some(0x12));
	assert_eq!(evaluate("17 % 5"), Some(2));
	assert_eq!(evaluate("-7 / 2"), Some(-3));
}

#[test]
fn shifts_out_of_range() {
	assert_eq!(evaluate("1 << 64"), Some(0));
	assert_eq!(evaluate("-8 >> 100"), Some(-1));
	assert_eq!(evaluate("8 >> 100"), Some(0));
	assert_eq!(evaluate("1 << -1"), Some(0));
}

#[test]
fn arithmetic_wraps() {
	assert_eq!(evaluate("$7fffffffffffffff + 1"), Some(i64::MIN));
}

#[test]
fn division_by_zero_is_a_diagnostic() {
	let (expression, errors, stream) = parse_with("5 / (3 - 3)", &SymbolTable::default());
	assert!(expression.is_none());
	assert!(matches!(errors.as_slice(), [AssemblyError::DivisionByZero { .. }]));
	assert_eq!(stream.bookmark(), TokenStream::new(Vec::new(), 0).bookmark());
}

#[test]
fn parentheses_are_kept() {
	let (expression, ..) = parse_with("(5)", &SymbolTable::default());
	let expression = expression.unwrap();
	assert!(expression.is_parenthesized());
	assert!(expression.is_constant());
	assert_eq!(expression.value(), Some(5));

	let (expression, ..) = parse_with("(5)+1", &SymbolTable::default());
	let expression = expression.unwrap();
	assert!(!expression.is_parenthesized());
	assert_eq!(expression.value(), Some(6));
}

#[test]
fn symbols_and_program_counter() {
	let source = Arc::new(AssemblyCode::new("", "<test>"));
	let mut symbols = SymbolTable::default();
	symbols.define("known".into(), Expression::constant(0x20, span()), span(), &source).unwrap();
	assert_eq!(parse_with("known + 1", &symbols).0.unwrap().value(), Some(0x21));

	let (expression, ..) = parse_with("later + 1", &symbols);
	let expression = expression.unwrap();
	assert!(!expression.is_constant());
	assert_eq!(expression.symbols(), vec![&SharedStr::from("later")]);

	let (expression, ..) = parse_with("* + 2", &symbols);
	let expression = expression.unwrap();
	assert!(matches!(expression.kind(), ExpressionKind::Binary(BinaryOperator::Add, ..)));
	assert_eq!(symbols.evaluate(&expression, 0x8000, &source).unwrap(), 0x8012);
}

#[test]
fn reserved_names_are_not_symbols() {
	let (expression, _, stream) = parse_with("x", &SymbolTable::default());
	assert!(expression.is_none());
	assert_eq!(stream.bookmark(), TokenStream::new(Vec::new(), 0).bookmark());
	// The operator is left for the operand grammar.
	let (expression, _, mut stream) = parse_with("4 + x", &SymbolTable::default());
	assert_eq!(expression.unwrap().value(), Some(4));
	assert!(stream.advance().class() == crate::parser::TokenClass::Plus);
}

#[test]
fn range_check_boundaries() {
	let source = Arc::new(AssemblyCode::new("", "<test>"));
	assert!(Expression::constant(-129, span()).check_range(-128, 255, &source).is_err());
	assert!(Expression::constant(256, span()).check_range(-128, 255, &source).is_err());
	assert_eq!(Expression::constant(-128, span()).check_range(-128, 255, &source).unwrap().value(), Some(-128));
	assert_eq!(Expression::constant(255, span()).check_range(-128, 255, &source).unwrap().value(), Some(255));
	let deferred = Expression::symbol("far".into(), span());
	assert_eq!(deferred.clone().check_range(0, 1, &source).unwrap(), deferred);
}

#[test]
fn mask_shift_and_relative() {
	assert_eq!(Expression::constant(0x1234, span()).mask(8).value(), Some(0x34));
	assert_eq!(Expression::constant(3, span()).shift(4).value(), Some(0x30));
	assert_eq!(Expression::constant(0x30, span()).shift(-4).value(), Some(3));
	let pc = Expression::constant(0x1000, span());
	assert_eq!(Expression::constant(0x1010, span()).pc_relative(pc, 2).value(), Some(0x0e));

	let symbolic = Expression::symbol("target".into(), span()).pc_relative(Expression::constant(0x1000, span()), 2);
	assert!(!symbolic.is_constant());

	let relocatable =
		Expression::program_counter(0x20, span()).pc_relative(Expression::program_counter(0x10, span()), 2);
	assert_eq!(relocatable.value(), Some(0x0e));
}

fn constant_tree() -> impl Strategy<Value = String> {
	let leaf = (-1000i64 .. 1000).prop_map(|value| format!("({value})"));
	leaf.prop_recursive(4, 32, 2, |inner| {
		(inner.clone(), prop::sample::select(vec!["+", "-", "*", "&", "|", "^", "<<", ">>"]), inner)
			.prop_map(|(lhs, operator, rhs)| format!("({lhs} {operator} {rhs})"))
	})
}

proptest! {
	#[test]
	fn folding_is_idempotent(text in constant_tree()) {
		let (expression, errors, _) = parse_with(&text, &SymbolTable::default());
		prop_assert!(errors.is_empty());
		let expression = expression.unwrap();
		prop_assert!(expression.is_constant());
		let once = expression.value().unwrap();
		let refolded = Expression::parenthesized(expression.clone(), span());
		prop_assert_eq!(refolded.value(), Some(once));
		let refolded = Expression::binary(BinaryOperator::Or, refolded, Expression::constant(0, span())).unwrap();
		prop_assert_eq!(refolded.value(), Some(once));
		// Folding at parse time agrees with link-time evaluation of the same tree.
		let source = Arc::new(AssemblyCode::new(&text, "<test>"));
		prop_assert_eq!(SymbolTable::default().evaluate(&expression, 0, &source).unwrap(), once);
	}

	#[test]
	fn range_check_is_exact(value in any::<i64>(), low in -1000i64 .. 0, high in 0i64 .. 1000) {
		let source = Arc::new(AssemblyCode::new("", "<test>"));
		let result = Expression::constant(value, span()).check_range(low, high, &source);
		prop_assert_eq!(result.is_ok(), (low ..= high).contains(&value));
	}
}
