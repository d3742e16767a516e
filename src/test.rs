//! Whole-file tests. Source lines carry the bytes they should assemble to in a `;=` comment.

use std::cmp::min;
use std::collections::HashMap;
use std::sync::Arc;

use crate::backend::{Backend, MachineConfig};
use crate::cli::default_frontend;
use crate::{AssemblyCode, AssemblyError, Mos6502, Z80, assemble, pretty_hex, run_assembler};

#[test]
fn mos6502() {
	test_file::<Mos6502>("tests/mos6502.asmtest");
}

#[test]
fn mega65() {
	test_file::<Mos6502>("tests/45gs02.asmtest");
}

#[test]
fn z80() {
	test_file::<Z80>("tests/z80.asmtest");
}

#[test]
fn library_entry_point() {
	assert_eq!(run_assembler::<Z80>("ld a,5\nret\n", "<test>").unwrap(), [0x3e, 0x05, 0xc9]);
	assert_eq!(run_assembler::<Mos6502>("\tlda #1\n", "<test>").unwrap(), [0xa9, 0x01]);
}

#[test]
fn errors() {
	let error_sources = std::fs::read_dir("tests/errors").unwrap();
	for error_source in error_sources {
		let error_source = error_source.unwrap().path();
		let source = AssemblyCode::from_file_or_assembly_error(&error_source.to_string_lossy()).unwrap();
		let frontend = default_frontend();
		let result = assemble::<Mos6502>(&source, MachineConfig::new(Mos6502::default_features()), &*frontend)
			.and_then(|program| program.link(0));
		println!("running {}...\n{:?}", error_source.display(), result);
		assert!(result.is_err(), "{} assembled without errors", error_source.display());
	}
}

#[test]
fn invalid_test_comment() {
	let source = Arc::new(AssemblyCode::new("nop ;= EA XY\n", "<test>"));
	assert!(matches!(*expected_bytes(&source).unwrap_err(), AssemblyError::InvalidTestComment { .. }));
}

fn test_file<B: Backend>(file: &str) {
	let source = AssemblyCode::from_file_or_assembly_error(file).unwrap();
	let expected = expected_bytes(&source).unwrap();
	let frontend = default_frontend();
	let program = assemble::<B>(&source, MachineConfig::new(B::default_features()), &*frontend).unwrap();
	let sections = program.link_sections(0).unwrap();

	let mut checked = 0;
	for entry in &program.listing {
		let Some(expected) = expected.get(&entry.line) else {
			continue;
		};
		let (start, data) = &sections[entry.section];
		let actual = &data[entry.offset .. entry.offset + entry.length];
		if actual != expected.as_slice() {
			let context_start = entry.offset.saturating_sub(4);
			panic!(
				"{file}:{}: Expected and actual assembly differ at {:04X}:\n\texpected: {:02X?}\n\tactual:   {:02X?}\nhint: \
				 the bytes around the statement are:\n{}",
				entry.line,
				*start + entry.offset as i64,
				expected,
				actual,
				pretty_hex(
					&data[context_start .. min(data.len(), entry.offset + entry.length + 4)],
					Some(entry.offset - context_start)
				)
			);
		}
		checked += 1;
	}
	assert_eq!(checked, expected.len(), "{file}: some `;=` comments are not on a statement");
}

/// Collects the contents of the expected value comments by 1-based line number.
fn expected_bytes(source: &Arc<AssemblyCode>) -> Result<HashMap<usize, Vec<u8>>, Box<AssemblyError>> {
	let mut expected = HashMap::new();
	let mut line_start = 0;
	for (index, line) in source.text.split('\n').enumerate() {
		if let Some(position) = line.find(";=") {
			let bytes = line[position + 2 ..]
				.split_whitespace()
				.map(|byte| u8::from_str_radix(byte, 16))
				.collect::<Result<Vec<_>, _>>()
				.map_err(|basis| AssemblyError::InvalidTestComment {
					location: (line_start + position, line.len() - position).into(),
					src: source.clone(),
					basis,
				})?;
			expected.insert(index + 1, bytes);
		}
		line_start += line.len() + 1;
	}
	Ok(expected)
}
