use std::sync::Arc;

use super::*;
use crate::backend::Backend;
use crate::cli::default_frontend;
use crate::mos6502::Mos6502;

fn run(text: &str) -> (Result<AssembledProgram, Box<AssemblyError>>, Vec<AssemblyError>) {
	let source = Arc::new(AssemblyCode::new(text, "<test>"));
	let frontend = default_frontend();
	let result = assemble::<Mos6502>(&source, MachineConfig::new(Mos6502::default_features()), &*frontend);
	(result, frontend.take())
}

fn bytes(text: &str) -> Vec<u8> {
	run(text).0.unwrap().link(0).unwrap()
}

fn errors(text: &str) -> Vec<AssemblyError> {
	match *run(text).0.unwrap_err() {
		AssemblyError::AssemblyFailed { errors, count } => {
			assert_eq!(count, errors.len());
			errors
		},
		other => vec![other],
	}
}

#[test]
fn labels_and_constants() {
	let code = "
		.org $1000
start:	lda #value
value = 5
		jmp start
";
	assert_eq!(bytes(code), [0xa9, 0x05, 0x4c, 0x00, 0x10]);
	assert_eq!(bytes("size equ 4\nldx #size"), [0xa2, 0x04]);
}

#[test]
fn relocatable_code_is_placed_at_base() {
	let program = run("	jmp end\n	nop\nend: rts\n").0.unwrap();
	assert_eq!(program.link(0x0800).unwrap(), [0x4c, 0x04, 0x08, 0xea, 0x60]);
	assert_eq!(program.link(0).unwrap(), [0x4c, 0x04, 0x00, 0xea, 0x60]);
}

#[test]
fn sections_are_joined_with_gaps() {
	let program = run(".org $10\n.byte 1, 2\n.org $14\n.byte 3\n").0.unwrap();
	assert_eq!(program.sections.len(), 2);
	assert_eq!(program.link_sections(0).unwrap(), vec![(0x10, vec![1, 2]), (0x14, vec![3])]);
	assert_eq!(program.link(0).unwrap(), [1, 2, 0, 0, 3]);
}

#[test]
fn overlapping_sections() {
	let program = run(".org $10\n.byte 1, 2, 3\n.org $11\n.byte 4\n").0.unwrap();
	let error = program.link(0).unwrap_err();
	assert!(
		matches!(*error, AssemblyError::OverlappingSections { section_start: 0x11, previous_end: 0x12, .. }),
		"{error:?}"
	);
}

#[test]
fn label_in_front_of_origin() {
	let program = run(".org $300\nnop\ntarget: .org $400\njmp target\n").0.unwrap();
	assert_eq!(program.link_sections(0).unwrap(), vec![(0x300, vec![0xea]), (0x400, vec![0x4c, 0x00, 0x04])]);
}

#[test]
fn every_failing_statement_is_reported() {
	let errors = errors(".org 0\nlda #1\nlda #$100\nfoo bar\n.byte 7\n.frobnicate\n");
	assert_eq!(errors.len(), 3, "{errors:?}");
	assert!(matches!(errors[0], AssemblyError::ValueOutOfRange { value: 0x100, .. }));
	assert!(matches!(&errors[1], AssemblyError::UnknownMnemonic { name, .. } if name == "foo"));
	assert!(matches!(&errors[2], AssemblyError::UnknownDirective { name, .. } if name == "frobnicate"));
}

#[test]
fn failed_statement_output_is_rolled_back() {
	let source = Arc::new(AssemblyCode::new(".byte 1\n.word 2, (\n.byte 3\n", "<test>"));
	let frontend = default_frontend();
	let mut assembler = Assembler::<Mos6502>::new(&source, MachineConfig::new(Mos6502::default_features()), &*frontend);
	let mut stream = TokenStream::new(lex(&source).unwrap(), source.text.len());
	while !stream.is_exhausted() {
		if stream.eat(TokenClass::Newline).is_some() {
			continue;
		}
		assembler.statement(&mut stream).unwrap();
	}
	assert_eq!(assembler.sections[0].section.data(), [1, 3]);
	assert_eq!(assembler.errors.len(), 1);
}

#[test]
fn listing() {
	let program = run(".org $200\nnop\nlda #1\n\n.byte 1, 2, 3\n").0.unwrap();
	assert_eq!(program.listing, vec![
		ListingEntry { line: 1, section: 0, offset: 0, length: 0 },
		ListingEntry { line: 2, section: 0, offset: 0, length: 1 },
		ListingEntry { line: 3, section: 0, offset: 1, length: 2 },
		ListingEntry { line: 5, section: 0, offset: 3, length: 3 },
	]);
}

#[test]
fn dangling_tokens() {
	assert!(matches!(errors(".byte 1 2").as_slice(), [AssemblyError::DanglingTokens { .. }]));
}

#[test]
fn redefined_label() {
	assert!(matches!(errors("here: nop\nhere: nop\n").as_slice(), [AssemblyError::RedefinedSymbol { .. }]));
}

#[test]
fn synthesis_can_be_disabled() {
	let (result, diagnostics) = run("jeq $1234");
	assert_eq!(result.unwrap().link(0).unwrap(), [0xd0, 0x03, 0x4c, 0x34, 0x12]);
	assert!(
		matches!(diagnostics.as_slice(), [AssemblyError::SynthesizedInstruction { count: 2, .. }]),
		"{diagnostics:?}"
	);

	assert!(matches!(errors(".synth off\njeq $1234").as_slice(), [AssemblyError::SynthesisDisabled { .. }]));
	assert!(matches!(errors(".synth maybe").as_slice(), [AssemblyError::ExpectedToken { .. }]));
}

#[test]
fn oversized_data_is_truncated_with_a_warning() {
	let (result, diagnostics) = run(".byte $1ff, \"hi\"\n.word $12345");
	assert_eq!(result.unwrap().link(0).unwrap(), [0xff, b'h', b'i', 0x45, 0x23]);
	assert!(matches!(diagnostics.as_slice(), [
		AssemblyError::ValueTooLarge { value: 0x1ff, size: 8, .. },
		AssemblyError::ValueTooLarge { value: 0x12345, size: 16, .. },
	]));
}

#[test]
fn data_widths() {
	assert_eq!(bytes(".long $123456\n.dword $12345678\n.dw -1"), [
		0x56, 0x34, 0x12, 0x78, 0x56, 0x34, 0x12, 0xff, 0xff
	]);
}

#[test]
fn cpu_and_base_page_directives() {
	assert_eq!(bytes(".cpu \"65c02\"\nstz $12"), [0x64, 0x12]);
	assert_eq!(bytes(".basepage $20\nlda $2010\nlda $10"), [0xa5, 0x10, 0xad, 0x10, 0x00]);
	assert!(matches!(errors("stz $12").as_slice(), [AssemblyError::UnsupportedInstruction { .. }]));
	assert!(matches!(errors(".cpu z80").as_slice(), [AssemblyError::InvalidConstant { .. }]));
	assert!(matches!(errors(".basepage $100").as_slice(), [AssemblyError::ValueOutOfRange { .. }]));
}

#[test]
fn origin_must_be_constant() {
	assert!(matches!(errors(".org later\nlater: nop").as_slice(), [AssemblyError::InvalidConstant { .. }]));
}

#[test]
fn origin_must_be_an_address() {
	assert!(matches!(errors(".org $123456789\nnop").as_slice(), [AssemblyError::ValueOutOfRange { value: 0x1_2345_6789, .. }]));
	assert!(matches!(errors(".org -5\nnop").as_slice(), [AssemblyError::ValueOutOfRange { value: -5, .. }]));
	assert_eq!(bytes(".org $ffff\nnop"), [0xea]);
}
