use std::sync::Arc;

use super::{Features, Z80};
use crate::backend::{Backend, MachineConfig};
use crate::cli::default_frontend;
use crate::{AssemblyCode, AssemblyError, assemble};

fn assemble_for(cpu: &str, text: &str) -> (Result<Vec<u8>, Box<AssemblyError>>, Vec<AssemblyError>) {
	let source = Arc::new(AssemblyCode::new(text, "<test>"));
	let frontend = default_frontend();
	let config = MachineConfig::new(Z80::cpu(cpu).unwrap());
	let result = assemble::<Z80>(&source, config, &*frontend).and_then(|program| program.link(0));
	(result, frontend.take())
}

#[track_caller]
fn assert_bytes(cpu: &str, text: &str, expected: &[u8]) {
	match assemble_for(cpu, text).0 {
		Ok(bytes) => assert_eq!(bytes, expected, "`{text}` on {cpu}"),
		Err(error) => panic!("`{text}` on {cpu} failed: {error:?}"),
	}
}

fn error(cpu: &str, text: &str) -> AssemblyError {
	match *assemble_for(cpu, text).0.unwrap_err() {
		AssemblyError::AssemblyFailed { mut errors, .. } => {
			assert_eq!(errors.len(), 1, "{errors:?}");
			errors.remove(0)
		},
		other => other,
	}
}

#[test]
fn cpu_names() {
	assert_eq!(Z80::cpu("Z80"), Some(Features::Z80));
	assert_eq!(Z80::cpu("z80n"), Some(Features::Z80 | Features::Z80N));
	assert_eq!(Z80::cpu("6502"), None);
}

#[test]
fn loads() {
	assert_bytes("z80", "ld a,b", &[0x78]);
	assert_bytes("z80", "ld (hl),5", &[0x36, 0x05]);
	assert_bytes("z80", "ld a,(ix+5)", &[0xdd, 0x7e, 0x05]);
	assert_bytes("z80", "ld (iy-2),a", &[0xfd, 0x77, 0xfe]);
	assert_bytes("z80", "ld (ix),7", &[0xdd, 0x36, 0x00, 0x07]);
	assert_bytes("z80", "ld (de),a", &[0x12]);
	assert_bytes("z80", "ld a,(bc)", &[0x0a]);
	assert_bytes("z80", "ld a,i", &[0xed, 0x57]);
	assert_bytes("z80", "ld r,a", &[0xed, 0x4f]);
	assert_bytes("z80", "ld hl,$1234", &[0x21, 0x34, 0x12]);
	assert_bytes("z80", "ld ix,$1234", &[0xdd, 0x21, 0x34, 0x12]);
	assert_bytes("z80", "ld sp,hl", &[0xf9]);
	assert_bytes("z80", "ld ($1234),hl", &[0x22, 0x34, 0x12]);
	assert_bytes("z80", "ld de,($1234)", &[0xed, 0x5b, 0x34, 0x12]);
	assert_bytes("z80", "ld ($1234),a", &[0x32, 0x34, 0x12]);
	assert!(matches!(error("z80", "ld (hl),(hl)"), AssemblyError::InvalidAddressingMode { .. }));
	assert!(matches!(error("z80", "ld a,256"), AssemblyError::ValueOutOfRange { .. }));
}

#[test]
fn parenthesized_expressions() {
	assert_bytes("z80", "ld a,(5)", &[0x3a, 0x05, 0x00]);
	assert_bytes("z80", "ld a,(5)+1", &[0x3e, 0x06]);
	assert_bytes("z80", "ld hl,(2)*(3)", &[0x21, 0x06, 0x00]);
}

#[test]
fn synthesized_loads() {
	assert_bytes("z80", "ld bc,de", &[0x42, 0x4b]);
	assert_bytes("z80", "ld hl,de", &[0x62, 0x6b]);
	assert_bytes("z80", "ld ix,bc", &[0xc5, 0xdd, 0xe1]);
	assert_bytes("z80", "ld bc,(hl)", &[0x4e, 0x23, 0x46, 0x2b]);
	assert_bytes("z80", "ld (hl),de", &[0x73, 0x23, 0x72, 0x2b]);
	assert_bytes("z80", "ld hl,(ix+2)", &[0xdd, 0x6e, 0x02, 0xdd, 0x66, 0x03]);
	assert_bytes("z80", "ld (ix+2),de", &[0xdd, 0x73, 0x02, 0xdd, 0x72, 0x03]);
	assert!(matches!(error("z80", "ld hl,(hl)"), AssemblyError::InvalidAddressingMode { .. }));
	assert!(matches!(error("z80", ".synth off\nld bc,de"), AssemblyError::SynthesisDisabled { .. }));
}

#[test]
fn synthesized_instructions_are_announced() {
	let (result, diagnostics) = assemble_for("z80", "jp z,(hl)");
	assert_eq!(result.unwrap(), [0x20, 0x01, 0xe9]);
	assert!(
		matches!(diagnostics.as_slice(), [AssemblyError::SynthesizedInstruction { count: 2, .. }]),
		"{diagnostics:?}"
	);
}

#[test]
fn stack_and_exchange() {
	assert_bytes("z80", "push af\npush bc\npop iy", &[0xf5, 0xc5, 0xfd, 0xe1]);
	assert_bytes("z80", "ex de,hl\nex af,af'\nex (sp),ix", &[0xeb, 0x08, 0xdd, 0xe3]);
	assert!(matches!(error("z80", "push sp"), AssemblyError::InvalidAddressingMode { .. }));
}

#[test]
fn arithmetic() {
	assert_bytes("z80", "add a,b", &[0x80]);
	assert_bytes("z80", "sub b\nsub a,b", &[0x90, 0x90]);
	assert_bytes("z80", "xor a", &[0xaf]);
	assert_bytes("z80", "cp 5", &[0xfe, 0x05]);
	assert_bytes("z80", "and (ix+1)", &[0xdd, 0xa6, 0x01]);
	assert_bytes("z80", "add hl,bc", &[0x09]);
	assert_bytes("z80", "adc hl,de", &[0xed, 0x5a]);
	assert_bytes("z80", "sbc hl,sp", &[0xed, 0x72]);
	assert_bytes("z80", "add ix,de\nadd iy,iy", &[0xdd, 0x19, 0xfd, 0x29]);
	assert!(matches!(error("z80", "sub hl,bc"), AssemblyError::InvalidAddressingMode { .. }));
}

#[test]
fn increment_and_decrement() {
	assert_bytes("z80", "inc a\ndec (hl)", &[0x3c, 0x35]);
	assert_bytes("z80", "inc bc\ndec sp", &[0x03, 0x3b]);
	assert_bytes("z80", "inc ix\ndec (iy+4)", &[0xdd, 0x23, 0xfd, 0x35, 0x04]);
}

#[test]
fn shifts_and_bits() {
	assert_bytes("z80", "rlc b", &[0xcb, 0x00]);
	assert_bytes("z80", "srl (ix+1)", &[0xdd, 0xcb, 0x01, 0x3e]);
	assert_bytes("z80", "sla hl", &[0xcb, 0x25, 0xcb, 0x14]);
	assert_bytes("z80", "srl de", &[0xcb, 0x3a, 0xcb, 0x1b]);
	assert_bytes("z80", "bit 7,a", &[0xcb, 0x7f]);
	assert_bytes("z80", "set 0,(hl)", &[0xcb, 0xc6]);
	assert_bytes("z80", "res 1,(ix+2)", &[0xdd, 0xcb, 0x02, 0x8e]);
	assert!(matches!(error("z80", "bit 8,a"), AssemblyError::ValueOutOfRange { .. }));
	assert!(matches!(error("z80", "rlc hl"), AssemblyError::InvalidAddressingMode { .. }));
}

#[test]
fn jumps() {
	assert_bytes("z80", "jp $1234", &[0xc3, 0x34, 0x12]);
	assert_bytes("z80", "jp nz,$1234", &[0xc2, 0x34, 0x12]);
	assert_bytes("z80", "jp (hl)\njp (ix)", &[0xe9, 0xdd, 0xe9]);
	assert_bytes("z80", ".org 0\njp pe,(ix)", &[0xe2, 0x05, 0x00, 0xdd, 0xe9]);
	assert_bytes("z80", ".org $100\nloop: nop\njr nz,loop", &[0x00, 0x20, 0xfd]);
	assert_bytes("z80", "jr end\nnop\nend: ret", &[0x18, 0x01, 0x00, 0xc9]);
	assert_bytes("z80", ".org 0\nloop: djnz loop", &[0x10, 0xfe]);
	assert_bytes("z80", "jr po,$1234", &[0xe2, 0x34, 0x12]);
	assert!(matches!(error("z80", "jp (ix+3)"), AssemblyError::InvalidAddressingMode { .. }));
	assert!(matches!(error("z80", ".synth off\njr m,$1234"), AssemblyError::SynthesisDisabled { .. }));
}

#[test]
fn calls_and_restarts() {
	assert_bytes("z80", "call $1234\ncall c,$1234", &[0xcd, 0x34, 0x12, 0xdc, 0x34, 0x12]);
	assert_bytes("z80", "ret\nret nz\nret m", &[0xc9, 0xc0, 0xf8]);
	assert_bytes("z80", "rst $38\nrst 8", &[0xff, 0xcf]);
	assert_bytes("z80", "im 2", &[0xed, 0x5e]);
	assert!(matches!(error("z80", "rst 3"), AssemblyError::InvalidConstant { .. }));
	assert!(matches!(error("z80", "im 3"), AssemblyError::InvalidConstant { .. }));
}

#[test]
fn ports() {
	assert_bytes("z80", "in a,($fe)\nout ($fe),a", &[0xdb, 0xfe, 0xd3, 0xfe]);
	assert_bytes("z80", "in b,(c)\nout (c),a", &[0xed, 0x40, 0xed, 0x79]);
	assert!(matches!(error("z80", "in b,($fe)"), AssemblyError::InvalidAddressingMode { .. }));
}

#[test]
fn implied() {
	assert_bytes("z80", "nop\nhalt\nexx", &[0x00, 0x76, 0xd9]);
	assert_bytes("z80", "ldir\nneg\nreti", &[0xed, 0xb0, 0xed, 0x44, 0xed, 0x4d]);
}

#[test]
fn next_extensions() {
	assert_bytes("z80n", "nextreg $07,3", &[0xed, 0x91, 0x07, 0x03]);
	assert_bytes("z80n", "nextreg $07,a", &[0xed, 0x92, 0x07]);
	assert_bytes("z80n", "mul d,e", &[0xed, 0x30]);
	assert_bytes("z80n", "add hl,a\nadd de,a", &[0xed, 0x31, 0xed, 0x32]);
	assert_bytes("z80n", "add bc,$1234", &[0xed, 0x36, 0x34, 0x12]);
	assert_bytes("z80n", "push $1234", &[0xed, 0x8a, 0x12, 0x34]);
	assert_bytes("z80n", "swapnib\nldirx", &[0xed, 0x23, 0xed, 0xb4]);
	assert_bytes("z80n", "test $0f", &[0xed, 0x27, 0x0f]);
	assert_bytes("z80", ".cpu z80n\nmirror", &[0xed, 0x24]);
	assert!(matches!(error("z80", "swapnib"), AssemblyError::UnsupportedInstruction { .. }));
	assert!(matches!(error("z80", "nextreg 7,3"), AssemblyError::UnsupportedInstruction { .. }));
	assert!(matches!(error("z80", "add hl,a"), AssemblyError::UnsupportedAddressingMode { .. }));
	assert!(matches!(error("z80", "push $1234"), AssemblyError::UnsupportedAddressingMode { .. }));
	assert!(matches!(error("z80n", "mul b,c"), AssemblyError::InvalidAddressingMode { .. }));
}
