use std::sync::Arc;

use proptest::prelude::*;

use super::{Features, Mos6502};
use crate::backend::{Backend, MachineConfig};
use crate::cli::default_frontend;
use crate::{AssemblyCode, AssemblyError, assemble};

fn assemble_for(cpu: &str, text: &str) -> Result<Vec<u8>, Box<AssemblyError>> {
	let source = Arc::new(AssemblyCode::new(text, "<test>"));
	let frontend = default_frontend();
	let config = MachineConfig::new(Mos6502::cpu(cpu).unwrap());
	assemble::<Mos6502>(&source, config, &*frontend)?.link(0)
}

#[track_caller]
fn assert_bytes(cpu: &str, text: &str, expected: &[u8]) {
	match assemble_for(cpu, text) {
		Ok(bytes) => assert_eq!(bytes, expected, "`{text}` on {cpu}"),
		Err(error) => panic!("`{text}` on {cpu} failed: {error:?}"),
	}
}

/// The single error of a failed run.
fn error(cpu: &str, text: &str) -> AssemblyError {
	match *assemble_for(cpu, text).unwrap_err() {
		AssemblyError::AssemblyFailed { mut errors, .. } => {
			assert_eq!(errors.len(), 1, "{errors:?}");
			errors.remove(0)
		},
		other => other,
	}
}

#[test]
fn cpu_names() {
	assert_eq!(Mos6502::cpu("6502"), Some(Features::BASE));
	assert_eq!(Mos6502::cpu("4510"), Mos6502::cpu("65CE02"));
	assert!(Mos6502::cpu("45gs02").unwrap().contains(Features::GS02 | Features::ROCKWELL));
	assert_eq!(Mos6502::cpu("65816"), None);
}

#[test]
fn group_one() {
	assert_bytes("6502", "lda #$12", &[0xa9, 0x12]);
	assert_bytes("6502", "lda $12", &[0xa5, 0x12]);
	assert_bytes("6502", "lda $1234", &[0xad, 0x34, 0x12]);
	assert_bytes("6502", "lda $12,x", &[0xb5, 0x12]);
	assert_bytes("6502", "lda $1234,x", &[0xbd, 0x34, 0x12]);
	// There is no zero page,Y form for group one.
	assert_bytes("6502", "lda $12,y", &[0xb9, 0x12, 0x00]);
	assert_bytes("6502", "lda ($12,x)", &[0xa1, 0x12]);
	assert_bytes("6502", "lda ($12),y", &[0xb1, 0x12]);
	assert_bytes("6502", "sta $1234,y", &[0x99, 0x34, 0x12]);
	assert_bytes("6502", "eor #-1", &[0x49, 0xff]);
	assert_bytes("65c02", "lda ($12)", &[0xb2, 0x12]);
	assert!(matches!(error("6502", "lda ($12)"), AssemblyError::UnsupportedAddressingMode { .. }));
	assert!(matches!(error("6502", "sta #1"), AssemblyError::InvalidAddressingMode { .. }));
}

#[test]
fn read_modify_write() {
	assert_bytes("6502", "asl", &[0x0a]);
	assert_bytes("6502", "asl a", &[0x0a]);
	assert_bytes("6502", "rol $12", &[0x26, 0x12]);
	assert_bytes("6502", "inc $1234,x", &[0xfe, 0x34, 0x12]);
	assert_bytes("65c02", "inc a", &[0x1a]);
	assert_bytes("65c02", "dec", &[0x3a]);
	assert!(matches!(error("6502", "inc a"), AssemblyError::UnsupportedAddressingMode { .. }));
}

#[test]
fn irregular_operands() {
	assert_bytes("6502", "ldx $12,y", &[0xb6, 0x12]);
	assert_bytes("6502", "stx $12,y", &[0x96, 0x12]);
	assert_bytes("6502", "jmp ($1234)", &[0x6c, 0x34, 0x12]);
	// An indirect jump never narrows.
	assert_bytes("6502", "jmp ($12)", &[0x6c, 0x12, 0x00]);
	assert_bytes("65c02", "jmp ($1234,x)", &[0x7c, 0x34, 0x12]);
	assert_bytes("65c02", "bit #$80", &[0x89, 0x80]);
	assert_bytes("65ce02", "stx $1234,y", &[0x9b, 0x34, 0x12]);
	assert!(matches!(error("6502", "jmp ($1234,x)"), AssemblyError::UnsupportedAddressingMode { .. }));
	assert!(matches!(error("65c02", "stx $1234,y"), AssemblyError::UnsupportedAddressingMode { .. }));
}

#[test]
fn implied() {
	assert_bytes("6502", "nop\nbrk\nrts", &[0xea, 0x00, 0x60]);
	assert_bytes("65c02", "phx\nply", &[0xda, 0x7a]);
	assert_bytes("4510", "map\nnop", &[0x5c, 0xea]);
	assert!(matches!(error("65c02", "map"), AssemblyError::UnsupportedInstruction { .. }));
	assert!(matches!(error("6502", "phx"), AssemblyError::UnsupportedInstruction { .. }));
}

#[test]
fn width_prefixes() {
	assert_bytes("6502", "lda |$12", &[0xad, 0x12, 0x00]);
	assert_bytes("6502", "lda >$12", &[0xad, 0x12, 0x00]);
	assert_bytes("6502", "lda <$1234", &[0xa5, 0x34]);
	assert_bytes("6502", "lda <$1234,x", &[0xb5, 0x34]);
}

#[test]
fn base_page() {
	assert_bytes("6502", ".basepage $d0\nlda $d020", &[0xa5, 0x20]);
	assert_bytes("6502", ".basepage $d0\nlda $20", &[0xad, 0x20, 0x00]);
	assert!(matches!(error("65ce02", "inw $1234"), AssemblyError::OutsideBasePage { value: 0x1234, .. }));
	assert!(matches!(error("6502", "lda ($1234),y"), AssemblyError::OutsideBasePage { value: 0x1234, .. }));
	assert_bytes("65ce02", ".basepage $12\ninw $1234", &[0xe3, 0x34]);
}

#[test]
fn indexed_pointers_are_followed_by_more_code() {
	assert_bytes("6502", "lda ($12),y\nnop", &[0xb1, 0x12, 0xea]);
	assert_bytes("65c02", "lda ($10),y\nlda ($10)", &[0xb1, 0x10, 0xb2, 0x10]);
	assert_bytes("65ce02", "sta ($10),z\nrts", &[0x92, 0x10, 0x60]);
}

#[test]
fn base_page_forward_references() {
	assert_bytes("6502", "lda (pointer),y\npointer = $fb", &[0xb1, 0xfb]);
	assert_bytes("65ce02", ".basepage $20\ninw pointer\npointer = $2010", &[0xe3, 0x10]);
	assert!(matches!(
		error("65ce02", ".basepage $20\ninw pointer\npointer = $1ff0"),
		AssemblyError::PatchOutOfRange { value: -0x10, .. }
	));
	assert!(matches!(
		error("6502", "lda (pointer),y\npointer = $100"),
		AssemblyError::PatchOutOfRange { value: 0x100, .. }
	));
}

#[test]
fn forward_references_stay_wide() {
	assert_bytes("6502", "lda later\nlater = $12", &[0xad, 0x12, 0x00]);
	assert_bytes("6502", "early = $12\nlda early", &[0xa5, 0x12]);
}

#[test]
fn branches() {
	assert_bytes("6502", ".org $1000\nloop: dex\nbne loop", &[0xca, 0xd0, 0xfd]);
	assert_bytes("6502", "beq skip\nnop\nskip: rts", &[0xf0, 0x01, 0xea, 0x60]);
	assert!(matches!(error("6502", ".org 0\nbeq $200"), AssemblyError::ValueOutOfRange { .. }));
	// The 65CE02 falls back to its 16-bit branch.
	assert_bytes("65ce02", ".org 0\nbeq $200", &[0xf3, 0xfd, 0x01]);
	assert_bytes("65ce02", ".org $1000\nbsr $1000", &[0x63, 0xfd, 0xff]);
	assert_bytes("65ce02", ".org $1000\nbne |$1000", &[0xd3, 0xfd, 0xff]);
}

#[test]
fn long_conditional_jumps() {
	assert_bytes("6502", ".org $1000\njcc $2000", &[0xb0, 0x03, 0x4c, 0x00, 0x20]);
	assert_bytes("65ce02", ".org $1000\njeq $1000", &[0xf3, 0xfd, 0xff]);
	assert!(matches!(error("6502", ".synth off\njmi $1234"), AssemblyError::SynthesisDisabled { .. }));
}

#[test]
fn rockwell_bit_instructions() {
	assert_bytes("65c02", "rmb5 $20", &[0x57, 0x20]);
	assert_bytes("65c02", "smb0 $20", &[0x87, 0x20]);
	assert_bytes("65c02", ".org 0\nbbr3 $12, 0", &[0x3f, 0x12, 0xfd]);
	assert_bytes("65c02", ".org 0\nbbs 7, $12, 0", &[0xff, 0x12, 0xfd]);
	assert!(matches!(error("65c02", "rmb 8, $20"), AssemblyError::ValueOutOfRange { .. }));
	assert!(matches!(error("6502", "rmb5 $20"), AssemblyError::UnsupportedInstruction { .. }));
}

#[test]
fn ce02_modes() {
	assert_bytes("65ce02", "lda ($12,sp),y", &[0xe2, 0x12]);
	assert_bytes("65ce02", "sta ($12,sp),y", &[0x82, 0x12]);
	assert_bytes("65ce02", "lda ($12),z", &[0xb2, 0x12]);
	assert_bytes("65ce02", "phw #$1234", &[0xf4, 0x34, 0x12]);
	assert_bytes("65ce02", "phw $1234", &[0xfc, 0x34, 0x12]);
	assert_bytes("65ce02", "ldz #5", &[0xa3, 0x05]);
	assert_bytes("65ce02", "asr\nasr $12,x", &[0x43, 0x54, 0x12]);
	assert!(matches!(error("65ce02", "lda [$12],z"), AssemblyError::UnsupportedAddressingMode { .. }));
}

#[test]
fn quads() {
	assert_bytes("45gs02", "ldq $12", &[0x42, 0x42, 0xa5, 0x12]);
	assert_bytes("45gs02", "ldq ($12),z", &[0x42, 0x42, 0xb2, 0x12]);
	assert_bytes("45gs02", "ldq [$12],z", &[0x42, 0x42, 0xea, 0xb2, 0x12]);
	assert_bytes("45gs02", "stq $1234", &[0x42, 0x42, 0x8d, 0x34, 0x12]);
	assert_bytes("45gs02", "aslq", &[0x42, 0x42, 0x0a]);
	assert_bytes("45gs02", "inq $12", &[0x42, 0x42, 0xe6, 0x12]);
	assert_bytes("45gs02", "lda [$12]", &[0xea, 0xb2, 0x12]);
	assert!(matches!(error("65ce02", "ldq $12"), AssemblyError::UnsupportedInstruction { .. }));
	assert!(matches!(error("45gs02", "ldq $12,y"), AssemblyError::InvalidAddressingMode { .. }));
}

#[test]
fn quad_immediate_is_synthesized() {
	assert_bytes("45gs02", "ldq #$11223344", &[0xa9, 0x44, 0xa2, 0x33, 0xa0, 0x22, 0xa3, 0x11]);
	assert_bytes("45gs02", "ldq #0", &[0xa9, 0x00, 0xaa, 0xa8, 0x4b]);
	assert_bytes("45gs02", "ldq #$01000001", &[0xa9, 0x01, 0xa2, 0x00, 0xa0, 0x00, 0x4b]);
	assert!(matches!(error("45gs02", ".synth off\nldq #1"), AssemblyError::SynthesisDisabled { .. }));
	assert!(matches!(error("45gs02", "ldq #$100000000"), AssemblyError::ValueOutOfRange { .. }));
}

#[test]
fn quad_immediate_with_unknown_value() {
	assert_bytes("45gs02", "ldq #value\nvalue = $aabbccdd", &[0xa9, 0xdd, 0xa2, 0xcc, 0xa0, 0xbb, 0xa3, 0xaa]);
}

proptest! {
	#[test]
	fn addresses_narrow_to_zero_page(address in 0 ..= 0xffi64) {
		prop_assert_eq!(assemble_for("6502", &format!("lda {address}")).unwrap(), vec![0xa5, address as u8]);
	}

	#[test]
	fn addresses_outside_zero_page_stay_absolute(address in 0x100 ..= 0xffffi64) {
		prop_assert_eq!(
			assemble_for("6502", &format!("lda {address},x")).unwrap(),
			vec![0xbd, address as u8, (address >> 8) as u8]
		);
	}
}
