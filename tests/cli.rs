//! Command line tests, driven by the cases in `tests/cli`.

#[test]
#[cfg(feature = "binaries")]
fn cli() {
	trycmd::TestCases::new().case("tests/cli/*.toml");
}
