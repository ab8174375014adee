#[test]
fn bagr_cli_tests() {
    trycmd::TestCases::new().case("tests/cmd/*.toml");
}
