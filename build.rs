use std::path::PathBuf;

fn main() {
    println!("cargo::rerun-if-changed=build.rs");
    println!("cargo::rerun-if-changed=tests");

    build_test_package("lang");
}

/// Writes one `#[test]` per `.mn` script under `tests/{package_name}` into `OUT_DIR/tests/{package_name}.rs`.
fn build_test_package(package_name: &str) {
    let out_dir = PathBuf::from(std::env::var_os("OUT_DIR").expect("cargo sets OUT_DIR for build scripts"));

    let mut tests = Vec::new();

    for path in glob::glob(format!("tests/{}/**/*.mn", package_name).as_str()).expect("Failed to read glob pattern").flatten() {
        let name = format!("{}", path.display())
            .replace(std::path::MAIN_SEPARATOR_STR, "_")
            .replace('-', "_");

        if let Some(name) = name.strip_prefix("tests_").and_then(|s| s.strip_suffix(".mn")) {
            tests.push((path.to_owned(), name.to_owned()));
        }
    }

    let test_defs = tests.iter()
        .map(|(path, name)| format!("#[test]\nfn {name}() {{ run_file(\"{}\").expect(\"no errors\") }}", path.display()))
        .collect::<Vec<_>>()
        .join("\n\n");

    println!("cargo::rerun-if-changed=tests/{package_name}/");
    std::fs::create_dir_all(out_dir.join("tests")).expect("Unable to create test directory");
    std::fs::write(out_dir.join("tests").join(format!("{package_name}.rs")), test_defs).expect("Unable to write test file")
}
