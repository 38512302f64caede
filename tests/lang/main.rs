use std::path::Path;

use minik::{errors, imports::FileLoader, CaptureOutput, Interpreter, MinikError};

fn run_file(path: &str) -> Result<(), MinikError> {
    let content = std::fs::read(path)?;
    let content = std::str::from_utf8(&content).map_err(|_e| errors::system(
        "The file you provided is not a valid UTF-8 file.",
        "Make sure that the file is a valid UTF-8 file.",
    ))?;

    let expect_re = regex::RegexBuilder::new(r"//\s*expect: (.*)")
        .case_insensitive(true)
        .dot_matches_new_line(false)
        .build()
        .expect("regex should compile correctly");

    let expected: String = expect_re
        .captures_iter(content).map(|m| m.get(1).expect("expect expression should have a value").as_str())
        .collect::<Vec<&str>>()
        .join("\n");

    let root = Path::new(path).parent().unwrap_or_else(|| Path::new("."));
    let mut loader = FileLoader::new(root);

    let output = CaptureOutput::new();
    let mut interpreter = Interpreter::default().with_output(Box::new(output.clone()));
    let errs = minik::run(&mut interpreter, content, &mut loader);

    if content.contains("// Error") {
        assert!(!errs.is_empty(), "Expected an error to be raised.");
        assert!(errs.iter().all(|e| !e.is_runtime()), "Expected only static errors, got {:?}", errs);
    } else if content.contains("// expect runtime error") {
        assert_eq!(errs.len(), 1, "Expected exactly one runtime error, got {:?}", errs);
        assert!(errs[0].is_runtime(), "Expected a runtime error, got {:?}", errs);

        if let Some(message) = content.lines().find_map(|line| line.split("// expect runtime error: ").nth(1)) {
            assert_eq!(errs[0].description(), message.trim());
        }
    } else {
        assert!(errs.is_empty(), "Did not expect an error, got {:?}", errs);
    }

    let actual = output.to_string();
    assert_eq!(expected.trim(), actual.trim());

    Ok(())
}

include!(concat!(env!("OUT_DIR"), "/tests/lang.rs"));
