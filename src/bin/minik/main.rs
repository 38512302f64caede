use std::{io::Write, path::Path};

use minik::{cmdline::CommandLineOptions, errors, imports::FileLoader, ErrorSink, Interpreter, MinikError};
use tracing_subscriber::EnvFilter;

/// Prints failures to stderr as `[line N] message`.
struct Console;

impl ErrorSink for Console {
    fn report(&mut self, line: usize, message: &str) {
        eprintln!("[line {}] {}", line, message);
    }
}

fn main() {
    let options = CommandLineOptions::parse();
    install_tracing(&options);

    let result = match &options.file {
        Some(filename) => run_file(filename),
        None => run_prompt(),
    };

    match result {
        Ok(true) => {},
        Ok(false) => std::process::exit(65),
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("{}", e.advice());
            std::process::exit(1);
        }
    }
}

fn install_tracing(options: &CommandLineOptions) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(options.default_log_filter()));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

/// Runs a script, returning whether it completed without errors.
fn run_file(filename: &str) -> Result<bool, MinikError> {
    let content = std::fs::read(filename)?;
    let content = std::str::from_utf8(&content).map_err(|_e| errors::system(
        "The file you provided is not a valid UTF-8 file.",
        "Make sure that the file is a valid UTF-8 file.",
    ))?;

    let root = Path::new(filename).parent().unwrap_or_else(|| Path::new("."));
    let mut loader = FileLoader::new(root);
    let mut interpreter = Interpreter::default();

    Ok(run(&mut interpreter, content, &mut loader))
}

fn run_prompt() -> Result<bool, MinikError> {
    let mut interpreter = Interpreter::default();
    let mut loader = FileLoader::new(".");
    let mut buffer = String::new();

    loop {
        print!("minik > ");
        std::io::stdout().flush()?;

        buffer.clear();
        if std::io::stdin().read_line(&mut buffer)? == 0 || buffer.trim() == "exit" {
            break;
        }

        run(&mut interpreter, &buffer, &mut loader);
    }

    Ok(true)
}

fn run(interpreter: &mut Interpreter, source: &str, loader: &mut FileLoader) -> bool {
    let errs = minik::run(interpreter, source, loader);
    for err in errs.iter() {
        err.report_to(&mut Console);
    }

    errs.is_empty()
}
