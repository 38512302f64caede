/// Options accepted by the `minik` binary: `minik [--debug|-d] [file]`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CommandLineOptions {
    pub file: Option<String>,
    pub debug: bool,
}

impl CommandLineOptions {
    pub fn parse() -> Self {
        Self::from_args(std::env::args().skip(1))
    }

    pub fn from_args<I: IntoIterator<Item = String>>(args: I) -> Self {
        let mut options = CommandLineOptions::default();

        for arg in args {
            match arg.as_str() {
                "-d" | "--debug" => options.debug = true,
                _ if options.file.is_none() => options.file = Some(arg),
                _ => tracing::warn!(argument = arg.as_str(), "ignoring unrecognized command line argument"),
            }
        }

        options
    }

    /// The log filter used when `RUST_LOG` is not set.
    pub fn default_log_filter(&self) -> &'static str {
        if self.debug { "debug" } else { "warn" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(args: &[&str]) -> CommandLineOptions {
        CommandLineOptions::from_args(args.iter().map(|a| a.to_string()))
    }

    #[test]
    fn prompt_without_arguments() {
        let opts = options(&[]);
        assert_eq!(opts, CommandLineOptions::default());
        assert_eq!(opts.default_log_filter(), "warn");
    }

    #[test]
    fn debug_flag_and_file() {
        let opts = options(&["-d", "script.mn"]);
        assert!(opts.debug);
        assert_eq!(opts.file.as_deref(), Some("script.mn"));
        assert_eq!(opts.default_log_filter(), "debug");

        assert_eq!(options(&["script.mn", "--debug"]), opts);
    }

    #[test]
    fn extra_files_are_ignored() {
        let opts = options(&["first.mn", "second.mn"]);
        assert_eq!(opts.file.as_deref(), Some("first.mn"));
    }
}
