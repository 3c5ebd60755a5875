//! # CLI Argument Parsing
//!
//! Hand-rolled `env::args()` walking, no external argument-parsing crate.
//! `--help` is mutually exclusive with `--source`/`--input`, every flag may
//! appear at most once, and at least one of `--source`/`--input` is
//! required.

use crate::diagnostics::RuntimeError;

pub struct Args {
    pub source: Option<String>,
    pub input: Option<String>,
    pub help: bool,
}

/// Parse `argv` (excluding the program name). Every violation is
/// *missing-parameter* (10).
pub fn parse(argv: &[String]) -> Result<Args, RuntimeError> {
    let mut source = None;
    let mut input = None;
    let mut help = false;

    let mut i = 0;
    while i < argv.len() {
        match argv[i].as_str() {
            "--help" => {
                if help {
                    return Err(RuntimeError::MissingParameter("--help given more than once".to_string()));
                }
                help = true;
                i += 1;
            }
            "--source" => {
                if source.is_some() {
                    return Err(RuntimeError::MissingParameter("--source given more than once".to_string()));
                }
                let value = argv
                    .get(i + 1)
                    .ok_or_else(|| RuntimeError::MissingParameter("--source requires a path".to_string()))?;
                source = Some(value.clone());
                i += 2;
            }
            "--input" => {
                if input.is_some() {
                    return Err(RuntimeError::MissingParameter("--input given more than once".to_string()));
                }
                let value = argv
                    .get(i + 1)
                    .ok_or_else(|| RuntimeError::MissingParameter("--input requires a path".to_string()))?;
                input = Some(value.clone());
                i += 2;
            }
            other => {
                return Err(RuntimeError::MissingParameter(format!("unrecognized argument '{}'", other)));
            }
        }
    }

    if help && (source.is_some() || input.is_some()) {
        return Err(RuntimeError::MissingParameter("--help is mutually exclusive with --source/--input".to_string()));
    }
    if !help && source.is_none() && input.is_none() {
        return Err(RuntimeError::MissingParameter("at least one of --source or --input is required".to_string()));
    }

    Ok(Args { source, input, help })
}

pub fn usage() -> &'static str {
    "usage: ippcode23 [--source <path>] [--input <path>] [--help]\n\
\n\
  --source <path>   program XML to interpret (default: standard input)\n\
  --input <path>    user input stream for READ (default: interactive stdin)\n\
  --help            print this message and exit\n"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn help_alone_is_accepted() {
        let args = parse(&["--help".to_string()]).unwrap();
        assert!(args.help);
    }

    #[test]
    fn help_with_source_is_missing_parameter() {
        let result = parse(&["--help".to_string(), "--source".to_string(), "a.xml".to_string()]);
        assert!(result.is_err());
    }

    #[test]
    fn neither_source_nor_input_is_missing_parameter() {
        assert!(parse(&[]).is_err());
    }

    #[test]
    fn repeated_flag_is_missing_parameter() {
        let argv = vec!["--source".to_string(), "a.xml".to_string(), "--source".to_string(), "b.xml".to_string()];
        assert!(parse(&argv).is_err());
    }

    #[test]
    fn source_and_input_together_is_accepted() {
        let argv = vec!["--source".to_string(), "a.xml".to_string(), "--input".to_string(), "b.txt".to_string()];
        let args = parse(&argv).unwrap();
        assert_eq!(args.source.as_deref(), Some("a.xml"));
        assert_eq!(args.input.as_deref(), Some("b.txt"));
    }
}
