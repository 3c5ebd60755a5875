//! # I/O Adapter
//!
//! A line-oriented input source (file or interactive stdin) for `READ`, and
//! a typed output formatter for `WRITE`/`DPRINT`/`BREAK`. The program
//! source and the user input stream are independent: either or both can
//! come from a file, with stdin as the fallback.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};

use crate::diagnostics::RuntimeError;

/// Where `READ` draws its lines from.
pub struct InputSource {
    reader: Box<dyn BufRead>,
}

impl InputSource {
    /// Read lines from `path`.
    pub fn from_file(path: &str) -> Result<InputSource, RuntimeError> {
        let file = File::open(path).map_err(|e| RuntimeError::CantOpenFile(format!("{}: {}", path, e)))?;
        Ok(InputSource {
            reader: Box::new(BufReader::new(file)),
        })
    }

    /// Read lines interactively from standard input.
    pub fn from_stdin() -> InputSource {
        InputSource {
            reader: Box::new(BufReader::new(io::stdin())),
        }
    }

    /// An input source over an in-memory string, for tests.
    #[cfg(test)]
    pub fn from_str(s: &str) -> InputSource {
        InputSource {
            reader: Box::new(std::io::Cursor::new(s.as_bytes().to_vec())),
        }
    }

    /// Read one line, stripping the trailing newline. `None` at end of
    /// stream — `READ`'s caller treats that the same as an empty line:
    /// both yield `Nil`.
    pub fn read_line(&mut self) -> Option<String> {
        let mut buf = String::new();
        match self.reader.read_line(&mut buf) {
            Ok(0) => None,
            Ok(_) => {
                if buf.ends_with('\n') {
                    buf.pop();
                    if buf.ends_with('\r') {
                        buf.pop();
                    }
                }
                Some(buf)
            }
            Err(_) => None,
        }
    }
}

/// Where `WRITE`/`DPRINT`/`BREAK` send formatted output. Boxed writers so
/// tests can substitute an in-memory buffer for the real standard streams
/// (mirroring how [`InputSource`] boxes its reader).
pub struct OutputSink {
    stdout: Box<dyn Write>,
    stderr: Box<dyn Write>,
}

impl OutputSink {
    pub fn new() -> OutputSink {
        OutputSink {
            stdout: Box::new(io::stdout()),
            stderr: Box::new(io::stderr()),
        }
    }

    #[cfg(test)]
    pub fn buffered() -> (OutputSink, std::rc::Rc<std::cell::RefCell<Vec<u8>>>, std::rc::Rc<std::cell::RefCell<Vec<u8>>>) {
        use std::cell::RefCell;
        use std::rc::Rc;

        struct SharedBuf(Rc<RefCell<Vec<u8>>>);
        impl Write for SharedBuf {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                self.0.borrow_mut().extend_from_slice(buf);
                Ok(buf.len())
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let out = Rc::new(RefCell::new(Vec::new()));
        let err = Rc::new(RefCell::new(Vec::new()));
        let sink = OutputSink {
            stdout: Box::new(SharedBuf(out.clone())),
            stderr: Box::new(SharedBuf(err.clone())),
        };
        (sink, out, err)
    }

    /// `WRITE v`: emit `text` to standard output, no trailing newline.
    pub fn write_stdout(&mut self, text: &str) -> Result<(), RuntimeError> {
        self.stdout
            .write_all(text.as_bytes())
            .map_err(|e| RuntimeError::CantWriteFile(e.to_string()))
    }

    /// `DPRINT v` / `BREAK`: emit `text` to the error stream.
    pub fn write_stderr(&mut self, text: &str) -> Result<(), RuntimeError> {
        self.stderr
            .write_all(text.as_bytes())
            .map_err(|e| RuntimeError::CantWriteFile(e.to_string()))
    }
}

impl Default for OutputSink {
    fn default() -> Self {
        OutputSink::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn read_line_strips_newline() {
        let mut src = InputSource {
            reader: Box::new(Cursor::new(b"hello\nworld\n".to_vec())),
        };
        assert_eq!(src.read_line(), Some("hello".to_string()));
        assert_eq!(src.read_line(), Some("world".to_string()));
        assert_eq!(src.read_line(), None);
    }

    #[test]
    fn read_line_handles_missing_trailing_newline() {
        let mut src = InputSource {
            reader: Box::new(Cursor::new(b"last".to_vec())),
        };
        assert_eq!(src.read_line(), Some("last".to_string()));
        assert_eq!(src.read_line(), None);
    }
}
