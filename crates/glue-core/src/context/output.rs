use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

#[derive(Clone)]
enum Sink {
    Stdout,
    Buffer(Arc<Mutex<Vec<u8>>>),
}

/// Destination for user-facing command output.
///
/// Defaults to standard output. An in-memory buffer can be swapped in so
/// tests can inspect what a command printed.
#[derive(Clone)]
pub struct Output {
    sink: Sink,
}

impl Output {
    pub fn stdout() -> Self {
        Self { sink: Sink::Stdout }
    }

    pub fn buffer() -> Self {
        Self {
            sink: Sink::Buffer(Arc::new(Mutex::new(Vec::new()))),
        }
    }

    pub fn write_str(&self, text: &str) -> io::Result<()> {
        match &self.sink {
            Sink::Stdout => {
                let mut stdout = io::stdout().lock();
                stdout.write_all(text.as_bytes())?;
                stdout.flush()
            }
            Sink::Buffer(buffer) => {
                buffer
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .extend_from_slice(text.as_bytes());
                Ok(())
            }
        }
    }

    pub fn write_line(&self, line: &str) -> io::Result<()> {
        self.write_str(&format!("{}\n", line))
    }

    /// Captured text; always empty for stdout.
    pub fn contents(&self) -> String {
        match &self.sink {
            Sink::Stdout => String::new(),
            Sink::Buffer(buffer) => {
                let bytes = buffer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                String::from_utf8_lossy(&bytes).into_owned()
            }
        }
    }

    pub fn is_stdout(&self) -> bool {
        matches!(self.sink, Sink::Stdout)
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::stdout()
    }
}

impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sink {
            Sink::Stdout => f.write_str("Output(stdout)"),
            Sink::Buffer(_) => f.write_str("Output(buffer)"),
        }
    }
}
