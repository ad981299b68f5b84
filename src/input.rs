//! Interactive line input (login codes, 2FA passwords, setup answers).

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

use tokio::runtime::{Handle, RuntimeFlavor};

use crate::error::{Error, Result};

/// Source of interactive answers.
pub trait Prompt: Send {
    /// Print `label` and read one trimmed line.
    fn read_line(&mut self, label: &str) -> Result<String>;
}

/// Reads answers from the terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinPrompt;

impl Prompt for StdinPrompt {
    fn read_line(&mut self, label: &str) -> Result<String> {
        print!("{}", label);
        io::stdout().flush()?;

        let mut line = String::new();
        let read = blocking(|| io::stdin().lock().read_line(&mut line))?;
        if read == 0 {
            return Err(Error::InvalidArgument("stdin closed".to_string()));
        }
        Ok(line.trim().to_string())
    }
}

/// Run a blocking read without stalling other tasks on a multi-threaded runtime.
fn blocking<T>(f: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

/// Replays a fixed list of answers; used by tests and non-interactive runs.
#[derive(Debug, Default, Clone)]
pub struct ScriptedPrompt {
    answers: VecDeque<String>,
    pub asked: Vec<String>,
}

impl ScriptedPrompt {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            asked: Vec::new(),
        }
    }
}

impl Prompt for ScriptedPrompt {
    fn read_line(&mut self, label: &str) -> Result<String> {
        self.asked.push(label.to_string());
        self.answers
            .pop_front()
            .map(|s| s.trim().to_string())
            .ok_or_else(|| Error::InvalidArgument(format!("no scripted answer for '{}'", label)))
    }
}
