//! Console I/O
//!
//! The turn loop only needs to read one line per prompt and print text.
//! `StdConsole` is the interactive terminal; `ScriptedConsole` replays
//! fixed input and records everything printed.

use std::collections::VecDeque;
use std::io::{self, Write};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

#[async_trait]
pub trait Console: Send {
    /// Show `prompt` and read one line. `Ok(None)` means end of input.
    async fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>>;

    /// Print one block of text
    fn say(&mut self, text: &str);
}

/// Terminal console over stdin/stdout
pub struct StdConsole {
    lines: Lines<BufReader<Stdin>>,
}

impl Default for StdConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl StdConsole {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

#[async_trait]
impl Console for StdConsole {
    async fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        {
            let mut stdout = io::stdout().lock();
            stdout.write_all(prompt.as_bytes())?;
            stdout.flush()?;
        }

        self.lines.next_line().await
    }

    fn say(&mut self, text: &str) {
        println!("{text}");
    }
}

/// Console fed from a fixed list of lines
#[derive(Debug, Default)]
pub struct ScriptedConsole {
    input: VecDeque<String>,
    prompts: Vec<String>,
    output: Vec<String>,
}

impl ScriptedConsole {
    pub fn new<I, S>(input: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            input: input.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Every prompt shown, in order
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    /// Every block printed, in order
    pub fn output(&self) -> &[String] {
        &self.output
    }

    /// Printed text joined by newlines
    pub fn transcript(&self) -> String {
        self.output.join("\n")
    }

    /// Lines not consumed yet
    pub fn remaining(&self) -> usize {
        self.input.len()
    }
}

#[async_trait]
impl Console for ScriptedConsole {
    async fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        self.prompts.push(prompt.to_string());
        Ok(self.input.pop_front())
    }

    fn say(&mut self, text: &str) {
        self.output.push(text.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_console() {
        let mut console = ScriptedConsole::new(["first", "second"]);

        assert_eq!(console.read_line("> ").await.unwrap().as_deref(), Some("first"));
        console.say("hello");
        assert_eq!(console.read_line("? ").await.unwrap().as_deref(), Some("second"));
        assert_eq!(console.read_line("> ").await.unwrap(), None);

        assert_eq!(console.prompts(), ["> ", "? ", "> "]);
        assert_eq!(console.output(), ["hello"]);
        assert_eq!(console.remaining(), 0);
    }
}
