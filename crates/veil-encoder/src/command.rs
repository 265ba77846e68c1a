//! Encoder backed by an external program.
//!
//! The program receives the script on stdin and must print the encoded
//! program on stdout, exiting with status 0. A thin Node.js wrapper around
//! the character-subset encoder is the intended target:
//!
//! ```text
//! #!/usr/bin/env node
//! const JScrewIt = require('jscrewit');
//! let src = '';
//! process.stdin.on('data', (c) => (src += c));
//! process.stdin.on('end', () => process.stdout.write(JScrewIt.encode(src)));
//! ```

use std::io::Write;
use std::process::{Command, Stdio};
use std::thread;

use crate::encoder::{EncodeError, Encoder};

/// Runs an external encoder program once per script.
#[derive(Debug, Clone)]
pub struct CommandEncoder {
    program: String,
    args: Vec<String>,
}

impl CommandEncoder {
    /// Create an encoder invoking `program` with `args`.
    #[must_use]
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl Encoder for CommandEncoder {
    fn name(&self) -> &str {
        &self.program
    }

    fn encode(&self, script: &str) -> Result<String, EncodeError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| EncodeError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        // Feed stdin from a separate thread so a child that streams its output
        // before consuming all input cannot deadlock on a full pipe.
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| EncodeError::InvalidOutput("stdin not captured".to_owned()))?;
        let input = script.to_owned();
        let writer = thread::spawn(move || stdin.write_all(input.as_bytes()));

        let output = child.wait_with_output()?;
        let write_result = writer
            .join()
            .map_err(|_| EncodeError::InvalidOutput("stdin writer panicked".to_owned()))?;

        if !output.status.success() {
            return Err(EncodeError::Failed {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }
        write_result?;

        let encoded = String::from_utf8(output.stdout)
            .map_err(|e| EncodeError::InvalidOutput(format!("not UTF-8: {e}")))?;
        let encoded = encoded.trim_end_matches(['\r', '\n']);
        if encoded.is_empty() && !script.is_empty() {
            return Err(EncodeError::InvalidOutput("empty output".to_owned()));
        }

        tracing::debug!(
            program = %self.program,
            input_len = script.len(),
            output_len = encoded.len(),
            "Encoded script"
        );
        Ok(encoded.to_owned())
    }
}
