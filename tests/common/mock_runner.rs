//! Scripted command runner for testing
//!
//! Stands in for git, gh and conan; each test binary uses a different subset.

#![allow(dead_code)]

use async_trait::async_trait;
use cci_tasks::error::{Error, Result};
use cci_tasks::runner::{CommandOutput, CommandRunner, render_command};
use std::collections::VecDeque;
use std::sync::Mutex;

/// A scripted reply
#[derive(Debug, Clone)]
enum Reply {
    Output(CommandOutput),
    NotFound,
}

/// Mock runner matching rendered command lines by prefix
///
/// Features:
/// - Longest registered prefix wins
/// - Replies queue up per prefix; the last one repeats
/// - Unscripted commands succeed with empty output
/// - Call log for verification
/// - Missing-program injection
pub struct MockRunner {
    script: Mutex<Vec<(String, VecDeque<Reply>)>>,
    calls: Mutex<Vec<String>>,
}

impl Default for MockRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRunner {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn push(&self, prefix: &str, reply: Reply) {
        let mut script = self.script.lock().unwrap();
        if let Some((_, replies)) = script.iter_mut().find(|(p, _)| p == prefix) {
            replies.push_back(reply);
        } else {
            script.push((prefix.to_string(), VecDeque::from([reply])));
        }
    }

    /// Reply to commands starting with `prefix` with successful `stdout`
    pub fn on(&self, prefix: &str, stdout: &str) -> &Self {
        self.push(prefix, Reply::Output(CommandOutput::ok(stdout)));
        self
    }

    /// Reply to commands starting with `prefix` with a failure
    pub fn fail(&self, prefix: &str, code: i32, stderr: &str) -> &Self {
        self.push(prefix, Reply::Output(CommandOutput::failed(code, stderr)));
        self
    }

    /// Pretend the program behind `prefix` is not installed
    pub fn not_found(&self, prefix: &str) -> &Self {
        self.push(prefix, Reply::NotFound);
        self
    }

    /// Every command run so far, rendered
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Commands starting with `prefix`
    pub fn calls_matching(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with(prefix))
            .collect()
    }

    /// Whether a command starting with `prefix` ran
    pub fn was_called(&self, prefix: &str) -> bool {
        !self.calls_matching(prefix).is_empty()
    }

    /// Index of the first command starting with `prefix`
    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.calls().iter().position(|c| c.starts_with(prefix))
    }

    fn reply_for(&self, command: &str) -> Reply {
        let mut script = self.script.lock().unwrap();
        let best = script
            .iter_mut()
            .filter(|(prefix, _)| command.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len());
        match best {
            Some((_, replies)) if replies.len() > 1 => replies.pop_front().unwrap(),
            Some((_, replies)) => replies[0].clone(),
            None => Reply::Output(CommandOutput::ok("")),
        }
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    async fn output(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        let command = render_command(program, args);
        self.calls.lock().unwrap().push(command.clone());
        match self.reply_for(&command) {
            Reply::Output(output) => Ok(output),
            Reply::NotFound => Err(Error::ProgramNotFound(program.to_string())),
        }
    }
}
