use anyhow::{Context, Result};
use std::io::{self, Write};
use std::process::{Command, Stdio};
use tracing::{debug, warn};

pub trait Prompter {
    fn ask(&mut self, question: &str) -> Result<String>;
}

#[derive(Debug, Default)]
pub struct StdioPrompter;

impl Prompter for StdioPrompter {
    fn ask(&mut self, question: &str) -> Result<String> {
        print!("{question}");
        io::stdout().flush().context("Failed to flush stdout")?;

        let mut input = String::new();
        io::stdin()
            .read_line(&mut input)
            .context("Failed to read stdin")?;
        Ok(input.trim().to_string())
    }
}

pub trait UrlOpener {
    fn open(&self, url: &str);
}

#[derive(Debug, Default)]
pub struct SystemUrlOpener;

impl UrlOpener for SystemUrlOpener {
    fn open(&self, url: &str) {
        let mut command = open_command(std::env::consts::OS, url);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        // The child is not awaited.
        match command.spawn() {
            Ok(child) => debug!(pid = child.id(), %url, "spawned url opener"),
            Err(err) => warn!(%url, error = %err, "failed to open url"),
        }
    }
}

fn open_command(os: &str, url: &str) -> Command {
    match os {
        "macos" => {
            let mut command = Command::new("open");
            command.arg(url);
            command
        }
        "windows" => {
            let mut command = Command::new("cmd");
            command.args(["/C", "start", "", url]);
            command
        }
        _ => {
            let mut command = Command::new("xdg-open");
            command.arg(url);
            command
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use anyhow::{Result, anyhow};
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    use super::{Prompter, UrlOpener};

    #[derive(Debug, Clone, Default)]
    pub(crate) struct ScriptedPrompter {
        answers: Rc<RefCell<VecDeque<String>>>,
        questions: Rc<RefCell<Vec<String>>>,
    }

    impl ScriptedPrompter {
        pub(crate) fn new(answers: &[&str]) -> Self {
            Self {
                answers: Rc::new(RefCell::new(
                    answers.iter().map(|answer| answer.to_string()).collect(),
                )),
                questions: Rc::default(),
            }
        }

        pub(crate) fn questions(&self) -> Vec<String> {
            self.questions.borrow().clone()
        }
    }

    impl Prompter for ScriptedPrompter {
        fn ask(&mut self, question: &str) -> Result<String> {
            self.questions.borrow_mut().push(question.to_string());
            self.answers
                .borrow_mut()
                .pop_front()
                .ok_or_else(|| anyhow!("unexpected question: {question}"))
        }
    }

    #[derive(Debug, Clone, Default)]
    pub(crate) struct RecordingOpener {
        opened: Rc<RefCell<Vec<String>>>,
    }

    impl RecordingOpener {
        pub(crate) fn opened(&self) -> Vec<String> {
            self.opened.borrow().clone()
        }
    }

    impl UrlOpener for RecordingOpener {
        fn open(&self, url: &str) {
            self.opened.borrow_mut().push(url.to_string());
        }
    }
}
