use anyhow::{Context, Result};
use chrono::Utc;
use indicatif::ProgressDrawTarget;
use std::fs;
use std::io::{self, Write};
use std::process::ExitCode;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::credentials::{Credential, CredentialStore};
use crate::gateway::HttpChatGateway;
use crate::history::{InteractionLog, failure_summary};
use crate::lint::{EslintCommand, Linter, format_stylish};
use crate::query::{QueryExecutor, QueryOutcome};
use crate::render;
use crate::terminal::{Prompter, StdioPrompter, SystemUrlOpener, UrlOpener};

const BANNER: &str = r#"
 D E B U G  +  +  +  +  R E V I E W  +  +  +  +  L E A R N  +  +  +  +
\ \ \ \ \ \ \ \ \ \ \ \ \ \ \ \ \ \ \ \ \ \ \ \ \ \ \ \ \ \ \ \ \ \ \ \
 \  \  \  \  \  \  \  \  \  \  \  \  \  \  \  \  \  \  \  \  \  \  \
  _    _          _          _____ _______
 | |  | |   /\   | |        |  __ \__   __|
 | |__| |  /  \  | |  ______| |__) | | |
 |  __  | / /\ \ | | |______|  ___/  | |
 | |  | |/ ____ \| |____    | |      | |
 |_|  |_/_/    \_\______|   |_|      |_|

 \  \  \  \  \  \  \  \  \  \  \  \  \  \  \  \  \  \  \  \  \  \  \
\ \ \ \ \ \ \ \ \ \ \ \ \ \ \ \ \ \ \ \ \ \ \ \ \ \ \ \ \ \ \ \ \ \ \ \
A  G P T - 3  P O W E R E D  C L I  D E V E L O P E R  A S S I S T A N T"#;

const HELP: &str = "## HAL-PT HELP: You can use the following commands
- `hpt auth` to add your OpenAI API Key
- `hpt <prompt>` to ask your question related to programming or pasting error codes
- `hpt debug` to run ESLint on NodeJS applications (WIP)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Banner,
    Help,
    Debug,
    Auth,
    Inspect,
    Query(String),
}

impl Command {
    pub fn parse(prompt: &str) -> Self {
        match prompt {
            "" => Self::Banner,
            "help" => Self::Help,
            "debug" => Self::Debug,
            "auth" => Self::Auth,
            "inspect" => Self::Inspect,
            other => Self::Query(other.to_string()),
        }
    }

    pub fn from_args(args: impl IntoIterator<Item = String>) -> Self {
        let args: Vec<String> = args.into_iter().collect();
        Self::parse(&args.join(" "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    pub fn exit_code(self) -> ExitCode {
        match self {
            Self::Success => ExitCode::SUCCESS,
            Self::Failure => ExitCode::FAILURE,
        }
    }
}

pub struct App {
    cfg: Config,
    credentials: CredentialStore,
    log: InteractionLog,
    executor: QueryExecutor,
    linter: Box<dyn Linter>,
    prompter: Box<dyn Prompter>,
    opener: Box<dyn UrlOpener>,
    out: Box<dyn Write>,
}

impl App {
    pub fn from_config(cfg: Config) -> Result<Self> {
        let gateway = HttpChatGateway::new(&cfg)?;
        // Stays hidden when stdout is not a terminal.
        let executor =
            QueryExecutor::new(Box::new(gateway), &cfg).with_progress(ProgressDrawTarget::stdout);
        Ok(Self::new(cfg, executor))
    }

    pub fn new(cfg: Config, executor: QueryExecutor) -> Self {
        Self {
            credentials: CredentialStore::new(cfg.credentials_path()),
            log: InteractionLog::from_config(&cfg),
            linter: Box::new(EslintCommand::new(cfg.lint_command.clone())),
            executor,
            prompter: Box::new(StdioPrompter),
            opener: Box::new(SystemUrlOpener),
            out: Box::new(io::stdout()),
            cfg,
        }
    }

    pub fn with_linter(mut self, linter: impl Linter + 'static) -> Self {
        self.linter = Box::new(linter);
        self
    }

    pub fn with_prompter(mut self, prompter: impl Prompter + 'static) -> Self {
        self.prompter = Box::new(prompter);
        self
    }

    pub fn with_opener(mut self, opener: impl UrlOpener + 'static) -> Self {
        self.opener = Box::new(opener);
        self
    }

    pub fn with_output(mut self, out: impl Write + 'static) -> Self {
        self.out = Box::new(out);
        self
    }

    pub async fn dispatch(&mut self, command: Command) -> Result<Outcome> {
        debug!(?command, "dispatching");
        match command {
            Command::Banner => self.show_banner(),
            Command::Help => {
                writeln!(self.out, "{}", render::markdown(HELP))?;
                Ok(Outcome::Success)
            }
            Command::Debug => self.lint().await,
            Command::Auth => {
                self.enter_credential(false)?;
                Ok(Outcome::Success)
            }
            Command::Inspect => {
                debug!(
                    home_dir = %self.cfg.home_dir.display(),
                    model = %self.cfg.model,
                    "inspect requested"
                );
                Ok(Outcome::Success)
            }
            Command::Query(prompt) => self.ask(&prompt).await,
        }
    }

    fn show_banner(&mut self) -> Result<Outcome> {
        writeln!(self.out, "{BANNER}")?;

        if self.credentials.resolve().is_none() {
            writeln!(
                self.out,
                "{}",
                render::markdown("## No OpenAI Key detected! Type `hpt auth` to add your OpenAI API Key")
            )?;
            return Ok(Outcome::Success);
        }

        writeln!(
            self.out,
            "{}",
            render::markdown(
                "## Type `hpt <prompt>` to ask a question or `hpt help` for more information"
            )
        )?;

        let manifest_path = &self.cfg.manifest_path;
        if manifest_path.is_file() {
            match fs::read_to_string(manifest_path) {
                Ok(contents) => {
                    writeln!(
                        self.out,
                        "{}",
                        render::markdown(
                            "## NodeJS Application detected, HAL-PT has read your package.json"
                        )
                    )?;
                    remember_package(&contents);
                }
                Err(err) => {
                    debug!(path = %manifest_path.display(), error = %err, "manifest not readable");
                }
            }
        }

        Ok(Outcome::Success)
    }

    async fn lint(&mut self) -> Result<Outcome> {
        let results = self
            .linter
            .lint_files(&self.cfg.lint_patterns)
            .await
            .context("Lint run failed")?;
        writeln!(self.out, "{}", format_stylish(&results))?;
        writeln!(
            self.out,
            "{}",
            render::markdown("# Need help? Type the error into HAL!")
        )?;
        Ok(Outcome::Success)
    }

    fn enter_credential(&mut self, was_incorrect: bool) -> Result<Option<Credential>> {
        self.credentials.prompt_and_persist(
            self.prompter.as_mut(),
            self.opener.as_ref(),
            self.out.as_mut(),
            was_incorrect,
        )
    }

    async fn ask(&mut self, prompt: &str) -> Result<Outcome> {
        let credential = match self.credentials.resolve() {
            Some(credential) => credential,
            None => match self.enter_credential(false)? {
                Some(credential) => credential,
                None => return Ok(Outcome::Success),
            },
        };

        match self.executor.send(&credential, prompt).await? {
            QueryOutcome::Answered(reply) => {
                writeln!(self.out, "{}", render::markdown("`==== HAL-PT ANSWERS ====`"))?;
                writeln!(self.out, "{}", render::markdown(&reply.display_text()))?;
                if let Err(err) = self.log.record_success(prompt, &reply.raw) {
                    warn!(error = %format!("{err:#}"), "failed to record interaction");
                }
                Ok(Outcome::Success)
            }
            QueryOutcome::Unauthorized(_) => {
                info!("re-entering API key after rejection");
                self.enter_credential(true)?;
                Ok(Outcome::Failure)
            }
            QueryOutcome::Failed(failure) => {
                if let Err(err) = self.log.record_failure(
                    failure.status,
                    &failure.status_text,
                    &failure.body,
                    Utc::now(),
                ) {
                    warn!(error = %format!("{err:#}"), "failed to record failed request");
                }
                writeln!(
                    self.out,
                    "Encountered '{}' error",
                    failure_summary(&failure.status_text, &failure.body)
                )?;
                writeln!(
                    self.out,
                    "View full error log details at {}",
                    self.log.error_path().display()
                )?;
                Ok(Outcome::Failure)
            }
        }
    }
}

// Manifest contents are read but not kept.
fn remember_package(_contents: &str) {}
