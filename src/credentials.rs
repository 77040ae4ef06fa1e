use anyhow::{Context, Result};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::render;
use crate::terminal::{Prompter, UrlOpener};

pub const API_KEY_NAME: &str = "OPENAI_API_KEY";
pub const API_KEY_URL: &str = "https://platform.openai.com/account/api-keys";

#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn resolve(&self) -> Option<Credential> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => parse_credential(&contents),
            Err(err) => {
                debug!(path = %self.path.display(), error = %err, "credential file not readable");
                None
            }
        }
    }

    pub fn persist(&self, credential: &Credential) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create '{}'", dir.display()))?;
        }
        fs::write(
            &self.path,
            format!("{API_KEY_NAME}={}\n", credential.expose()),
        )
        .with_context(|| format!("Failed to write '{}'", self.path.display()))?;
        info!(path = %self.path.display(), "stored API key");
        Ok(())
    }

    pub fn prompt_and_persist(
        &self,
        prompter: &mut dyn Prompter,
        opener: &dyn UrlOpener,
        out: &mut dyn Write,
        was_incorrect: bool,
    ) -> Result<Option<Credential>> {
        let state = if was_incorrect { "incorrect" } else { "not set" };
        writeln!(
            out,
            "{}",
            render::markdown(&format!(
                "## You must add your OpenAI API Key (current key is {state})"
            ))
        )?;

        let open_page = prompter.ask("Open OpenAI API Key  (y/N)? ")?;
        if open_page.eq_ignore_ascii_case("y") {
            opener.open(API_KEY_URL);
        }

        let secret = prompter.ask("Enter your API Key: ")?;
        if secret.is_empty() {
            info!("no API key entered");
            return Ok(None);
        }

        let credential = Credential::new(secret);
        self.persist(&credential)?;
        writeln!(
            out,
            "{}",
            render::markdown(
                "## OpenAI API key added successfully, you may now use `hpt <prompt>` to speak to HAL-PT"
            )
        )?;
        Ok(Some(credential))
    }
}

// First `OPENAI_API_KEY=` occurrence with a non-empty remainder on its line.
fn parse_credential(contents: &str) -> Option<Credential> {
    let marker = format!("{API_KEY_NAME}=");
    contents.lines().find_map(|line| {
        let start = line.find(&marker)? + marker.len();
        let value = line[start..].trim_end_matches('\r');
        (!value.is_empty()).then(|| Credential::new(value))
    })
}
