// Shell layer: turns input lines into commands and runs them against the
// navigator. A failing command prints its error and the loop carries on;
// only `exit`, `quit` or end of input end the session.

use crate::backend::{Backend, DirectoryListing, Transport};
use crate::error::{Result, ShellError};
use crate::format::{columnize, folder_name, long_row, represent_size, DISPLAY_WIDTH};
use crate::navigator::{Navigator, UploadOutcome, PARENT};
use crossterm::style::Stylize;
use dialoguer::theme::Theme;
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const PROMPT_ROOT: &str = "workdocs";

const HELP: &str = "\
Commands:
  cd <name> | ..       change folder
  ls [-r]              list folder contents (-r refetches)
  ll [-r]              long listing with size and modification time
  get <from> [to]      download a document
  put <from> [to]      upload a local file into the current folder
  help                 show this help
  exit                 leave the shell";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Cd(String),
    Ls { refresh: bool },
    Ll { refresh: bool },
    Get { from: String, to: Option<String> },
    Put { from: String, to: Option<String> },
    Help,
    Exit,
}

/// What the loop should do after a line ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Splits a line on whitespace; double quotes group words, so
/// `get "Q1 report.pdf"` names a single document.
pub fn tokenize(line: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quoted = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                quoted = !quoted;
                in_token = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            c => {
                current.push(c);
                in_token = true;
            }
        }
    }
    if quoted {
        return Err(ShellError::Usage("unterminated quote".into()));
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}

/// Parses one input line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>> {
    let tokens = tokenize(line)?;
    let Some((name, args)) = tokens.split_first() else {
        return Ok(None);
    };

    let refresh_flag = |cmd: &str| match args {
        [] => Ok(false),
        [flag] if flag == "-r" => Ok(true),
        _ => Err(usage(&format!("{cmd} [-r]"))),
    };

    let command = match (name.as_str(), args) {
        ("cd", [target]) => Command::Cd(target.clone()),
        ("cd", _) => return Err(usage("cd <name> | ..")),
        ("ls", _) => Command::Ls { refresh: refresh_flag("ls")? },
        ("ll", _) => Command::Ll { refresh: refresh_flag("ll")? },
        ("get", [from]) => Command::Get { from: from.clone(), to: None },
        ("get", [from, to]) => Command::Get { from: from.clone(), to: Some(to.clone()) },
        ("get", _) => return Err(usage("get <from> [to]")),
        ("put", [from]) => Command::Put { from: from.clone(), to: None },
        ("put", [from, to]) => Command::Put { from: from.clone(), to: Some(to.clone()) },
        ("put", _) => return Err(usage("put <from> [to]")),
        ("help" | "?", _) => Command::Help,
        ("exit" | "quit", _) => Command::Exit,
        (other, _) => return Err(ShellError::Usage(format!("unknown command: {other}"))),
    };
    Ok(Some(command))
}

fn usage(text: &str) -> ShellError {
    ShellError::Usage(format!("usage: {text}"))
}

/// Expands a leading `~` to the home directory.
pub fn local_path(arg: &str) -> PathBuf {
    match arg.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => match dirs::home_dir() {
            Some(home) => home.join(rest.trim_start_matches('/')),
            None => PathBuf::from(arg),
        },
        _ => PathBuf::from(arg),
    }
}

/// Remote name used by `put` when no target is given: the file-name part
/// of the local path.
fn default_remote_name(from: &str) -> String {
    Path::new(from)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(from)
        .to_string()
}

/// Interactive session: the navigator plus the folder names walked so far,
/// which only feed the prompt.
pub struct Shell<B, T> {
    navigator: Navigator<B, T>,
    path: Vec<String>,
    spinners: bool,
}

impl<B: Backend, T: Transport> Shell<B, T> {
    pub fn new(navigator: Navigator<B, T>) -> Self {
        Shell {
            navigator,
            path: Vec::new(),
            spinners: false,
        }
    }

    /// Show a spinner while folder contents are being fetched.
    pub fn with_spinners(mut self, enabled: bool) -> Self {
        self.spinners = enabled;
        self
    }

    pub fn navigator(&self) -> &Navigator<B, T> {
        &self.navigator
    }

    pub fn prompt(&self) -> String {
        if self.path.is_empty() {
            format!("{PROMPT_ROOT}> ")
        } else {
            format!("{PROMPT_ROOT}/{}> ", self.path.join("/"))
        }
    }

    /// Runs one input line, reporting any error to `out`.
    pub fn run_line(&mut self, line: &str, out: &mut dyn Write) -> io::Result<Flow> {
        let result = parse_command(line).and_then(|command| match command {
            Some(command) => self.execute(command, out),
            None => Ok(Flow::Continue),
        });
        match result {
            Ok(flow) => Ok(flow),
            Err(err) => {
                debug!(line, error = %err, "command failed");
                writeln!(out, "{}", format!("Error: {err}").red())?;
                Ok(Flow::Continue)
            }
        }
    }

    pub fn execute(&mut self, command: Command, out: &mut dyn Write) -> Result<Flow> {
        match command {
            Command::Cd(target) => self.change_folder(&target)?,
            Command::Ls { refresh } => {
                let listing = self.listing(refresh)?;
                print_short(listing, out)?;
            }
            Command::Ll { refresh } => {
                let listing = self.listing(refresh)?;
                print_long(listing, out)?;
            }
            Command::Get { from, to } => self.get(&from, to.as_deref(), out)?,
            Command::Put { from, to } => self.put(&from, to.as_deref(), out)?,
            Command::Help => writeln!(out, "{HELP}")?,
            Command::Exit => return Ok(Flow::Exit),
        }
        Ok(Flow::Continue)
    }

    fn listing(&mut self, refresh: bool) -> Result<&DirectoryListing> {
        if refresh {
            self.navigator.refresh();
        }
        let spinner = self.spinner_if_uncached();
        let listing = self.navigator.list();
        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }
        listing
    }

    fn spinner_if_uncached(&self) -> Option<ProgressBar> {
        if !self.spinners || self.navigator.state().cached_listing.is_some() {
            return None;
        }
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message("Listing...");
        spinner.enable_steady_tick(Duration::from_millis(100));
        Some(spinner)
    }

    fn change_folder(&mut self, target: &str) -> Result<()> {
        if target == PARENT {
            let was_at_root = self.navigator.state().is_at_root();
            self.navigator.navigate(PARENT)?;
            if !was_at_root {
                self.path.pop();
            }
            return Ok(());
        }
        // Entering a child right after `cd ..` needs the new folder listed.
        self.listing(false)?;
        self.navigator.navigate(target)?;
        self.path.push(target.to_string());
        Ok(())
    }

    fn get(&mut self, from: &str, to: Option<&str>, out: &mut dyn Write) -> Result<()> {
        self.listing(false)?;
        let document = self.navigator.resolve_document(from)?;
        let destination = local_path(to.unwrap_or(from));
        let written = self.navigator.download(document, &destination)?;
        writeln!(
            out,
            "{} -> {} ({})",
            from,
            destination.display(),
            represent_size(written)
        )?;
        Ok(())
    }

    fn put(&mut self, from: &str, to: Option<&str>, out: &mut dyn Write) -> Result<()> {
        let source = local_path(from);
        let name = to.map(str::to_string).unwrap_or_else(|| default_remote_name(from));
        match self.navigator.upload(&source, &name)? {
            UploadOutcome::Success { .. } => writeln!(out, "File successfully uploaded")?,
            UploadOutcome::Failure { status, .. } => {
                writeln!(out, "{}", format!("Error uploading file (status {status})").red())?
            }
        }
        Ok(())
    }
}

fn print_short(listing: &DirectoryListing, out: &mut dyn Write) -> io::Result<()> {
    let folders: Vec<String> = listing.folders.iter().map(|f| f.name.clone()).collect();
    for line in columnize(&folders, DISPLAY_WIDTH, folder_name) {
        writeln!(out, "{line}")?;
    }
    let documents: Vec<String> = listing.documents.iter().map(|d| d.name.clone()).collect();
    for line in columnize(&documents, DISPLAY_WIDTH, str::to_string) {
        writeln!(out, "{line}")?;
    }
    Ok(())
}

fn print_long(listing: &DirectoryListing, out: &mut dyn Write) -> io::Result<()> {
    for folder in &listing.folders {
        writeln!(out, "{}", folder_name(&folder.name))?;
    }
    for doc in &listing.documents {
        writeln!(out, "{}", long_row(doc))?;
    }
    Ok(())
}

/// Renders the prompt verbatim instead of dialoguer's `prompt: ` style.
struct PromptTheme;

impl Theme for PromptTheme {
    fn format_input_prompt(
        &self,
        f: &mut dyn fmt::Write,
        prompt: &str,
        _default: Option<&str>,
    ) -> fmt::Result {
        write!(f, "{prompt}")
    }

    fn format_input_prompt_selection(
        &self,
        f: &mut dyn fmt::Write,
        prompt: &str,
        sel: &str,
    ) -> fmt::Result {
        write!(f, "{prompt}{sel}")
    }
}

/// Reads commands until `exit` or end of input. A terminal gets the
/// interactive prompt; piped input is read line by line.
pub fn run<B: Backend, T: Transport>(mut shell: Shell<B, T>) -> anyhow::Result<()> {
    if !io::stdin().is_terminal() {
        let stdout = io::stdout();
        run_lines(&mut shell, io::stdin().lock(), &mut stdout.lock())?;
        return Ok(());
    }

    let stdout = io::stdout();
    loop {
        let line = match Input::<String>::with_theme(&PromptTheme)
            .with_prompt(shell.prompt())
            .allow_empty(true)
            .interact_text()
        {
            Ok(line) => line,
            Err(err) => {
                debug!(error = %err, "input closed");
                break;
            }
        };
        let mut out = stdout.lock();
        if shell.run_line(&line, &mut out)? == Flow::Exit {
            break;
        }
        out.flush()?;
    }
    Ok(())
}

/// Runs every line of `input` until `exit` or the reader runs dry.
pub fn run_lines<B, T, R>(shell: &mut Shell<B, T>, input: R, out: &mut dyn Write) -> io::Result<()>
where
    B: Backend,
    T: Transport,
    R: BufRead,
{
    for line in input.lines() {
        let line = line?;
        if shell.run_line(&line, out)? == Flow::Exit {
            break;
        }
        out.flush()?;
    }
    debug!("input exhausted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn tokenize_splits_and_groups_quotes() {
        assert_eq!(tokenize("  get  a.txt   b.txt ").unwrap(), words(&["get", "a.txt", "b.txt"]));
        assert_eq!(
            tokenize(r#"cd "Team Reports""#).unwrap(),
            words(&["cd", "Team Reports"])
        );
        assert_eq!(tokenize(r#"put x "" "#).unwrap(), words(&["put", "x", ""]));
        assert!(tokenize("").unwrap().is_empty());
        assert!(tokenize(r#"cd "open"#).is_err());
    }

    #[test]
    fn parses_every_command() {
        assert_eq!(parse_command("cd ..").unwrap(), Some(Command::Cd("..".into())));
        assert_eq!(parse_command("ls").unwrap(), Some(Command::Ls { refresh: false }));
        assert_eq!(parse_command("ll -r").unwrap(), Some(Command::Ll { refresh: true }));
        assert_eq!(
            parse_command("get a.txt").unwrap(),
            Some(Command::Get { from: "a.txt".into(), to: None })
        );
        assert_eq!(
            parse_command("put ./x.bin y.bin").unwrap(),
            Some(Command::Put { from: "./x.bin".into(), to: Some("y.bin".into()) })
        );
        assert_eq!(parse_command("help").unwrap(), Some(Command::Help));
        assert_eq!(parse_command("quit").unwrap(), Some(Command::Exit));
        assert_eq!(parse_command("   ").unwrap(), None);
    }

    #[test]
    fn rejects_bad_arity_and_unknown_commands() {
        assert!(parse_command("cd").is_err());
        assert!(parse_command("cd a b").is_err());
        assert!(parse_command("get").is_err());
        assert!(parse_command("put a b c").is_err());
        assert!(parse_command("ls -x").is_err());
        assert!(matches!(parse_command("rm a.txt"), Err(ShellError::Usage(_))));
    }

    #[test]
    fn remote_name_defaults_to_file_name() {
        assert_eq!(default_remote_name("some/dir/report.pdf"), "report.pdf");
        assert_eq!(default_remote_name("report.pdf"), "report.pdf");
    }

    #[test]
    fn tilde_expands_to_home() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(local_path("~/x.txt"), home.join("x.txt"));
            assert_eq!(local_path("~"), home);
        }
        assert_eq!(local_path("~user/x"), PathBuf::from("~user/x"));
        assert_eq!(local_path("plain.txt"), PathBuf::from("plain.txt"));
    }
}
