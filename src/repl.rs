/// Interactive event loop.
///
/// One task owns the [`QueryController`] and reacts to two event sources:
/// lines of user input and completions of spawned backend requests. Requests
/// run on their own task, so toggling and editing keep working while a query
/// is in flight; the controller's `Submitting` phase blocks re-submission.
use std::io::{BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::debug;

use crate::api::{AnalysisBackend, ApiError, QueryResponse};
use crate::controller::{Completion, Phase, QueryController, SubmitError, Ticket};
use crate::notify::Notifier;
use crate::view::TerminalView;

const HELP: &str = "\
Commands:
  :repo <url>     set the repository URL
  :ask <text>     set the query without submitting
  :submit         submit the current repository and query
  :toggle <n>     expand or collapse context n
  :expand         expand every context
  :collapse       collapse every context
  :show           print the current result
  :reset          clear the result and the query (keeps the repository)
  :status         show input and request state
  :help           show this help
  :quit           exit
Any other line sets the query and submits it.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Repo(String),
    Ask(String),
    /// Plain text: set as query, then submit.
    AskAndSubmit(String),
    Submit,
    /// 1-based row number as shown on screen.
    Toggle(usize),
    ExpandAll,
    CollapseAll,
    Show,
    Reset,
    Status,
    Help,
    Quit,
    Empty,
    Invalid(String),
}

/// Parse one input line.
#[must_use]
pub fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }
    let Some(rest) = line.strip_prefix(':') else {
        return Command::AskAndSubmit(line.to_string());
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    match name {
        "repo" => Command::Repo(arg.to_string()),
        "ask" => Command::Ask(arg.to_string()),
        "submit" | "go" => Command::Submit,
        "toggle" | "t" => match arg.parse::<usize>() {
            Ok(n) if n > 0 => Command::Toggle(n),
            _ => Command::Invalid(format!("expected a context number, got {arg:?}")),
        },
        "expand" => Command::ExpandAll,
        "collapse" => Command::CollapseAll,
        "show" => Command::Show,
        "reset" => Command::Reset,
        "status" => Command::Status,
        "help" | "h" | "?" => Command::Help,
        "quit" | "q" | "exit" => Command::Quit,
        other => Command::Invalid(format!("unknown command :{other} (try :help)")),
    }
}

type Outcome = (Ticket, Result<QueryResponse, ApiError>);

pub struct Repl<B> {
    controller: QueryController,
    backend: Arc<B>,
    notifier: Arc<dyn Notifier>,
    view: TerminalView,
    done_tx: mpsc::UnboundedSender<Outcome>,
    done_rx: mpsc::UnboundedReceiver<Outcome>,
}

impl<B> Repl<B>
where
    B: AnalysisBackend + 'static,
{
    pub fn new(
        controller: QueryController,
        backend: Arc<B>,
        notifier: Arc<dyn Notifier>,
        view: TerminalView,
    ) -> Self {
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        Self {
            controller,
            backend,
            notifier,
            view,
            done_tx,
            done_rx,
        }
    }

    #[must_use]
    pub fn controller(&self) -> &QueryController {
        &self.controller
    }

    /// Run until `:quit` or until input ends and no request is in flight.
    pub async fn run<W: Write>(
        &mut self,
        mut input: mpsc::UnboundedReceiver<String>,
        out: &mut W,
    ) -> Result<()> {
        let mut input_open = true;

        loop {
            if !input_open && !self.is_submitting() {
                break;
            }

            tokio::select! {
                line = input.recv(), if input_open => match line {
                    Some(line) => {
                        if !self.handle_line(&line, out)? {
                            break;
                        }
                    }
                    None => {
                        debug!("input closed");
                        input_open = false;
                    }
                },
                Some((ticket, outcome)) = self.done_rx.recv() => {
                    self.handle_completion(ticket, outcome, out)?;
                }
            }
            out.flush().context("failed to flush output")?;
        }
        Ok(())
    }

    fn is_submitting(&self) -> bool {
        self.controller.phase() == Phase::Submitting
    }

    /// Handle one line. Returns `false` when the loop should stop.
    pub fn handle_line<W: Write>(&mut self, line: &str, out: &mut W) -> Result<bool> {
        match parse_command(line) {
            Command::Empty => {}
            Command::Quit => return Ok(false),
            Command::Help => writeln!(out, "{HELP}")?,
            Command::Status => writeln!(out, "{}", self.view.status(&self.controller))?,
            Command::Invalid(msg) => writeln!(out, "{msg}")?,
            Command::Repo(url) => {
                self.controller.set_repo_url(url);
                writeln!(out, "repository: {}", self.controller.repo_url())?;
            }
            Command::Ask(text) => self.controller.set_query(text),
            Command::AskAndSubmit(text) => {
                self.controller.set_query(text);
                self.start_submit(out)?;
            }
            Command::Submit => self.start_submit(out)?,
            Command::Toggle(n) => match self.controller.toggle(n - 1) {
                Ok(Some(_)) => self.show(out)?,
                Ok(None) => writeln!(out, "nothing to toggle yet")?,
                Err(e) => writeln!(out, "{e}")?,
            },
            Command::ExpandAll => self.set_all(true, out)?,
            Command::CollapseAll => self.set_all(false, out)?,
            Command::Show => self.show(out)?,
            Command::Reset => {
                self.controller.reset();
                writeln!(out, "cleared; repository kept: {}", self.controller.repo_url())?;
            }
        }
        Ok(true)
    }

    fn start_submit<W: Write>(&mut self, out: &mut W) -> Result<()> {
        let (ticket, request) = match self.controller.begin_submit() {
            Ok(started) => started,
            Err(SubmitError::AlreadySubmitting) => {
                writeln!(out, "still analyzing, please wait")?;
                return Ok(());
            }
            // Blank input: the affordance is simply disabled.
            Err(e) => {
                debug!("submit refused: {e}");
                writeln!(out, "submit disabled: {e}")?;
                return Ok(());
            }
        };

        writeln!(out, "Analyzing...")?;
        let backend = Arc::clone(&self.backend);
        let done_tx = self.done_tx.clone();
        tokio::spawn(async move {
            let outcome = backend.query(&request).await;
            let _ = done_tx.send((ticket, outcome));
        });
        Ok(())
    }

    fn handle_completion<W: Write>(
        &mut self,
        ticket: Ticket,
        outcome: Result<QueryResponse, ApiError>,
        out: &mut W,
    ) -> Result<()> {
        match self
            .controller
            .complete_submit(ticket, outcome, self.notifier.as_ref())
        {
            Completion::Resolved { .. } => self.show(out)?,
            Completion::Failed { .. } | Completion::Stale => {}
        }
        Ok(())
    }

    fn set_all<W: Write>(&mut self, expanded: bool, out: &mut W) -> Result<()> {
        let Some(tree) = self.controller.result_mut() else {
            writeln!(out, "nothing to toggle yet")?;
            return Ok(());
        };
        if expanded {
            tree.expand_all();
        } else {
            tree.collapse_all();
        }
        self.show(out)
    }

    fn show<W: Write>(&self, out: &mut W) -> Result<()> {
        match self.controller.result() {
            Some(tree) => write!(out, "{}", self.view.render(tree))?,
            None => writeln!(out, "no result yet")?,
        }
        Ok(())
    }
}

/// Forward stdin lines into a channel until EOF.
///
/// Runs on a detached OS thread; the process may exit while a read is still
/// pending.
pub fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    let spawned = std::thread::Builder::new()
        .name("stdin-reader".into())
        .spawn(move || forward_lines(std::io::stdin().lock(), &tx));
    if let Err(e) = spawned {
        tracing::warn!("failed to start stdin reader: {e}");
    }
    rx
}

fn forward_lines<R: BufRead>(reader: R, tx: &mpsc::UnboundedSender<String>) {
    for line in reader.lines() {
        match line {
            Ok(line) => {
                if tx.send(line).is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::warn!("failed to read stdin: {e}");
                break;
            }
        }
    }
}
