//! Interactive chat command.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::builder::PossibleValuesParser;
use clap::Args;
use dialoguer::console::style;
use keychat::chat::{ReplySource, TurnObserver, TurnReport};
use keychat::{telemetry, AppState, ChatParams, Config, Credential, Session};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{output, resolve_credential};

/// Models offered by the chat command
pub const KNOWN_MODELS: [&str; 4] = ["gpt-4o-mini", "gpt-4o", "gpt-4-turbo", "gpt-3.5-turbo"];

const HELP: &str = "\
Commands:
  /clear          start over with a fresh transcript
  /export [dir]   write the transcript as JSON (default: current directory)
  /test           re-validate the API key
  /stats          show session statistics and metrics
  /help           show this help
  /quit           leave the chat (also Ctrl+D)

Ctrl+C while a reply is streaming cancels that reply.";

/// Chat arguments.
#[derive(Args, Debug)]
pub struct ChatArgs {
    /// Model to chat with
    #[arg(long, value_parser = PossibleValuesParser::new(KNOWN_MODELS))]
    pub model: Option<String>,

    /// Maximum tokens in each reply
    #[arg(long, value_parser = clap::value_parser!(u32).range(16..=4096))]
    pub max_tokens: Option<u32>,

    /// Sampling temperature (0.0 to 1.0)
    #[arg(long, value_parser = parse_temperature)]
    pub temperature: Option<f32>,

    /// System prompt for the session
    #[arg(long)]
    pub system: Option<String>,

    /// Ask for the key even if OPENAI_API_KEY is set
    #[arg(long)]
    pub prompt_key: bool,
}

fn parse_temperature(value: &str) -> Result<f32, String> {
    let temperature: f32 = value
        .parse()
        .map_err(|_| format!("`{}` is not a number", value))?;
    if (0.0..=1.0).contains(&temperature) {
        Ok(temperature)
    } else {
        Err(format!("temperature must be between 0.0 and 1.0, got {}", temperature))
    }
}

/// A line typed at the chat prompt
#[derive(Debug, PartialEq)]
enum ReplCommand {
    Prompt(String),
    Clear,
    Export(Option<PathBuf>),
    Test,
    Stats,
    Help,
    Quit,
    Unknown(String),
    Empty,
}

impl ReplCommand {
    fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return ReplCommand::Empty;
        }
        if !line.starts_with('/') {
            return ReplCommand::Prompt(line.to_string());
        }

        let mut parts = line.splitn(2, char::is_whitespace);
        let command = parts.next().unwrap_or_default();
        let argument = parts.next().map(str::trim).filter(|a| !a.is_empty());

        match command {
            "/clear" => ReplCommand::Clear,
            "/export" => ReplCommand::Export(argument.map(PathBuf::from)),
            "/test" => ReplCommand::Test,
            "/stats" => ReplCommand::Stats,
            "/help" => ReplCommand::Help,
            "/quit" | "/exit" => ReplCommand::Quit,
            other => ReplCommand::Unknown(other.to_string()),
        }
    }
}

/// Writes streamed fragments as they arrive and the final reply when it did not stream
struct ReplyPrinter<W: Write> {
    out: W,
    printed: bool,
}

impl<W: Write> ReplyPrinter<W> {
    fn new(out: W) -> Self {
        Self { out, printed: false }
    }

    fn finish(&mut self, session: &Session, report: &TurnReport) -> io::Result<()> {
        match report.source {
            ReplySource::Streamed => writeln!(self.out)?,
            ReplySource::Cancelled if self.printed => {
                writeln!(self.out, " {}", style("[cancelled]").dim())?
            }
            _ => {
                let content = session.last().map(|m| m.content.as_str()).unwrap_or_default();
                writeln!(self.out, "{}", content)?
            }
        }
        self.out.flush()
    }
}

impl<W: Write> TurnObserver for ReplyPrinter<W> {
    fn on_fragment(&mut self, fragment: &str, _content: &str) {
        let _ = write!(self.out, "{}", fragment);
        let _ = self.out.flush();
        self.printed = true;
    }

    fn on_fallback(&mut self, reason: &str) {
        if self.printed {
            let _ = writeln!(self.out);
            self.printed = false;
        }
        let _ = output::print_notice_to(
            &mut io::stderr(),
            &format!("(streaming unavailable: {}; retrying without streaming)", reason),
        );
    }
}

/// Run the interactive chat.
pub async fn run(config: Config, args: ChatArgs) -> Result<()> {
    let credential = resolve_credential(&config, args.prompt_key)?;

    let params = ChatParams::new(
        args.model.unwrap_or_else(|| config.default_model.clone()),
        args.max_tokens.unwrap_or(config.default_max_tokens),
        args.temperature.unwrap_or(config.default_temperature),
    );
    let system_prompt = args.system.unwrap_or_else(|| config.system_prompt.clone());

    let state = AppState::new(config, Some(&credential))?;
    let mut session = Session::new(system_prompt);

    info!(
        session_id = %session.id(),
        model = %params.model,
        max_tokens = params.max_tokens,
        temperature = params.temperature,
        "Chat session started"
    );

    println!(
        "{} {} (max tokens {}, temperature {})",
        style("Chatting with").bold(),
        style(&params.model).cyan(),
        params.max_tokens,
        params.temperature
    );
    println!("{}", style("Type /help for commands.").dim());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("{} ", style(">").green().bold());
        io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read input")?,
            _ = signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            println!();
            break;
        };

        match ReplCommand::parse(&line) {
            ReplCommand::Empty => {}
            ReplCommand::Prompt(text) => run_turn(&state, &mut session, &params, &text).await?,
            ReplCommand::Clear => {
                session.reset();
                output::print_notice_to(&mut io::stdout(), "Transcript cleared.")?;
            }
            ReplCommand::Export(dir) => {
                let dir = dir.unwrap_or_else(|| PathBuf::from("."));
                match session.export_to_file(&dir) {
                    Ok(path) => output::print_notice_to(
                        &mut io::stdout(),
                        &format!("Transcript written to {}", path.display()),
                    )?,
                    Err(e) => output::print_error(&e.user_message()),
                }
            }
            ReplCommand::Test => validate_key(&state, &credential).await?,
            ReplCommand::Stats => print_stats(&state, &session),
            ReplCommand::Help => println!("{}", HELP),
            ReplCommand::Quit => break,
            ReplCommand::Unknown(command) => {
                output::print_error(&format!("Unknown command {} (try /help)", command))
            }
        }
    }

    info!(session_id = %session.id(), messages = session.len(), "Chat session ended");
    Ok(())
}

async fn run_turn(
    state: &AppState,
    session: &mut Session,
    params: &ChatParams,
    text: &str,
) -> Result<()> {
    let cancel = CancellationToken::new();
    let watcher = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if signal::ctrl_c().await.is_ok() {
                debug!("Ctrl+C received, cancelling reply");
                cancel.cancel();
            }
        }
    });

    let mut printer = ReplyPrinter::new(io::stdout());
    let result = state
        .engine
        .send(session, text, params, &mut printer, &cancel)
        .await;
    watcher.abort();

    match result {
        Ok(report) => printer.finish(session, &report)?,
        Err(e) => output::print_error(&e.user_message()),
    }
    Ok(())
}

async fn validate_key(state: &AppState, credential: &Credential) -> Result<()> {
    let result = state.validator.validate_credential(credential).await;
    output::print_validation_to(&mut io::stdout(), &result)?;
    Ok(())
}

fn print_stats(state: &AppState, session: &Session) {
    println!("Session {}", session.id());
    println!("  started:  {}", session.created_at().format("%Y-%m-%d %H:%M:%S UTC"));
    println!("  messages: {}", session.len());
    println!("  uptime:   {}s", state.start_time.elapsed().as_secs());

    if let Some(metrics) = telemetry::render() {
        let lines: Vec<&str> = metrics
            .lines()
            .filter(|line| line.starts_with("keychat_"))
            .collect();
        if !lines.is_empty() {
            println!();
            for line in lines {
                println!("  {}", line);
            }
        }
    }
}
