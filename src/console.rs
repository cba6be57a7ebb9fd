//! Line-oriented operator console.
//!
//! Control inputs: `help`, `exit` / `quit`, `keywords <text>`. Any other
//! line is routed as a query. Per-query failures are printed and the loop
//! keeps going.

use crate::error::AppError;
use crate::ingestion::ParameterSpec;
use crate::routing::keyword::DEFAULT_VISIBLE;
use crate::server::display_value;
use crate::session::Session;
use async_trait::async_trait;
use std::io::{self, BufRead, Write};

/// Prompt text out, one line in.
#[async_trait]
pub trait Prompter: Send {
    /// Show `prompt` and read one line without its terminator. `None` once
    /// input is exhausted.
    async fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>>;

    /// Print one line of output.
    fn print(&mut self, line: &str) -> io::Result<()>;
}

/// Console over the process's stdin/stdout.
#[derive(Debug, Default)]
pub struct StdConsole;

#[async_trait]
impl Prompter for StdConsole {
    async fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        {
            let mut stdout = io::stdout().lock();
            stdout.write_all(prompt.as_bytes())?;
            stdout.flush()?;
        }

        // Blocking read off the runtime threads
        let (read, line) = tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            let read = io::stdin().lock().read_line(&mut line)?;
            Ok::<_, io::Error>((read, line))
        })
        .await
        .map_err(io::Error::other)??;

        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(&['\r', '\n'][..]).to_string()))
    }

    fn print(&mut self, line: &str) -> io::Result<()> {
        writeln!(io::stdout().lock(), "{}", line)
    }
}

/// Run the REPL until `exit`/`quit` or end of input.
///
/// Only console I/O errors end the loop early.
pub async fn run_repl(session: &Session, console: &mut dyn Prompter) -> io::Result<()> {
    console.print("Type 'help' to list tools, 'exit' to quit.")?;

    loop {
        let Some(line) = console.read_line("\nQuery> ").await? else {
            break;
        };
        let input = line.trim();
        let (command, rest) = input.split_once(char::is_whitespace).unwrap_or((input, ""));
        let bare = rest.trim().is_empty();

        match command.to_lowercase().as_str() {
            "" => continue,
            "exit" | "quit" if bare => break,
            "help" if bare => print_help(session, console)?,
            "keywords" => print_keywords(session, console, rest.trim())?,
            _ => run_query(session, console, input).await?,
        }
    }

    tracing::info!("Console closed");
    Ok(())
}

fn print_help(session: &Session, console: &mut dyn Prompter) -> io::Result<()> {
    console.print("Available tools:")?;
    for tool in session.registry().list() {
        console.print(&format!("  - {}: {}", tool.name, tool.description))?;
    }
    Ok(())
}

fn print_keywords(session: &Session, console: &mut dyn Prompter, message: &str) -> io::Result<()> {
    let visible = session.keywords().choose(message, DEFAULT_VISIBLE);
    if visible.is_empty() {
        console.print("Visible tools: (none)")
    } else {
        console.print(&format!("Visible tools: {}", visible.join(", ")))
    }
}

fn report(console: &mut dyn Prompter, err: &AppError) -> io::Result<()> {
    tracing::warn!(error = %err, "Query failed");
    console.print(&format!("Error: {}", err))
}

fn prompt_for(param: &ParameterSpec) -> String {
    if param.required {
        format!("  {} ({}) = ", param.name, param.kind)
    } else {
        format!("  {} ({}, optional) = ", param.name, param.kind)
    }
}

/// Route, resolve, complete, invoke and display one query.
async fn run_query(session: &Session, console: &mut dyn Prompter, query: &str) -> io::Result<()> {
    let prepared = match session.prepare(query).await {
        Ok(prepared) => prepared,
        Err(e) => return report(console, &e),
    };

    console.print(&format!("Top {} tools:", prepared.route.candidates.len()))?;
    for (rank, candidate) in prepared.route.candidates.iter().enumerate() {
        console.print(&format!(
            "  {}. {:<18} distance={:.4}",
            rank + 1,
            candidate.name,
            candidate.distance
        ))?;
    }

    let tool = prepared.route.tool;
    let mut args = prepared.args;

    if !args.is_complete() {
        console.print(&format!("Manual input for {}", tool.signature()))?;
    }
    while let Some(param) = args.next_missing().cloned() {
        let Some(raw) = console.read_line(&prompt_for(&param)).await? else {
            return console.print("Input closed, query abandoned");
        };
        if let Err(e) = args.supply(&param.name, &raw) {
            return report(console, &e);
        }
    }

    if args.is_manual() && !args.values().is_empty() {
        let rendered: Vec<String> = args
            .values()
            .iter()
            .map(|(name, value)| format!("{}={}", name, display_value(value)))
            .collect();
        console.print(&format!("→ {}({})", tool.name, rendered.join(", ")))?;
    }

    match session.invoke(&tool, args.values()).await {
        Ok(value) => console.print(&format!("Result ({}) → {}", tool.name, display_value(&value))),
        Err(e) => report(console, &e),
    }
}
