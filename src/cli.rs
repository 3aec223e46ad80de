//! Command-line interface and REPL

use crate::config::WatchConfig;
use crate::session::{InitTarget, SessionHandle};
use crate::sinks::VariableStore;
use anyhow::Result;
use colored::*;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// One REPL command
#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    /// Literal read
    Get(String),
    /// Read with `$pgm` / `$pvw` / `$sel` resolved
    GetResolved(String),
    Set(String, Value),
    Watch(WatchConfig),
    Unwatch(String),
    Init(InitTarget),
    Subs,
    Vars(Option<String>),
    Help,
    Quit,
}

const HELP: &str = "\
  get <path>                     literal read
  getr <path>                    read with $pgm/$pvw/$sel resolved
  set <path> <json>              apply one update (bare words are strings)
  watch <name> <regex> [var]     publish matches as a variable ($1.. allowed)
  unwatch <name>                 remove a watch
  init [name]                    prime one or every subscription
  subs                           list subscriptions
  vars [prefix]                  list variables
  quit                           leave";

/// Parse one input line, `Ok(None)` for blank input
pub fn parse_command(line: &str) -> Result<Option<ReplCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    let mut args = rest.split_whitespace();

    let command = match word {
        "get" | "getr" => {
            let path = args.next().ok_or("usage: get <path>")?.to_string();
            if word == "get" {
                ReplCommand::Get(path)
            } else {
                ReplCommand::GetResolved(path)
            }
        }
        "set" => {
            let (path, raw) = rest.split_once(char::is_whitespace).ok_or("usage: set <path> <json>")?;
            let raw = raw.trim();
            let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
            ReplCommand::Set(path.to_string(), value)
        }
        "watch" => {
            let name = args.next().ok_or("usage: watch <name> <regex> [variable]")?;
            let pattern = args.next().ok_or("usage: watch <name> <regex> [variable]")?;
            ReplCommand::Watch(WatchConfig {
                name: name.to_string(),
                pattern: pattern.to_string(),
                variable: args.next().map(str::to_string),
                reactions: Vec::new(),
                seed: None,
            })
        }
        "unwatch" => ReplCommand::Unwatch(args.next().ok_or("usage: unwatch <name>")?.to_string()),
        "init" => ReplCommand::Init(match args.next() {
            Some(name) => InitTarget::from(name),
            None => InitTarget::All,
        }),
        "subs" => ReplCommand::Subs,
        "vars" => ReplCommand::Vars(args.next().map(str::to_string)),
        "help" | "?" => ReplCommand::Help,
        "quit" | "exit" => ReplCommand::Quit,
        other => return Err(format!("unknown command '{}', try 'help'", other)),
    };

    Ok(Some(command))
}

/// Interactive loop over a running session
///
/// Line editing blocks, so it runs on a blocking thread and hands lines over
/// a channel.
pub async fn run_repl(session: SessionHandle, variables: Arc<VariableStore>) -> Result<()> {
    let (line_tx, mut line_rx) = mpsc::channel::<String>(16);

    let reader = tokio::task::spawn_blocking(move || -> Result<()> {
        let mut rl = DefaultEditor::new()?;
        loop {
            match rl.readline("awj> ") {
                Ok(line) => {
                    let _ = rl.add_history_entry(line.as_str());
                    let quit = matches!(line.trim(), "quit" | "exit");
                    if line_tx.blocking_send(line).is_err() || quit {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    });

    while let Some(line) = line_rx.recv().await {
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{}", e.yellow());
                continue;
            }
        };
        debug!("REPL command: {:?}", command);

        if command == ReplCommand::Quit {
            break;
        }
        if let Err(e) = execute(&session, &variables, command).await {
            println!("{} {:#}", "error:".red().bold(), e);
        }
    }

    drop(line_rx);
    match reader.await {
        Ok(Err(e)) => warn!("Line editor failed: {}", e),
        Err(e) => warn!("Line editor task failed: {}", e),
        Ok(Ok(())) => {}
    }

    Ok(())
}

async fn execute(
    session: &SessionHandle,
    variables: &VariableStore,
    command: ReplCommand,
) -> Result<()> {
    match command {
        ReplCommand::Get(path) => print_value(&path, session.get(&path).await?),
        ReplCommand::GetResolved(path) => print_value(&path, session.get_resolved(&path).await?),
        ReplCommand::Set(path, value) => {
            let outcome = session.apply(&path, value).await?;
            let reactions: Vec<&str> = outcome.reactions.iter().map(|r| r.as_str()).collect();
            println!(
                "{} reactions: [{}]{}",
                "ok".green(),
                reactions.join(", ").cyan(),
                if outcome.refresh { " +refresh".magenta().to_string() } else { String::new() }
            );
        }
        ReplCommand::Watch(watch) => {
            let name = watch.name.clone();
            session.watch(watch).await?;
            session.prime(InitTarget::Name(name.clone())).await?;
            println!("{} watching '{}'", "ok".green(), name);
        }
        ReplCommand::Unwatch(name) => {
            if session.unwatch(&name).await? {
                println!("{} removed '{}'", "ok".green(), name);
            } else {
                println!("{}", format!("no subscription named '{}'", name).yellow());
            }
        }
        ReplCommand::Init(target) => {
            let outcome = session.prime(target).await?;
            println!(
                "{} {} reaction(s), refresh {}",
                "ok".green(),
                outcome.reactions.len(),
                outcome.refresh
            );
        }
        ReplCommand::Subs => {
            for name in session.subscriptions().await? {
                println!("  {}", name.cyan());
            }
        }
        ReplCommand::Vars(prefix) => print_variables(variables, prefix.as_deref()),
        ReplCommand::Help => println!("{}", HELP),
        ReplCommand::Quit => {}
    }
    Ok(())
}

fn print_value(path: &str, value: Option<Value>) {
    match value {
        Some(value) => println!("{} = {}", path.bright_white(), value.to_string().green()),
        None => println!("{} {}", path.bright_white(), "(absent)".dimmed()),
    }
}

/// Print variables sorted by name, optionally filtered by prefix
pub fn print_variables(variables: &VariableStore, prefix: Option<&str>) {
    let all = variables.all();
    let width = all.keys().map(String::len).max().unwrap_or(0);

    for (name, value) in all
        .iter()
        .filter(|(name, _)| prefix.map_or(true, |p| name.starts_with(p)))
    {
        println!("  {}  {}", format!("{:width$}", name, width = width).yellow(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_reads() {
        assert_eq!(
            parse_command("get device/screenList/items/S1/control/pp/label").unwrap(),
            Some(ReplCommand::Get("device/screenList/items/S1/control/pp/label".to_string()))
        );
        assert_eq!(
            parse_command("getr device/screenList/items/S1/presetList/items/$sel").unwrap(),
            Some(ReplCommand::GetResolved(
                "device/screenList/items/S1/presetList/items/$sel".to_string()
            ))
        );
        assert!(parse_command("get").is_err());
    }

    #[test]
    fn test_parse_set_values() {
        assert_eq!(
            parse_command("set LOCAL/presetMode PROGRAM").unwrap(),
            Some(ReplCommand::Set("LOCAL/presetMode".to_string(), json!("PROGRAM")))
        );
        assert_eq!(
            parse_command(r#"set REMOTE/live/screens/screenAuxSelection ["S1", "S2"]"#).unwrap(),
            Some(ReplCommand::Set(
                "REMOTE/live/screens/screenAuxSelection".to_string(),
                json!(["S1", "S2"])
            ))
        );
        assert_eq!(
            parse_command("set device/x 12").unwrap(),
            Some(ReplCommand::Set("device/x".to_string(), json!(12)))
        );
    }

    #[test]
    fn test_parse_watch_and_init() {
        let Some(ReplCommand::Watch(watch)) =
            parse_command(r"watch src ^DEVICE/.*/items/(\w+)/source$ src_$1").unwrap()
        else {
            panic!("expected watch");
        };
        assert_eq!(watch.name, "src");
        assert_eq!(watch.variable.as_deref(), Some("src_$1"));

        assert_eq!(parse_command("init").unwrap(), Some(ReplCommand::Init(InitTarget::All)));
        assert_eq!(
            parse_command("init timer").unwrap(),
            Some(ReplCommand::Init(InitTarget::Name("timer".to_string())))
        );
    }

    #[test]
    fn test_parse_misc() {
        assert_eq!(parse_command("   ").unwrap(), None);
        assert_eq!(parse_command("exit").unwrap(), Some(ReplCommand::Quit));
        assert!(parse_command("frobnicate").is_err());
    }
}
