/// One REPL line, parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Submit(String),
    State,
    History,
    Reset,
    Manual { intervener_id: String, outcome: String, notes: String },
    Config,
    User(String),
    Quit,
    Help,
    Invalid(String),
    Empty,
}

pub const HELP: &str = "\
commands:
  <text>                          evaluate a message for the current user
  /state                          current intervention state
  /history                        intervention records, oldest first
  /reset                          force the current user back to SAFE
  /manual <id> <outcome> [notes]  record a responder intervention
  /config                         effective configuration
  /user <id>                      switch user
  /quit                           exit";

pub fn parse(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Command::Submit(line.to_owned());
    };

    let mut parts = rest.split_whitespace();
    let name = parts.next().unwrap_or_default();
    match name {
        "state" => Command::State,
        "history" => Command::History,
        "reset" => Command::Reset,
        "config" => Command::Config,
        "help" | "h" => Command::Help,
        "q" | "quit" | "exit" => Command::Quit,
        "user" => match parts.next() {
            Some(id) => Command::User(id.to_owned()),
            None => Command::Invalid("usage: /user <id>".into()),
        },
        "manual" => match (parts.next(), parts.next()) {
            (Some(id), Some(outcome)) => Command::Manual {
                intervener_id: id.to_owned(),
                outcome: outcome.to_owned(),
                notes: parts.collect::<Vec<_>>().join(" "),
            },
            _ => Command::Invalid("usage: /manual <id> <outcome> [notes]".into()),
        },
        other => Command::Invalid(format!("unknown command /{other}, try /help")),
    }
}
