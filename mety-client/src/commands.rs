//! Command definitions for the `mety` binary and its interactive session.

use crate::error::ClientError;
use mety_core::{Gender, OnboardingPage, PlanSnapshot, TurnId};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Switch the active user.
    User(String),
    Plan,
    Set { name: String, value: f64 },
    ResetOptimal,
    SaveAll(Vec<(String, f64)>),
    Chat(String),
    ApplyPending,
    IgnorePending,
    ApplyExtracted,
    ApplyRecommended,
    ToggleSuggestion(TurnId),
    ClearChat,
    History,
    Predict,
    Log {
        start: String,
        end: String,
        values: Vec<(String, f64)>,
    },
    AboutMe {
        age: u32,
        gender: Gender,
        name: Option<String>,
    },
    Onboard {
        page: OnboardingPage,
        values: PlanSnapshot,
    },
    Health,
    Help,
    Quit,
}

/// Process arguments after the global flags are removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Invocation {
    pub user: Option<String>,
    /// `None` starts an interactive session.
    pub command: Option<Command>,
}

pub const HELP: &str = "\
commands:
  user <id>                     switch the active user
  plan                          show current, target and optimal plans
  set <variable> <value>        change one target value
  reset-optimal                 replace the target with the optimal plan (local)
  save-all [name=value ...]     save the plan table as the new current plan
  chat <message>                talk to the assistant
  apply-pending | ignore-pending
  apply-extracted | apply-recommended
  expand <turn>                 show or hide a suggested plan
  history                       show the chat history
  clear-chat                    wipe the chat history
  predict                       recalculate the lifespan projection
  log <start> <end> [name=value ...]
  about-me <age> <male|female> [name]
  onboard <supplements|diet|exercise> name=value ...
  health | help | quit";

/// Split the process arguments into global flags and a command.
pub fn parse_args<I>(args: I) -> Result<Invocation, ClientError>
where
    I: IntoIterator<Item = String>,
{
    let mut invocation = Invocation::default();
    let mut rest = Vec::new();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                args.next()
                    .ok_or_else(|| ClientError::Usage("--config <path>".to_string()))?;
            }
            "--user" => {
                let user = args
                    .next()
                    .ok_or_else(|| ClientError::Usage("--user <id>".to_string()))?;
                invocation.user = Some(user);
            }
            _ => rest.push(arg),
        }
    }
    if !rest.is_empty() {
        invocation.command = Some(parse_command(&rest)?);
    }
    Ok(invocation)
}

/// Parse one whitespace-separated session line.
pub fn parse_line(line: &str) -> Result<Option<Command>, ClientError> {
    let words: Vec<String> = line.split_whitespace().map(str::to_string).collect();
    if words.is_empty() {
        return Ok(None);
    }
    parse_command(&words).map(Some)
}

pub fn parse_command(words: &[String]) -> Result<Command, ClientError> {
    let (head, args) = words
        .split_first()
        .ok_or_else(|| ClientError::Usage(HELP.to_string()))?;
    let command = match (head.as_str(), args) {
        ("user", [id]) => Command::User(id.clone()),
        ("plan", []) => Command::Plan,
        ("set", [name, value]) => Command::Set {
            name: name.clone(),
            value: parse_number(value)?,
        },
        ("reset-optimal", []) => Command::ResetOptimal,
        ("save-all", pairs) => Command::SaveAll(parse_pairs(pairs)?),
        ("chat", message) if !message.is_empty() => Command::Chat(message.join(" ")),
        ("apply-pending", []) => Command::ApplyPending,
        ("ignore-pending", []) => Command::IgnorePending,
        ("apply-extracted", []) => Command::ApplyExtracted,
        ("apply-recommended", []) => Command::ApplyRecommended,
        ("expand", [turn]) => Command::ToggleSuggestion(TurnId(
            turn.trim_start_matches("turn-")
                .parse()
                .map_err(|_| ClientError::Usage("expand <turn>".to_string()))?,
        )),
        ("clear-chat", []) => Command::ClearChat,
        ("history", []) => Command::History,
        ("predict", []) => Command::Predict,
        ("log", [start, end, pairs @ ..]) => Command::Log {
            start: start.clone(),
            end: end.clone(),
            values: parse_pairs(pairs)?,
        },
        ("about-me", [age, gender, name @ ..]) => Command::AboutMe {
            age: age
                .parse()
                .map_err(|_| ClientError::Usage("about-me <age> <male|female> [name]".to_string()))?,
            gender: parse_gender(gender)?,
            name: (!name.is_empty()).then(|| name.join(" ")),
        },
        ("onboard", [page, pairs @ ..]) => Command::Onboard {
            page: parse_page(page)?,
            values: parse_pairs(pairs)?.into_iter().collect(),
        },
        ("health", []) => Command::Health,
        ("help", []) => Command::Help,
        ("quit" | "exit", []) => Command::Quit,
        _ => return Err(ClientError::Usage(HELP.to_string())),
    };
    Ok(command)
}

fn parse_number(raw: &str) -> Result<f64, ClientError> {
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ClientError::Usage(format!("{raw} is not a number")))
}

fn parse_pairs(pairs: &[String]) -> Result<Vec<(String, f64)>, ClientError> {
    pairs
        .iter()
        .map(|pair| {
            let (name, value) = pair
                .split_once('=')
                .ok_or_else(|| ClientError::Usage(format!("expected name=value, got {pair}")))?;
            Ok((name.to_string(), parse_number(value)?))
        })
        .collect()
}

fn parse_gender(raw: &str) -> Result<Gender, ClientError> {
    match raw.to_ascii_lowercase().as_str() {
        "male" | "m" | "0" => Ok(Gender::Male),
        "female" | "f" | "1" => Ok(Gender::Female),
        _ => Err(ClientError::Usage("gender must be male or female".to_string())),
    }
}

fn parse_page(raw: &str) -> Result<OnboardingPage, ClientError> {
    match raw.to_ascii_lowercase().as_str() {
        "supplements" => Ok(OnboardingPage::Supplements),
        "diet" => Ok(OnboardingPage::Diet),
        "exercise" => Ok(OnboardingPage::Exercise),
        _ => Err(ClientError::Usage(
            "page must be supplements, diet or exercise".to_string(),
        )),
    }
}
