//! Line commands accepted by the interactive pin panel.
//!
//! ```text
//! toggle <N>   flip pin N
//! on <N>       assert pin N
//! off <N>      deassert pin N
//! sync         request a fresh sync from the simulator
//! show         print the panel
//! help         list commands
//! quit         leave the panel (also: exit)
//! ```
//!
//! `N` is the one-based pin number shown in the panel (1–26).

use std::str::FromStr;

use gpio_core::PinIndex;
use thiserror::Error;

/// A parsed panel command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelCommand {
    Toggle(PinIndex),
    Set(PinIndex, bool),
    Sync,
    Show,
    Help,
    Quit,
}

/// Why a line could not be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseCommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command: {0}")]
    Unknown(String),
    #[error("`{0}` needs a pin number")]
    MissingPin(&'static str),
    #[error("invalid pin `{0}`: expected a number from 1 to 26")]
    InvalidPin(String),
    #[error("unexpected argument: {0}")]
    TrailingArgument(String),
}

/// Usage text printed by `help`.
pub const HELP: &str = "\
commands:
  toggle <N>   flip pin N (1-26)
  on <N>       assert pin N
  off <N>      deassert pin N
  sync         request a fresh sync
  show         print the panel
  quit         leave";

impl FromStr for PanelCommand {
    type Err = ParseCommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let verb = words.next().ok_or(ParseCommandError::Empty)?.to_ascii_lowercase();

        let command = match verb.as_str() {
            "toggle" | "t" => PanelCommand::Toggle(parse_pin(words.next(), "toggle")?),
            "on" => PanelCommand::Set(parse_pin(words.next(), "on")?, true),
            "off" => PanelCommand::Set(parse_pin(words.next(), "off")?, false),
            "sync" => PanelCommand::Sync,
            "show" | "ls" => PanelCommand::Show,
            "help" | "?" => PanelCommand::Help,
            "quit" | "exit" | "q" => PanelCommand::Quit,
            _ => return Err(ParseCommandError::Unknown(verb)),
        };

        match words.next() {
            Some(extra) => Err(ParseCommandError::TrailingArgument(extra.to_string())),
            None => Ok(command),
        }
    }
}

/// Parses a one-based pin number.
pub fn parse_pin_number(word: &str) -> Result<PinIndex, ParseCommandError> {
    word.parse::<usize>()
        .ok()
        .and_then(PinIndex::from_pin_number)
        .ok_or_else(|| ParseCommandError::InvalidPin(word.to_string()))
}

fn parse_pin(word: Option<&str>, verb: &'static str) -> Result<PinIndex, ParseCommandError> {
    parse_pin_number(word.ok_or(ParseCommandError::MissingPin(verb))?)
}
