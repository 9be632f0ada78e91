//! Player input lines: `u`, `d`, `3u`, `3`, `r`, `n`, `q`, `?`.

use intonation_game::{Answer, Direction};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Bare higher/lower.
    Direction(Direction),
    /// Bare scale degree.
    Degree(usize),
    /// Degree and direction at once, e.g. `3u`.
    Combined(Answer),
    Replay,
    Next,
    Quit,
    Help,
}

fn direction(s: &str) -> Option<Direction> {
    match s {
        "u" | "up" | "h" | "higher" | "+" | "s" | "sharp" => Some(Direction::Up),
        "d" | "down" | "l" | "lower" | "-" | "f" | "flat" => Some(Direction::Down),
        _ => None,
    }
}

pub fn parse(line: &str) -> Result<Command, String> {
    let s = line.trim().to_ascii_lowercase();
    match s.as_str() {
        "" => return Err("empty input".into()),
        "r" | "replay" => return Ok(Command::Replay),
        "n" | "next" => return Ok(Command::Next),
        "q" | "quit" | "exit" => return Ok(Command::Quit),
        "?" | "help" => return Ok(Command::Help),
        _ => {}
    }
    if let Some(d) = direction(&s) {
        return Ok(Command::Direction(d));
    }

    let digits = s.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return Err(format!("unrecognised input {s:?} (type ? for help)"));
    }
    let index: usize = s[..digits].parse().map_err(|_| format!("bad degree in {s:?}"))?;
    let rest = s[digits..].trim();
    if rest.is_empty() {
        return Ok(Command::Degree(index));
    }
    match direction(rest) {
        Some(direction) => Ok(Command::Combined(Answer::Degree { index, direction })),
        None => Err(format!("bad direction {rest:?} in {s:?}")),
    }
}

pub const HELP: &str = "\
  u / d     higher / lower (sharp / flat)
  3u, 5d    scale game: degree and direction together
  3 then u  scale game (split input): pick degree and direction separately
  r         replay the notes (easy mode, or after answering in slow mode)
  n         next round (slow mode)
  q         quit";
