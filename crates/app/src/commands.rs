use std::fmt;

/// One line of learner input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Next,
    Back,
    /// Part tab, zero-based.
    Part(usize),
    /// Question slot on the current unit, zero-based.
    Answer(usize, String),
    Toggle(usize, String),
    Clear(usize),
    Play,
    Pause,
    Show,
    Status,
    Finish,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    Empty,
    Unknown(String),
    MissingArgument { command: &'static str },
    BadIndex(String),
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputError::Empty => f.write_str("empty command"),
            InputError::Unknown(raw) => write!(f, "unknown command: {raw} (try `help`)"),
            InputError::MissingArgument { command } => write!(f, "{command} needs more input"),
            InputError::BadIndex(raw) => write!(f, "not a number from 1 up: {raw}"),
        }
    }
}

impl std::error::Error for InputError {}

/// Indices typed by the learner are one-based.
fn index(raw: Option<&str>, command: &'static str) -> Result<usize, InputError> {
    let raw = raw.ok_or(InputError::MissingArgument { command })?;
    match raw.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n - 1),
        _ => Err(InputError::BadIndex(raw.to_string())),
    }
}

fn value(rest: Option<&str>, command: &'static str) -> Result<String, InputError> {
    rest.map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(InputError::MissingArgument { command })
}

impl Input {
    /// # Errors
    ///
    /// Returns `InputError` for blank lines, unknown verbs, and malformed
    /// arguments.
    pub fn parse(line: &str) -> Result<Self, InputError> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, Some(rest.trim_start())),
            None => (line, None),
        };

        let verb = verb.to_ascii_lowercase();
        match verb.as_str() {
            "" => Err(InputError::Empty),
            "n" | "next" => Ok(Self::Next),
            "b" | "back" => Ok(Self::Back),
            "p" | "part" => Ok(Self::Part(index(rest, "part")?)),
            "a" | "answer" | "t" | "toggle" => {
                let toggle = matches!(verb.as_str(), "t" | "toggle");
                let command = if toggle { "toggle" } else { "answer" };
                let (slot, text) = match rest.and_then(|r| r.split_once(char::is_whitespace)) {
                    Some((slot, text)) => (Some(slot), Some(text)),
                    None => (rest, None),
                };
                let slot = index(slot, command)?;
                let text = value(text, command)?;
                Ok(if toggle {
                    Self::Toggle(slot, text)
                } else {
                    Self::Answer(slot, text)
                })
            }
            "c" | "clear" => Ok(Self::Clear(index(rest, "clear")?)),
            "play" => Ok(Self::Play),
            "pause" => Ok(Self::Pause),
            "show" | "l" => Ok(Self::Show),
            "s" | "status" => Ok(Self::Status),
            "finish" | "submit" => Ok(Self::Finish),
            "h" | "help" | "?" => Ok(Self::Help),
            "q" | "quit" | "exit" => Ok(Self::Quit),
            _ => Err(InputError::Unknown(verb)),
        }
    }
}

pub const HELP: &str = "\
commands:
  n | next              go to the next unit (finishes on the last one)
  b | back              go to the previous unit
  p | part <n>          jump to part n
  a | answer <q> <v>    answer question slot q on this unit with v
  t | toggle <q> <v>    select v, or clear it if already selected
  c | clear <q>         clear question slot q
  play | pause          control the unit's audio
  show                  print the current unit again
  s | status            progress and remaining time
  finish                submit now
  q | quit              leave without submitting";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_navigation_verbs() {
        assert_eq!(Input::parse("next"), Ok(Input::Next));
        assert_eq!(Input::parse("  B "), Ok(Input::Back));
        assert_eq!(Input::parse("part 3"), Ok(Input::Part(2)));
        assert_eq!(Input::parse("finish"), Ok(Input::Finish));
    }

    #[test]
    fn answers_keep_the_whole_value() {
        assert_eq!(
            Input::parse("a 2 mix, bake, serve"),
            Ok(Input::Answer(1, "mix, bake, serve".into()))
        );
        assert_eq!(Input::parse("toggle 1 C"), Ok(Input::Toggle(0, "C".into())));
        assert_eq!(Input::parse("clear 1"), Ok(Input::Clear(0)));
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(Input::parse("   "), Err(InputError::Empty));
        assert_eq!(
            Input::parse("jump"),
            Err(InputError::Unknown("jump".into()))
        );
        assert_eq!(
            Input::parse("answer 1"),
            Err(InputError::MissingArgument { command: "answer" })
        );
        assert_eq!(Input::parse("part 0"), Err(InputError::BadIndex("0".into())));
        assert_eq!(
            Input::parse("p x"),
            Err(InputError::BadIndex("x".into()))
        );
    }
}
