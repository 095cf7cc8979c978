//! Text pipeline language.
//!
//! A pipeline is a sequence of stages separated by `|`, either on one line
//! or spread over several with each continuation line starting with `|`:
//!
//! ```text
//! # keep error lines and tidy them up
//! PIPE CAT "server.log"
//! | GREP /ERROR/
//! | SED /^\S+ \S+ // EXCLUSIVE
//! | SH "sort -u" CHECK
//! ?
//! ```
//!
//! Keywords are case-insensitive. String arguments are delimited: the first
//! non-blank character opens the string and its next occurrence closes it,
//! so `"a"`, `/a/` and `'a'` are equivalent. Lines starting with `#` are
//! comments, a `PIPE` prefix is optional and a trailing `?` ends the
//! pipeline.

use std::io::Write;
use std::iter;

use lazypipe::{Flow, Node, SourceNode};

use crate::error::{DslError, Result};
use crate::items::{skip, take};
use crate::pattern::{Substitute, grep, sed};
use crate::shell::{ExitPolicy, sh, sh_source};
use crate::source::{cat, curl, echo};
use crate::text::Line;

/// Parsed pipeline command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// ECHO "text" - emit one line
    Echo { text: String },
    /// CAT "path" - stream a file's lines
    Cat { path: String },
    /// CURL "url" - stream a response body's lines
    Curl { url: String },
    /// GREP /regex/ - keep matching lines
    Grep { pattern: String },
    /// SED /regex/ /replacement/ [EXCLUSIVE] - substitute the first match
    Sed {
        pattern: String,
        replacement: String,
        mode: Substitute,
    },
    /// SH "command" [CHECK] - pipe lines through a shell command
    Sh { command: String, policy: ExitPolicy },
    /// PRINT - echo lines to stderr as they pass
    Print,
    /// TAKE n
    Take { n: usize },
    /// SKIP n
    Skip { n: usize },
    /// COUNT - replace the input with its line count
    Count,
}

impl Command {
    /// Can this stage start a pipeline?
    pub fn can_be_first(&self) -> bool {
        matches!(
            self,
            Command::Echo { .. } | Command::Cat { .. } | Command::Curl { .. } | Command::Sh { .. }
        )
    }

    /// Get the stage keyword for error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Echo { .. } => "ECHO",
            Command::Cat { .. } => "CAT",
            Command::Curl { .. } => "CURL",
            Command::Grep { .. } => "GREP",
            Command::Sed { .. } => "SED",
            Command::Sh { .. } => "SH",
            Command::Print => "PRINT",
            Command::Take { .. } => "TAKE",
            Command::Skip { .. } => "SKIP",
            Command::Count => "COUNT",
        }
    }

    /// The node for this command when it starts a pipeline.
    pub fn to_source(&self) -> Option<SourceNode<Line>> {
        match self {
            Command::Echo { text } => Some(echo(Ok(text.clone()))),
            Command::Cat { path } => Some(cat(path)),
            Command::Curl { url } => Some(curl(url.as_str())),
            Command::Sh { command, policy } => Some(sh_source(command.as_str(), *policy)),
            _ => None,
        }
    }

    /// The node for this command when it follows another stage.
    ///
    /// Source commands keep their source stage, so chaining them onto a
    /// pipeline is rejected by composition.
    pub fn to_stage(&self) -> Node<Line, Line> {
        match self {
            Command::Echo { text } => echo(Ok(text.clone())).accepting(),
            Command::Cat { path } => cat(path).accepting(),
            Command::Curl { url } => curl(url.as_str()).accepting(),
            Command::Grep { pattern } => grep(pattern.as_str()),
            Command::Sed {
                pattern,
                replacement,
                mode,
            } => sed(pattern.as_str(), replacement.as_str(), *mode),
            Command::Sh { command, policy } => sh(command.as_str(), *policy),
            Command::Print => print_lines(),
            Command::Take { n } => take(*n),
            Command::Skip { n } => skip(*n),
            Command::Count => count_lines(),
        }
    }
}

/// Parse DSL text into commands.
pub fn parse_commands(text: &str) -> Result<Vec<Command>> {
    let mut commands = Vec::new();

    for (line_num, line) in text.lines().enumerate() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let line = strip_keyword(line, "PIPE").unwrap_or(line);
        let line = line.strip_prefix('|').unwrap_or(line).trim();

        parse_line(line, &mut commands).map_err(|message| DslError::Parse {
            line: line_num + 1,
            message,
        })?;
    }

    Ok(commands)
}

/// Assemble parsed commands into a pipeline.
///
/// The first command must be a source; every later command is chained on
/// with [`Node::try_then`].
pub fn build_pipeline(commands: &[Command]) -> Result<SourceNode<Line>> {
    let (first, rest) = commands.split_first().ok_or(DslError::Empty)?;
    let mut pipeline = first
        .to_source()
        .ok_or(DslError::NotASource { stage: first.name() })?;

    for cmd in rest {
        pipeline = pipeline.try_then(&cmd.to_stage())?;
    }

    tracing::debug!(pipeline = %pipeline, stages = commands.len(), "pipeline assembled");
    Ok(pipeline)
}

/// Parse, assemble and run a pipeline, writing each output line to `out`
/// as soon as it is pulled.
///
/// Returns the number of lines written and the pipeline name. The first
/// `Err` item stops the run and is returned as [`DslError::Stage`]; lines
/// before it have already been written.
pub fn run_pipeline<W: Write>(text: &str, out: &mut W) -> Result<(usize, String)> {
    let commands = parse_commands(text)?;
    let pipeline = build_pipeline(&commands)?;

    let mut written = 0;
    for line in pipeline.iter() {
        match line {
            Ok(text) => {
                writeln!(out, "{text}")?;
                written += 1;
            }
            Err(err) => {
                out.flush()?;
                tracing::warn!(
                    pipeline = %pipeline,
                    lines = written,
                    "pipeline stopped by stage error"
                );
                return Err(err.into());
            }
        }
    }
    out.flush()?;

    tracing::info!(pipeline = %pipeline, lines = written, "pipeline finished");
    Ok((written, pipeline.name().to_string()))
}

fn print_lines() -> Node<Line, Line> {
    Node::transform("print", |input: Flow<Line>| {
        input.inspect(|line| {
            if let Ok(text) = line {
                eprintln!("{text}");
            }
        })
    })
}

fn count_lines() -> Node<Line, Line> {
    Node::transform("count", |mut input: Flow<Line>| {
        let counted = input.try_fold(0usize, |n, line| line.map(|_| n + 1));
        iter::once(counted.map(|n| n.to_string()))
    })
}

/// Parse one or more `|`-separated commands from a single line.
fn parse_line(line: &str, commands: &mut Vec<Command>) -> std::result::Result<(), String> {
    let mut rest = line;
    loop {
        let current = rest.trim_start();
        if current.is_empty() || current == "?" {
            return Ok(());
        }

        let (cmd, after) = parse_command(current)?;
        commands.push(cmd);

        let after = after.trim_start();
        if after.is_empty() || after == "?" {
            return Ok(());
        }
        match after.strip_prefix('|') {
            Some(next) => rest = next,
            None => {
                let name = commands.last().map_or("", Command::name);
                return Err(format!("Unexpected text after {name}: {after}"));
            }
        }
    }
}

/// Parse a single command, returning it and the unparsed remainder.
fn parse_command(s: &str) -> std::result::Result<(Command, &str), String> {
    let (keyword, rest) = next_word(s);

    match keyword.to_ascii_uppercase().as_str() {
        "ECHO" => {
            let (text, rest) = parse_delimited_string(rest)?;
            Ok((Command::Echo { text }, rest))
        }
        "CAT" => {
            let (path, rest) = parse_delimited_string(rest)?;
            Ok((Command::Cat { path }, rest))
        }
        "CURL" => {
            let (url, rest) = parse_delimited_string(rest)?;
            Ok((Command::Curl { url }, rest))
        }
        "GREP" => {
            let (pattern, rest) = parse_delimited_string(rest)?;
            Ok((Command::Grep { pattern }, rest))
        }
        "SED" => {
            let (pattern, rest) = parse_delimited_string(rest)?;
            let (replacement, rest) = parse_delimited_string(rest)
                .map_err(|e| format!("SED requires a pattern and a replacement: {e}"))?;
            let (exclusive, rest) = parse_flag(rest, "EXCLUSIVE");
            let mode = if exclusive {
                Substitute::Exclusive
            } else {
                Substitute::Inclusive
            };
            Ok((
                Command::Sed {
                    pattern,
                    replacement,
                    mode,
                },
                rest,
            ))
        }
        "SH" => {
            let (command, rest) = parse_delimited_string(rest)?;
            let (check, rest) = parse_flag(rest, "CHECK");
            let policy = if check {
                ExitPolicy::Check
            } else {
                ExitPolicy::Ignore
            };
            Ok((Command::Sh { command, policy }, rest))
        }
        "PRINT" => Ok((Command::Print, rest)),
        "TAKE" => {
            let (n, rest) = parse_count(rest, "TAKE")?;
            Ok((Command::Take { n }, rest))
        }
        "SKIP" => {
            let (n, rest) = parse_count(rest, "SKIP")?;
            Ok((Command::Skip { n }, rest))
        }
        "COUNT" => Ok((Command::Count, rest)),
        "" => Err("Expected a command".to_string()),
        _ => Err(format!("Unknown command: {keyword}")),
    }
}

/// Split off the next word, ending at whitespace or a `|` separator.
fn next_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    let end = s
        .find(|c: char| c.is_whitespace() || c == '|')
        .unwrap_or(s.len());
    s.split_at(end)
}

/// Strip a leading case-insensitive keyword followed by whitespace or the end of the line.
fn strip_keyword<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    let (word, rest) = next_word(line);
    word.eq_ignore_ascii_case(keyword).then(|| rest.trim_start())
}

/// Consume an optional flag word.
fn parse_flag<'a>(s: &'a str, flag: &str) -> (bool, &'a str) {
    match strip_keyword(s, flag) {
        Some(rest) => (true, rest),
        None => (false, s),
    }
}

fn parse_count<'a>(s: &'a str, name: &str) -> std::result::Result<(usize, &'a str), String> {
    let (word, rest) = next_word(s);
    let n = word
        .parse()
        .map_err(|_| format!("{name} requires a non-negative number, got '{word}'"))?;
    Ok((n, rest))
}

/// Parse a string whose first character is its own closing delimiter.
fn parse_delimited_string(s: &str) -> std::result::Result<(String, &str), String> {
    let s = s.trim_start();
    let Some(delim) = s.chars().next() else {
        return Err("Expected delimited string".to_string());
    };
    let after_delim = &s[delim.len_utf8()..];

    match after_delim.find(delim) {
        Some(end) => {
            let extracted = after_delim[..end].to_string();
            let rest = &after_delim[end + delim.len_utf8()..];
            Ok((extracted, rest))
        }
        None => Err(format!("Unclosed delimiter '{delim}'")),
    }
}
