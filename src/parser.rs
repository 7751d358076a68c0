//! Turns a line of user input into an [`AlarmRequest`].
//!
//! Three grammars are tried in order and the first match wins:
//!
//! ```text
//! Start_Alarm(<id>): <period> <message>
//! Change_Alarm(<id>): <period> <message>
//! Cancel_Alarm(<id>)
//! ```
//!
//! A line matching none of them is not an error, [`parse_request`] just
//! returns `None` and the caller reports a bad command.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::alarm::{AlarmKind, AlarmRequest};

struct Grammar {
    kind: AlarmKind,
    pattern: Regex,
}

impl Grammar {
    fn new(kind: AlarmKind, pattern: &str) -> Self {
        Self {
            kind,
            pattern: Regex::new(pattern).expect("built-in grammar is a valid regex"),
        }
    }
}

static GRAMMARS: LazyLock<[Grammar; 3]> = LazyLock::new(|| {
    [
        Grammar::new(
            AlarmKind::Start,
            r"^Start_Alarm\(([0-9]+)\):\s([0-9]+)\s(.*)$",
        ),
        Grammar::new(
            AlarmKind::Change,
            r"^Change_Alarm\(([0-9]+)\):\s([0-9]+)\s(.*)$",
        ),
        Grammar::new(AlarmKind::Cancel, r"^Cancel_Alarm\(([0-9]+)\)\s*$"),
    ]
});

/// Parses one command line. The line terminator is ignored and so is
/// trailing whitespace in the message, but the separator after the period
/// is required even when the message is empty. Anything else outside the
/// grammar makes the line a bad command.
#[must_use]
pub fn parse_request(input: &str) -> Option<AlarmRequest> {
    let input = input.trim_end_matches(['\r', '\n']);
    GRAMMARS.iter().find_map(|grammar| {
        let captures = grammar.pattern.captures(input)?;
        let id = number(&captures, 1);
        Some(match grammar.kind {
            AlarmKind::Cancel => AlarmRequest::cancel(id),
            kind => AlarmRequest::new(
                id,
                kind,
                number(&captures, 2),
                captures.get(3).map_or("", |m| m.as_str().trim_end()),
            ),
        })
    })
}

/// digits that overflow a `u32` clamp to `u32::MAX`
fn number(captures: &Captures<'_>, group: usize) -> u32 {
    captures
        .get(group)
        .map_or(0, |m| m.as_str().parse().unwrap_or(u32::MAX))
}
