pub const COMMANDS: &[&str] = &[
    "cat", "echo", "find_sum", "forktest", "grep", "init", "kill", "ln", "ls", "mkdir", "rm",
    "sh", "wc", "zombie",
];

#[derive(Debug, Default)]
pub struct Completer {
    last_key_was_tab: bool,
}

#[derive(Debug, Eq, PartialEq)]
pub enum Completion<'a> {
    // Space in the prefix, or no matches.
    None,
    Unique { suffix: &'a str },
    // Longest common prefix of multiple matches extends what's typed.
    Extend { suffix: &'a str },
    // Second consecutive Tab on an ambiguous prefix.
    List { matches: &'a [&'static str] },
    // Ambiguous, no further extension possible, first Tab: latch and wait.
    AwaitSecondTab,
}

impl Completer {
    pub const fn new() -> Self {
        Completer {
            last_key_was_tab: false,
        }
    }

    pub fn reset(&mut self) {
        self.last_key_was_tab = false;
    }

    fn matches_buf<'a>(prefix: &str, scratch: &'a mut [&'static str]) -> &'a [&'static str] {
        let mut n = 0;
        for &cmd in COMMANDS {
            if cmd.as_bytes().starts_with(prefix.as_bytes()) {
                if n < scratch.len() {
                    scratch[n] = cmd;
                }
                n += 1;
            }
        }
        &scratch[..n.min(scratch.len())]
    }

    // Caller aborts before calling this if `prefix` contains a space.
    // `matches_out` is scratch space sized to at least COMMANDS.len().
    pub fn on_tab<'a>(&mut self, prefix: &str, matches_out: &'a mut [&'static str]) -> Completion<'a> {
        let matches = Self::matches_buf(prefix, matches_out);
        match matches.len() {
            0 => {
                self.reset();
                Completion::None
            }
            1 => {
                self.reset();
                Completion::Unique {
                    suffix: &matches[0][prefix.len()..],
                }
            }
            _ => {
                if self.last_key_was_tab {
                    self.reset();
                    Completion::List { matches }
                } else {
                    let lcp = longest_common_prefix(matches);
                    self.last_key_was_tab = true;
                    if lcp.len() > prefix.len() {
                        Completion::Extend {
                            suffix: &lcp[prefix.len()..],
                        }
                    } else {
                        Completion::AwaitSecondTab
                    }
                }
            }
        }
    }
}

fn longest_common_prefix(matches: &[&'static str]) -> &'static str {
    let first = match matches.first() {
        Some(s) => *s,
        None => return "",
    };
    let mut len = first.len();
    for m in &matches[1..] {
        let common = first
            .bytes()
            .zip(m.bytes())
            .take_while(|(a, b)| a == b)
            .count();
        len = len.min(common);
    }
    &first[..len]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_with_no_matches_is_a_no_op() {
        let mut c = Completer::new();
        let mut scratch = [""; COMMANDS.len()];
        assert_eq!(c.on_tab("zz", &mut scratch), Completion::None);
    }

    #[test]
    fn unique_match_completes() {
        let mut c = Completer::new();
        let mut scratch = [""; COMMANDS.len()];
        assert_eq!(
            c.on_tab("gr", &mut scratch),
            Completion::Unique { suffix: "ep" }
        );
    }

    #[test]
    fn two_matches_extend_to_their_common_prefix() {
        let mut c = Completer::new();
        let mut scratch = [""; COMMANDS.len()];
        // "f" => forktest, find_sum: common prefix is just "f".
        assert_eq!(c.on_tab("f", &mut scratch), Completion::AwaitSecondTab);
    }

    #[test]
    fn second_consecutive_tab_lists_matches() {
        let mut c = Completer::new();
        let mut scratch = [""; COMMANDS.len()];
        let _ = c.on_tab("f", &mut scratch);
        match c.on_tab("f", &mut scratch) {
            Completion::List { matches } => {
                assert!(matches.contains(&"forktest"));
                assert!(matches.contains(&"find_sum"));
            }
            other => panic!("expected List, got {:?}", other),
        }
    }

    #[test]
    fn extending_to_fi_then_unique_match_completes_to_find_sum() {
        let mut c = Completer::new();
        let mut scratch = [""; COMMANDS.len()];
        assert_eq!(
            c.on_tab("fi", &mut scratch),
            Completion::Unique {
                suffix: "nd_sum"
            }
        );
    }

    #[test]
    fn reset_clears_the_latch() {
        let mut c = Completer::new();
        let mut scratch = [""; COMMANDS.len()];
        let _ = c.on_tab("f", &mut scratch);
        c.reset();
        // A fresh Tab on the same ambiguous prefix is treated as a first
        // Tab again, not a second.
        match c.on_tab("f", &mut scratch) {
            Completion::AwaitSecondTab => {}
            other => panic!("expected AwaitSecondTab after reset, got {:?}", other),
        }
    }
}
