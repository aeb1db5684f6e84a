//! Text predicates used to decide whether command, speech and act triggers
//! match what a character typed or said.

/// How a typed command is compared against a command trigger's argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandMatch {
    Exact,
    Abbrev,
}

/// Split the first phrase off `arg`: either a double-quoted phrase or a bare
/// word. Returns the phrase and the remaining text. An empty phrase means
/// the input was exhausted.
pub fn one_phrase(arg: &str) -> (String, &str) {
    let arg = arg.trim_start();
    if arg.is_empty() {
        return (String::new(), arg);
    }
    if let Some(rest) = arg.strip_prefix('"') {
        return match rest.find('"') {
            Some(end) => (rest[..end].to_string(), &rest[end + 1..]),
            None => (rest.to_string(), ""),
        };
    }
    let end = arg
        .find(|c: char| c.is_whitespace() || c == '"')
        .unwrap_or(arg.len());
    (arg[..end].to_string(), &arg[end..])
}

fn is_boundary(c: Option<char>) -> bool {
    match c {
        None => true,
        Some(c) => c.is_whitespace() || c.is_ascii_punctuation(),
    }
}

/// Whether `sub` occurs in `string` (case-insensitively) as a whole word or
/// phrase, bounded by whitespace, punctuation or the string edges.
pub fn is_substring(sub: &str, string: &str) -> bool {
    if sub.is_empty() {
        return false;
    }
    let hay = string.to_lowercase();
    let needle = sub.to_lowercase();
    let mut from = 0;
    while let Some(found) = hay[from..].find(&needle) {
        let start = from + found;
        let end = start + needle.len();
        let before = hay[..start].chars().next_back();
        let after = hay[end..].chars().next();
        if is_boundary(before) && is_boundary(after) {
            return true;
        }
        from = start + hay[start..].chars().next().map(|c| c.len_utf8()).unwrap_or(1);
    }
    false
}

/// Whether `text` contains any word or quoted phrase from `wordlist`.
/// A wordlist starting with `*` matches everything.
pub fn word_check(text: &str, wordlist: &str) -> bool {
    if wordlist.starts_with('*') {
        return true;
    }
    let mut rest = wordlist;
    loop {
        let (phrase, next) = one_phrase(rest);
        if phrase.is_empty() {
            return false;
        }
        if is_substring(&phrase, text) {
            return true;
        }
        rest = next;
    }
}

/// Speech/act matching: word-list mode when `narg` is nonzero, single
/// phrase mode otherwise. An argument of `*` always matches.
pub fn speech_matches(text: &str, arg: &str, narg: i32) -> bool {
    if arg.starts_with('*') {
        return true;
    }
    if narg != 0 {
        word_check(text, arg)
    } else {
        is_substring(arg, text)
    }
}

/// Whether `input` is a proper abbreviation of `word` (non-empty prefix,
/// shorter than the word, case-insensitive).
pub fn is_abbrev(input: &str, word: &str) -> bool {
    if input.is_empty() || input.len() >= word.len() {
        return false;
    }
    word.get(..input.len())
        .map(|prefix| prefix.eq_ignore_ascii_case(input))
        .unwrap_or(false)
}

fn match_one(input: &str, word: &str, mode: CommandMatch) -> bool {
    match mode {
        CommandMatch::Exact => input.eq_ignore_ascii_case(word),
        CommandMatch::Abbrev => is_abbrev(input, word),
    }
}

/// Compare a typed command against a command trigger argument.
///
/// `*` matches anything. An argument with whitespace is a list of
/// alternatives and matches if any one alternative does.
pub fn match_command_trig(input: &str, pattern: &str, mode: CommandMatch) -> bool {
    let input = input.trim();
    let pattern = pattern.trim();
    if pattern.starts_with('*') {
        return true;
    }
    if !pattern.contains(char::is_whitespace) {
        return match_one(input, pattern, mode);
    }
    let mut rest = pattern;
    loop {
        let (phrase, next) = one_phrase(rest);
        if phrase.is_empty() {
            return false;
        }
        if match_one(input, &phrase, mode) {
            return true;
        }
        rest = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_phrase_handles_quotes_and_words() {
        let (p, rest) = one_phrase("  \"open sesame\" please");
        assert_eq!(p, "open sesame");
        let (p, rest) = one_phrase(rest);
        assert_eq!(p, "please");
        let (p, _) = one_phrase(rest);
        assert!(p.is_empty());
        let (p, _) = one_phrase("\"unterminated phrase");
        assert_eq!(p, "unterminated phrase");
    }

    #[test]
    fn substring_needs_word_boundaries() {
        assert!(is_substring("hello", "Hello there"));
        assert!(is_substring("hello", "well, hello!"));
        assert!(!is_substring("hell", "hello there"));
        assert!(is_substring("hello", "othello hello"));
        assert!(!is_substring("", "anything"));
    }

    #[test]
    fn word_check_phrases() {
        assert!(word_check("I want the magic word", "\"magic word\" abracadabra"));
        assert!(word_check("say abracadabra now", "\"magic word\" abracadabra"));
        assert!(!word_check("magical words", "\"magic word\" abracadabra"));
        assert!(word_check("anything", "*"));
    }

    #[test]
    fn speech_mode_follows_narg() {
        assert!(speech_matches("i like pie", "pie cake", 1));
        assert!(!speech_matches("i like pie", "pie cake", 0));
        assert!(speech_matches("pie cake please", "pie cake", 0));
        assert!(speech_matches("whatever", "*", 0));
    }

    #[test]
    fn command_matching_modes() {
        assert!(match_command_trig("pull", "pull", CommandMatch::Exact));
        assert!(!match_command_trig("pul", "pull", CommandMatch::Exact));
        assert!(match_command_trig("pul", "pull", CommandMatch::Abbrev));
        assert!(!match_command_trig("pull", "pull", CommandMatch::Abbrev));
        assert!(match_command_trig("yank", "pull yank tug", CommandMatch::Exact));
        assert!(!match_command_trig("ta", "pull tug", CommandMatch::Abbrev));
        assert!(match_command_trig("anything", "*", CommandMatch::Exact));
    }
}
