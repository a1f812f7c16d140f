//! Lexical grammar: whitespace and comments, identifiers, strings, numbers,
//! module delimiters, and the token helpers every grammar rule builds on.
//!
//! The engine is scannerless, so "tokens" are just small grammars. Each
//! token helper skips leading whitespace/comments and then checks the
//! ambient minimum column, which keeps the indentation rule in one place.
//!
//! Word-like tokens (ending in an ASCII letter: reserved words and the
//! `\name` operators) refuse to match when an identifier character follows,
//! so `IFx` is an identifier and `\intersect` is never read as `\in`.

use once_cell::sync::Lazy;
use regex::Regex;
use tla_ir::{Ident, NumberBase};

use crate::combinator::{
    check_min_column, choice, match_pattern, match_string, reject, repeat, scan_until, Grammar,
    Recursive,
};

/// The reserved words of the language. None of these is a legal identifier.
pub(crate) const RESERVED_WORDS: &[&str] = &[
    "ASSUME",
    "ASSUMPTION",
    "AXIOM",
    "CASE",
    "CHOOSE",
    "CONSTANT",
    "CONSTANTS",
    "DOMAIN",
    "ELSE",
    "ENABLED",
    "EXCEPT",
    "EXTENDS",
    "IF",
    "IN",
    "INSTANCE",
    "LET",
    "LOCAL",
    "MODULE",
    "OTHER",
    "SF_",
    "SUBSET",
    "THEN",
    "THEOREM",
    "UNCHANGED",
    "UNION",
    "VARIABLE",
    "VARIABLES",
    "WF_",
    "WITH",
];

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s+").expect("whitespace pattern"));

// Any word string containing at least one letter: the prefix before the
// first letter can only consist of digits and underscores.
static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9_]*[A-Za-z][A-Za-z0-9_]*").expect("identifier pattern"));

static IDENT_CHAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]").expect("identifier character pattern"));

static STRING_CHAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^[a-zA-Z0-9~@#$%^&*_ \-+=(){}\[\]<>|/,.?:;`']"#).expect("string char pattern")
});

static NUMBER_INT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+").expect("int pattern"));
static NUMBER_FLOAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d*\.\d+").expect("float pattern"));
static NUMBER_BIN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\\[bB][01]+").expect("binary pattern"));
static NUMBER_OCT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\\[oO][0-7]+").expect("octal pattern"));
static NUMBER_HEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\\[hH][0-9a-fA-F]+").expect("hex pattern"));

static DASHES: Lazy<Regex> = Lazy::new(|| Regex::new(r"^----+").expect("dashes pattern"));
static EQUALS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^====+").expect("equals pattern"));

static BEGIN_TRANSLATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\\\*+\s+BEGIN TRANSLATION[ \t]*(?m:$)").expect("translation marker pattern")
});

/// One or more whitespace characters.
pub(crate) fn match_whitespace() -> Grammar<()> {
    match_pattern("whitespace", &WHITESPACE).map(|_| ())
}

/// A line comment: `\*` to the end of the line.
pub(crate) fn match_line_comment() -> Grammar<()> {
    match_string("\\*")
        .then(scan_until("end of line", &["\n"], true))
        .map(|_| ())
}

/// A nestable block comment: anything between balanced `(*` and `*)`.
pub(crate) fn match_block_comment() -> Grammar<()> {
    let comment: Recursive<()> = Recursive::declare();
    let text = || scan_until("comment text", &["(*", "*)"], true);
    comment.define(
        match_string("(*")
            .then(text())
            .then(repeat(comment.grammar().then(text()).map(|_| ())))
            .then(match_string("*)"))
            .map(|_| ()),
    );
    comment.grammar()
}

/// Either comment form.
pub(crate) fn match_comment() -> Grammar<()> {
    choice(vec![match_block_comment(), match_line_comment()])
}

/// Accept and discard any run of whitespace and comments.
pub(crate) fn skip_whitespace_and_comments() -> Grammar<()> {
    repeat(choice(vec![match_whitespace(), match_comment()])).map(|_| ())
}

/// A raw identifier: a word containing a letter, excluding reserved words
/// and the `WF_`/`SF_` fairness prefixes.
pub(crate) fn match_identifier() -> Grammar<String> {
    match_pattern("an identifier", &IDENTIFIER).filter(
        |name| {
            !name.starts_with("WF_")
                && !name.starts_with("SF_")
                && !RESERVED_WORDS.contains(&name.as_str())
        },
        "an identifier",
    )
}

/// A string literal with escapes `\" \\ \t \n \f \r` resolved.
pub(crate) fn match_tla_string() -> Grammar<String> {
    let piece = choice(vec![
        match_string("\\\"").map(|()| "\"".to_string()),
        match_string("\\\\").map(|()| "\\".to_string()),
        match_string("\\t").map(|()| "\t".to_string()),
        match_string("\\n").map(|()| "\n".to_string()),
        match_string("\\f").map(|()| "\u{c}".to_string()),
        match_string("\\r").map(|()| "\r".to_string()),
        reject(match_string("\\")).ignore_then(match_pattern("a string character", &STRING_CHAR)),
    ]);
    match_string("\"")
        .ignore_then(repeat(piece))
        .then_ignore(match_string("\""))
        .map(|pieces| pieces.concat())
}

/// Any numeric literal form. The stored text is stripped of the base
/// prefix. The float form is tried before the integer form so `3.14` is not
/// read as `3` followed by a stray `.14`.
pub(crate) fn match_number() -> Grammar<(String, NumberBase)> {
    choice(vec![
        match_pattern("a number", &NUMBER_FLOAT).map(|text| (text, NumberBase::Decimal)),
        match_pattern("a number", &NUMBER_INT).map(|text| (text, NumberBase::Decimal)),
        match_pattern("a number", &NUMBER_BIN)
            .map(|text| (text[2..].to_string(), NumberBase::Binary)),
        match_pattern("a number", &NUMBER_OCT)
            .map(|text| (text[2..].to_string(), NumberBase::Octal)),
        match_pattern("a number", &NUMBER_HEX)
            .map(|text| (text[2..].to_string(), NumberBase::Hexadecimal)),
    ])
}

fn word_guarded(token: &'static str) -> Grammar<()> {
    let ends_in_letter = token
        .chars()
        .next_back()
        .is_some_and(|c| c.is_ascii_alphabetic());
    if ends_in_letter {
        match_string(token).then_ignore(reject(match_pattern(
            "an identifier character",
            &IDENT_CHAR,
        )))
    } else {
        match_string(token)
    }
}

/// Accept the given token at or beyond the minimum column, skipping any
/// leading whitespace and comments.
pub(crate) fn tla_token(token: &'static str) -> Grammar<()> {
    skip_whitespace_and_comments().ignore_then(check_min_column(word_guarded(token)))
}

/// Accept any of the given tokens (longest first) at or beyond the minimum
/// column, skipping any leading whitespace and comments.
pub(crate) fn tla_token_one_of(options: &[&'static str]) -> Grammar<&'static str> {
    let mut sorted: Vec<&'static str> = options.to_vec();
    sorted.sort_by(|a, b| b.len().cmp(&a.len()));
    let branches = sorted
        .into_iter()
        .map(|option| word_guarded(option).map(move |()| option))
        .collect();
    skip_whitespace_and_comments().ignore_then(check_min_column(choice(branches)))
}

/// Accept an identifier token.
pub(crate) fn tla_identifier() -> Grammar<Ident> {
    skip_whitespace_and_comments()
        .ignore_then(check_min_column(match_identifier()))
        .map_with_span(|name, span| Ident::new(span, name))
}

/// Accept a string literal token.
pub(crate) fn tla_string_literal() -> Grammar<String> {
    skip_whitespace_and_comments().ignore_then(check_min_column(match_tla_string()))
}

/// Accept a number token. Numbers are exempt from the minimum-column
/// check.
pub(crate) fn tla_number() -> Grammar<(String, NumberBase)> {
    skip_whitespace_and_comments().ignore_then(match_number())
}

/// `element ("," element)*`.
pub(crate) fn comma_list<T: 'static>(element: Grammar<T>) -> Grammar<Vec<T>> {
    element
        .clone()
        .then(repeat(tla_token(",").ignore_then(element)))
        .map(|(first, rest)| {
            let mut items = Vec::with_capacity(1 + rest.len());
            items.push(first);
            items.extend(rest);
            items
        })
}

/// Four or more dashes, after any whitespace/comments.
pub(crate) fn parse_4_dashes_or_more() -> Grammar<()> {
    skip_whitespace_and_comments()
        .ignore_then(match_pattern("a ---- module delimiter", &DASHES))
        .map(|_| ())
}

/// Four or more equals signs, after any whitespace/comments.
pub(crate) fn parse_4_equals_or_more() -> Grammar<()> {
    skip_whitespace_and_comments()
        .ignore_then(match_pattern("a ==== module terminator", &EQUALS))
        .map(|_| ())
}

/// Consume anything up to (not including) the next module start marker.
/// Fails if no marker follows.
pub(crate) fn find_module_start() -> Grammar<()> {
    scan_until("a ---- module start marker", &["----"], false)
}

/// Consume anything up to the next module start marker or the end of input.
pub(crate) fn consume_after_module_end() -> Grammar<()> {
    scan_until("trailing text", &["----"], true)
}

/// The `\* BEGIN TRANSLATION` marker, after any whitespace and comments
/// that are not themselves the marker.
pub(crate) fn parse_start_translation() -> Grammar<()> {
    repeat(choice(vec![
        match_whitespace(),
        match_block_comment(),
        reject(match_pattern("translation marker", &BEGIN_TRANSLATION))
            .ignore_then(match_line_comment()),
    ]))
    .ignore_then(match_pattern("translation marker", &BEGIN_TRANSLATION))
    .map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinator::Session;
    use crate::context::ParseContext;
    use crate::cursor::Cursor;
    use pretty_assertions::assert_eq;

    fn accept<T: 'static>(grammar: &Grammar<T>, source: &str) -> Option<(T, usize)> {
        let mut session = Session::new(source);
        grammar
            .run(&mut session, Cursor::start(), ParseContext::new())
            .ok()
            .map(|(value, end)| (value.value, end.offset()))
    }

    #[test]
    fn identifiers_need_a_letter() {
        let g = match_identifier();
        assert_eq!(accept(&g, "abc_1 rest"), Some(("abc_1".to_string(), 5)));
        assert_eq!(accept(&g, "_x2"), Some(("_x2".to_string(), 3)));
        assert!(accept(&g, "123").is_none());
        assert!(accept(&g, "_1_").is_none());
    }

    #[test]
    fn identifiers_exclude_reserved_and_fairness_prefixes() {
        let g = match_identifier();
        assert!(accept(&g, "MODULE").is_none());
        assert!(accept(&g, "WF_vars").is_none());
        assert!(accept(&g, "SF_x").is_none());
        // reserved words embedded in longer words are fine
        assert_eq!(accept(&g, "IFx"), Some(("IFx".to_string(), 3)));
    }

    #[test]
    fn string_escapes_resolve() {
        let g = match_tla_string();
        assert_eq!(
            accept(&g, r#""a\"b\\c\td""#),
            Some(("a\"b\\c\td".to_string(), 12))
        );
        assert_eq!(accept(&g, r#""""#), Some((String::new(), 2)));
        assert!(accept(&g, r#""unterminated"#).is_none());
    }

    #[test]
    fn number_forms_and_bases() {
        let g = match_number();
        assert_eq!(
            accept(&g, "3.14"),
            Some((("3.14".to_string(), NumberBase::Decimal), 4))
        );
        assert_eq!(
            accept(&g, "42"),
            Some((("42".to_string(), NumberBase::Decimal), 2))
        );
        assert_eq!(
            accept(&g, "\\b101"),
            Some((("101".to_string(), NumberBase::Binary), 5))
        );
        assert_eq!(
            accept(&g, "\\O777"),
            Some((("777".to_string(), NumberBase::Octal), 5))
        );
        assert_eq!(
            accept(&g, "\\hBEEF"),
            Some((("BEEF".to_string(), NumberBase::Hexadecimal), 6))
        );
    }

    #[test]
    fn block_comments_nest() {
        let g = match_block_comment();
        assert_eq!(accept(&g, "(* a (* b *) c *)x"), Some(((), 17)));
        assert!(accept(&g, "(* open (* inner *)").is_none());
    }

    #[test]
    fn token_skips_whitespace_and_comments() {
        let g = tla_token("==");
        assert_eq!(accept(&g, "  (* def *) == 1"), Some(((), 14)));
    }

    #[test]
    fn word_tokens_respect_boundaries() {
        assert!(accept(&tla_token("IF"), "IFx").is_none());
        assert!(accept(&tla_token("\\in"), "\\intersect S").is_none());
        assert_eq!(accept(&tla_token("\\in"), "\\in S"), Some(((), 3)));
        // WF_ glues onto the following identifier by design
        assert_eq!(accept(&tla_token("WF_"), "WF_vars"), Some(((), 3)));
    }

    #[test]
    fn one_of_prefers_longest() {
        let g = tla_token_one_of(&["VARIABLE", "VARIABLES"]);
        assert_eq!(accept(&g, "VARIABLES x"), Some(("VARIABLES", 9)));
        assert_eq!(accept(&g, "VARIABLE x"), Some(("VARIABLE", 8)));
    }

    #[test]
    fn comma_lists_collect_in_order() {
        let g = comma_list(tla_identifier());
        let (ids, _) = accept(&g, "a, b ,c").expect("list");
        let names: Vec<_> = ids.into_iter().map(|id| id.name).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn module_delimiters_want_four_or_more() {
        assert!(accept(&parse_4_dashes_or_more(), "---").is_none());
        assert_eq!(accept(&parse_4_dashes_or_more(), "------"), Some(((), 6)));
        assert_eq!(accept(&parse_4_equals_or_more(), "===="), Some(((), 4)));
    }

    #[test]
    fn translation_marker_is_found_past_ordinary_comments() {
        let g = parse_start_translation();
        let source = "  \\* note\n(* block *)\n\\* BEGIN TRANSLATION\nrest";
        let (_, end) = accept(&g, source).expect("marker");
        assert_eq!(&source[end - 11..end], "TRANSLATION");
    }
}
