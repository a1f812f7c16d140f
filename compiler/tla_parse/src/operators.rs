//! Static operator tables.
//!
//! Operators come in all shapes but follow a consistent set of rules, so
//! they are described as data consulted by one generic precedence algorithm
//! rather than as per-operator grammar rules. Each operator carries an
//! inclusive precedence *range*: a token is legal at every level within its
//! range, which is how `-` can be a tight unary prefix and a mid-strength
//! binary infix at once. Not every infix operator associates; unbracketed
//! repetition is only accepted for the left-associative subset.
//!
//! The tables are process-wide, read-only data.

/// A prefix operator with its inclusive precedence range.
pub(crate) struct PrefixOp {
    pub token: &'static str,
    pub low: u8,
    pub high: u8,
}

/// An infix operator with its inclusive precedence range and associativity.
pub(crate) struct InfixOp {
    pub token: &'static str,
    pub low: u8,
    pub high: u8,
    pub left_assoc: bool,
}

/// A postfix operator with its precedence.
pub(crate) struct PostfixOp {
    pub token: &'static str,
    pub precedence: u8,
}

const fn prefix(token: &'static str, low: u8, high: u8) -> PrefixOp {
    PrefixOp { token, low, high }
}

const fn infix(token: &'static str, low: u8, high: u8) -> InfixOp {
    InfixOp {
        token,
        low,
        high,
        left_assoc: false,
    }
}

const fn infix_left(token: &'static str, low: u8, high: u8) -> InfixOp {
    InfixOp {
        token,
        low,
        high,
        left_assoc: true,
    }
}

pub(crate) const PREFIX_OPERATORS: &[PrefixOp] = &[
    prefix("-", 12, 12),
    prefix("~", 4, 4),
    prefix("\\lnot", 4, 4),
    prefix("\\neg", 4, 4),
    prefix("[]", 4, 15),
    prefix("<>", 4, 15),
    prefix("DOMAIN", 9, 9),
    prefix("ENABLED", 4, 15),
    prefix("SUBSET", 8, 8),
    prefix("UNCHANGED", 4, 15),
    prefix("UNION", 8, 8),
];

pub(crate) const INFIX_OPERATORS: &[InfixOp] = &[
    // non-alpha
    infix("!!", 9, 13),
    infix("#", 5, 5),
    infix_left("##", 9, 13),
    infix_left("$", 9, 13),
    infix_left("$$", 9, 13),
    infix("%", 10, 11),
    infix_left("%%", 10, 11),
    infix_left("&", 13, 13),
    infix_left("&&", 13, 13),
    infix("(+)", 10, 10),
    infix("(-)", 11, 11),
    infix("(.)", 13, 13),
    infix("(/)", 13, 13),
    infix("(\\X)", 13, 13),
    infix_left("*", 13, 13),
    infix_left("**", 13, 13),
    infix_left("+", 10, 10),
    infix_left("++", 10, 10),
    infix_left("-", 11, 11),
    infix("-+->", 2, 2),
    infix_left("--", 11, 11),
    infix("-|", 5, 5),
    infix("..", 9, 9),
    infix("...", 9, 9),
    infix("/", 13, 13),
    infix("//", 13, 13),
    infix("/=", 5, 5),
    infix_left("/\\", 3, 3),
    infix("::=", 5, 5),
    infix(":=", 5, 5),
    infix(":>", 7, 7),
    infix("<", 5, 5),
    infix("<:", 7, 7),
    infix("<=", 5, 5),
    infix("<=>", 5, 5),
    infix("=", 5, 5),
    infix("=<", 5, 5),
    infix("=>", 1, 1),
    infix("=|", 5, 5),
    infix(">", 5, 5),
    infix(">=", 5, 5),
    infix("?", 5, 5),
    infix_left("??", 9, 13),
    infix_left("@@", 6, 6),
    infix("\\", 8, 8),
    infix_left("\\/", 3, 3),
    infix("^", 14, 14),
    infix("^^", 14, 14),
    infix_left("|", 10, 11),
    infix("|-", 5, 5),
    infix("|=", 5, 5),
    infix_left("||", 10, 11),
    infix("~>", 2, 2),
    infix_left(".", 17, 17),
    // alpha
    infix("\\approx", 5, 5),
    infix("\\geq", 5, 5),
    infix("\\oslash", 13, 13),
    infix("\\sqsupseteq", 5, 5),
    infix("\\asymp", 5, 5),
    infix("\\gg", 5, 5),
    infix_left("\\otimes", 13, 13),
    infix_left("\\star", 13, 13),
    infix("\\bigcirc", 13, 13),
    infix("\\in", 5, 5),
    infix("\\notin", 5, 5),
    infix("\\prec", 5, 5),
    infix("\\subset", 5, 5),
    infix_left("\\bullet", 13, 13),
    infix("\\intersect", 8, 8),
    infix("\\preceq", 5, 5),
    infix("\\subseteq", 5, 5),
    infix_left("\\cap", 8, 8),
    infix("\\land", 3, 3),
    infix("\\propto", 5, 5),
    infix("\\succ", 5, 5),
    infix_left("\\cdot", 5, 14),
    infix("\\leq", 5, 5),
    infix("\\sim", 5, 5),
    infix("\\succeq", 5, 5),
    infix_left("\\circ", 13, 13),
    infix("\\ll", 5, 5),
    infix("\\simeq", 5, 5),
    infix("\\supset", 5, 5),
    infix("\\cong", 5, 5),
    infix("\\lor", 3, 3),
    infix_left("\\sqcap", 9, 13),
    infix("\\supseteq", 5, 5),
    infix_left("\\cup", 8, 8),
    infix_left("\\o", 13, 13),
    infix_left("\\sqcup", 9, 13),
    infix("\\union", 8, 8),
    infix("\\div", 13, 13),
    infix_left("\\odot", 13, 13),
    infix("\\sqsubset", 5, 5),
    infix_left("\\uplus", 9, 13),
    infix("\\doteq", 5, 5),
    infix_left("\\ominus", 11, 11),
    infix("\\sqsubseteq", 5, 5),
    infix("\\wr", 9, 14),
    infix("\\equiv", 2, 2),
    infix_left("\\oplus", 10, 10),
    infix("\\sqsupset", 5, 5),
];

pub(crate) const POSTFIX_OPERATORS: &[PostfixOp] = &[
    PostfixOp {
        token: "^+",
        precedence: 15,
    },
    PostfixOp {
        token: "^*",
        precedence: 15,
    },
    PostfixOp {
        token: "^#",
        precedence: 15,
    },
    PostfixOp {
        token: "'",
        precedence: 15,
    },
];

/// All prefix operator tokens.
pub(crate) fn prefix_tokens() -> Vec<&'static str> {
    PREFIX_OPERATORS.iter().map(|op| op.token).collect()
}

/// All infix operator tokens.
pub(crate) fn infix_tokens() -> Vec<&'static str> {
    INFIX_OPERATORS.iter().map(|op| op.token).collect()
}

/// All postfix operator tokens.
pub(crate) fn postfix_tokens() -> Vec<&'static str> {
    POSTFIX_OPERATORS.iter().map(|op| op.token).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_are_well_formed() {
        for op in PREFIX_OPERATORS {
            assert!(op.low <= op.high, "prefix {} range inverted", op.token);
            assert!((1..=17).contains(&op.low) && (1..=17).contains(&op.high));
        }
        for op in INFIX_OPERATORS {
            assert!(op.low <= op.high, "infix {} range inverted", op.token);
            assert!((1..=17).contains(&op.low) && (1..=17).contains(&op.high));
        }
        for op in POSTFIX_OPERATORS {
            assert!((1..=17).contains(&op.precedence));
        }
    }

    #[test]
    fn ranged_tokens_span_levels() {
        // `-` is a prefix at 12 and an infix at 11: one token, two classes
        let minus_prefix = PREFIX_OPERATORS.iter().find(|op| op.token == "-").unwrap();
        let minus_infix = INFIX_OPERATORS.iter().find(|op| op.token == "-").unwrap();
        assert_eq!((minus_prefix.low, minus_prefix.high), (12, 12));
        assert_eq!((minus_infix.low, minus_infix.high), (11, 11));

        // genuinely ranged operators
        let box_op = PREFIX_OPERATORS.iter().find(|op| op.token == "[]").unwrap();
        assert_eq!((box_op.low, box_op.high), (4, 15));
        let cdot = INFIX_OPERATORS.iter().find(|op| op.token == "\\cdot").unwrap();
        assert_eq!((cdot.low, cdot.high), (5, 14));
        assert!(cdot.left_assoc);
    }

    #[test]
    fn dot_is_the_tightest_infix() {
        let dot = INFIX_OPERATORS.iter().find(|op| op.token == ".").unwrap();
        assert_eq!((dot.low, dot.high), (17, 17));
        assert!(dot.left_assoc);
        for op in INFIX_OPERATORS {
            assert!(op.high <= 17);
        }
    }

    #[test]
    fn no_duplicate_infix_tokens() {
        let mut tokens = infix_tokens();
        tokens.sort_unstable();
        let before = tokens.len();
        tokens.dedup();
        assert_eq!(before, tokens.len());
    }
}
