//! The grammar combinator algebra and its backtracking interpreter.
//!
//! A [`Grammar<T>`] is an immutable description of how to recognize and
//! transform input. Grammars are built once, form a read-only graph (cyclic
//! through [`Recursive`] forward references), and are shared across parse
//! calls; evaluation threads a [`Cursor`] and a [`ParseContext`] through the
//! graph and owns all mutable state in a per-call [`Session`].
//!
//! Failures are values, never panics: a rule either returns the parsed
//! [`Located`] value with the cursor after it, or a [`Mismatch`] marker. The
//! session retains the single furthest-position failure for diagnostics, so
//! alternation can stay cheap.
//!
//! # Cut scoping
//!
//! `cut(g)` marks the session as *committed* when `g` succeeds. An
//! alternation branch (or repetition iteration) that fails while committed
//! propagates the failure instead of trying its siblings; a branch that
//! completes successfully spends the commitments made inside it. Negative
//! lookahead ([`reject`]) runs its sub-grammar with the commitment flag and
//! the furthest-failure slot saved and restored, so speculation leaves no
//! trace.

use std::any::Any;
use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};

use regex::Regex;
use rustc_hash::FxHashMap;
use tla_diagnostic::ErrorCode;
use tla_ir::{Located, Span};
use tracing::trace;

use crate::context::ParseContext;
use crate::cursor::Cursor;
use crate::error::ParseFailure;
use crate::stack::ensure_sufficient_stack;

/// Marker for a failed evaluation step. The failure's span, expectation and
/// code live in the session's furthest-failure slot.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Mismatch;

/// Outcome of one evaluation step.
pub(crate) type Step<T> = Result<(Located<T>, Cursor), Mismatch>;

/// The furthest failure recorded during a parse attempt.
#[derive(Clone, Debug)]
struct FurthestFailure {
    span: Span,
    expected: String,
    code: ErrorCode,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
struct MemoKey {
    grammar: u32,
    offset: u32,
    min_column: i32,
}

struct MemoEntry {
    crossed_cut: bool,
    outcome: Result<(Rc<dyn Any>, Cursor), ()>,
}

/// Per-call interpreter state: the packrat cache, the furthest failure, and
/// the cut flag. Owned exclusively by one top-level parse call.
pub(crate) struct Session<'src> {
    source: &'src str,
    memo: FxHashMap<MemoKey, MemoEntry>,
    furthest: Option<FurthestFailure>,
    cut: bool,
}

impl<'src> Session<'src> {
    pub(crate) fn new(source: &'src str) -> Session<'src> {
        Session {
            source,
            memo: FxHashMap::default(),
            furthest: None,
            cut: false,
        }
    }

    #[inline]
    pub(crate) fn source(&self) -> &'src str {
        self.source
    }

    /// Record a failure if it is the furthest seen, and return the marker.
    ///
    /// The expectation text is built lazily so the hot path does not
    /// allocate for failures that do not improve on the furthest. Ties go
    /// to the later recording: at one position the last failure belongs to
    /// the most-committed parse (the `ELSE` of an IF already consumed, the
    /// `)` of an open group), which is the most specific description.
    pub(crate) fn fail(
        &mut self,
        span: Span,
        code: ErrorCode,
        expected: impl FnOnce() -> String,
    ) -> Mismatch {
        let improves = self
            .furthest
            .as_ref()
            .map_or(true, |f| span.start.offset >= f.span.start.offset);
        if improves {
            self.furthest = Some(FurthestFailure {
                span,
                expected: expected(),
                code,
            });
        }
        Mismatch
    }

    /// Convert the retained failure into the reportable error value.
    ///
    /// A still-set cut flag means the parse was aborted by a structural
    /// failure, which is reported as such regardless of the failing
    /// primitive's own class.
    pub(crate) fn into_failure(self) -> ParseFailure {
        let structural = self.cut;
        match self.furthest {
            Some(f) => ParseFailure {
                span: f.span,
                expected: f.expected,
                code: if structural { ErrorCode::E1004 } else { f.code },
            },
            None => ParseFailure {
                span: Span::DUMMY,
                expected: "valid input".to_string(),
                code: ErrorCode::E1003,
            },
        }
    }
}

static NEXT_GRAMMAR_ID: AtomicU32 = AtomicU32::new(0);

fn fresh_id() -> u32 {
    NEXT_GRAMMAR_ID.fetch_add(1, Ordering::Relaxed)
}

/// One rule of the grammar algebra: how to evaluate a node against the
/// session, a cursor, and a context.
trait Rule<T> {
    fn run(&self, session: &mut Session<'_>, at: Cursor, ctx: ParseContext) -> Step<T>;
}

/// An immutable description of how to parse a `T`.
///
/// Handles are cheap to clone and share the underlying node. The identity
/// is stable per node and is what the memoization cache keys on, so clones
/// of one handle share cache lines.
pub struct Grammar<T> {
    id: u32,
    rule: Arc<dyn Rule<T> + Send + Sync>,
}

impl<T> Clone for Grammar<T> {
    fn clone(&self) -> Grammar<T> {
        Grammar {
            id: self.id,
            rule: Arc::clone(&self.rule),
        }
    }
}

impl<T: 'static> Grammar<T> {
    fn from_rule(rule: impl Rule<T> + Send + Sync + 'static) -> Grammar<T> {
        Grammar {
            id: fresh_id(),
            rule: Arc::new(rule),
        }
    }

    #[inline]
    pub(crate) fn id(&self) -> u32 {
        self.id
    }

    #[inline]
    pub(crate) fn run(&self, session: &mut Session<'_>, at: Cursor, ctx: ParseContext) -> Step<T> {
        self.rule.run(session, at, ctx)
    }

    /// Sequence: parse `self`, then `other`; the value is the pair and the
    /// span is the union of both parts.
    pub fn then<U: 'static>(self, other: Grammar<U>) -> Grammar<(T, U)> {
        Grammar::from_rule(Then {
            first: self,
            second: other,
        })
    }

    /// Sequence keeping only the left value; the right part consumes input
    /// but contributes neither value nor span.
    pub fn then_ignore<U: 'static>(self, other: Grammar<U>) -> Grammar<T> {
        Grammar::from_rule(ThenIgnore {
            first: self,
            second: other,
        })
    }

    /// Sequence keeping only the right value; the left part consumes input
    /// but contributes neither value nor span.
    pub fn ignore_then<U: 'static>(self, other: Grammar<U>) -> Grammar<U> {
        Grammar::from_rule(IgnoreThen {
            first: self,
            second: other,
        })
    }

    /// Dependent sequence: like [`Grammar::then`], but the second part runs
    /// under a context computed from the first part's located value.
    pub fn then_with_context<U: 'static>(
        self,
        other: Grammar<U>,
        bind: impl Fn(&Located<T>, ParseContext) -> ParseContext + Send + Sync + 'static,
    ) -> Grammar<(T, U)> {
        Grammar::from_rule(ThenWithContext {
            first: self,
            second: other,
            bind: Arc::new(bind),
        })
    }

    /// Transform the parsed value, keeping its span.
    pub fn map<U: 'static>(self, f: impl Fn(T) -> U + Send + Sync + 'static) -> Grammar<U> {
        Grammar::from_rule(Map {
            inner: self,
            f: Arc::new(f),
        })
    }

    /// Transform the parsed value together with its span.
    pub fn map_with_span<U: 'static>(
        self,
        f: impl Fn(T, Span) -> U + Send + Sync + 'static,
    ) -> Grammar<U> {
        Grammar::from_rule(MapWithSpan {
            inner: self,
            f: Arc::new(f),
        })
    }

    /// Reify the span into the value.
    pub fn spanned(self) -> Grammar<Located<T>> {
        self.map_with_span(Located::new)
    }

    /// Accept the parsed value only if the predicate holds; otherwise fail
    /// with the given expectation at the value's span.
    pub fn filter(
        self,
        pred: impl Fn(&T) -> bool + Send + Sync + 'static,
        expected: &'static str,
    ) -> Grammar<T> {
        Grammar::from_rule(Filter {
            inner: self,
            pred: Arc::new(pred),
            expected,
        })
    }

    /// Evaluate under a context derived from the ambient one for the
    /// dynamic extent of this grammar.
    pub fn with_context(
        self,
        f: impl Fn(ParseContext) -> ParseContext + Send + Sync + 'static,
    ) -> Grammar<T> {
        Grammar::from_rule(WithContext {
            inner: self,
            f: Arc::new(f),
        })
    }
}

// ---------------------------------------------------------------------------
// Primitive matchers
// ---------------------------------------------------------------------------

struct MatchString {
    text: &'static str,
}

impl Rule<()> for MatchString {
    fn run(&self, session: &mut Session<'_>, at: Cursor, _ctx: ParseContext) -> Step<()> {
        if at.rest(session.source()).starts_with(self.text) {
            let end = at.advanced_over(self.text);
            Ok((Located::new((), Span::new(at.pos(), end.pos())), end))
        } else {
            let text = self.text;
            Err(session.fail(Span::empty_at(at.pos()), ErrorCode::E1001, || {
                format!("`{text}`")
            }))
        }
    }
}

/// Match an exact string.
pub fn match_string(text: &'static str) -> Grammar<()> {
    Grammar::from_rule(MatchString { text })
}

struct MatchPattern {
    name: &'static str,
    pattern: &'static Regex,
}

impl Rule<String> for MatchPattern {
    fn run(&self, session: &mut Session<'_>, at: Cursor, _ctx: ParseContext) -> Step<String> {
        let rest = at.rest(session.source());
        match self.pattern.find(rest) {
            Some(found) if found.start() == 0 => {
                let matched = &rest[..found.end()];
                let end = at.advanced_over(matched);
                Ok((
                    Located::new(matched.to_string(), Span::new(at.pos(), end.pos())),
                    end,
                ))
            }
            _ => {
                let name = self.name;
                Err(session.fail(Span::empty_at(at.pos()), ErrorCode::E1001, || {
                    name.to_string()
                }))
            }
        }
    }
}

/// Match a regex pattern anchored at the current position. The pattern must
/// be written to anchor at the start of its haystack (`^...`).
pub fn match_pattern(name: &'static str, pattern: &'static Regex) -> Grammar<String> {
    Grammar::from_rule(MatchPattern { name, pattern })
}

struct ScanUntil {
    name: &'static str,
    markers: &'static [&'static str],
    eof_ok: bool,
}

impl Rule<()> for ScanUntil {
    fn run(&self, session: &mut Session<'_>, at: Cursor, _ctx: ParseContext) -> Step<()> {
        let rest = at.rest(session.source());
        let stop = self
            .markers
            .iter()
            .filter_map(|marker| rest.find(marker))
            .min();
        let consumed = match stop {
            Some(index) => &rest[..index],
            None if self.eof_ok => rest,
            None => {
                let name = self.name;
                return Err(session.fail(Span::empty_at(at.pos()), ErrorCode::E1001, || {
                    name.to_string()
                }));
            }
        };
        let end = at.advanced_over(consumed);
        Ok((Located::new((), Span::new(at.pos(), end.pos())), end))
    }
}

/// Consume the shortest prefix ending just before any of `markers` (or, if
/// `eof_ok`, the rest of the input when no marker occurs). The marker itself
/// is not consumed.
pub fn scan_until(
    name: &'static str,
    markers: &'static [&'static str],
    eof_ok: bool,
) -> Grammar<()> {
    Grammar::from_rule(ScanUntil {
        name,
        markers,
        eof_ok,
    })
}

struct Nop;

impl Rule<()> for Nop {
    fn run(&self, _session: &mut Session<'_>, at: Cursor, _ctx: ParseContext) -> Step<()> {
        Ok((Located::new((), Span::empty_at(at.pos())), at))
    }
}

/// Succeed without consuming anything.
pub fn nop() -> Grammar<()> {
    Grammar::from_rule(Nop)
}

struct Eof;

impl Rule<()> for Eof {
    fn run(&self, session: &mut Session<'_>, at: Cursor, _ctx: ParseContext) -> Step<()> {
        if at.is_at_end(session.source()) {
            Ok((Located::new((), Span::empty_at(at.pos())), at))
        } else {
            Err(session.fail(Span::empty_at(at.pos()), ErrorCode::E1001, || {
                "end of input".to_string()
            }))
        }
    }
}

/// Succeed only at the end of the input.
pub fn eof() -> Grammar<()> {
    Grammar::from_rule(Eof)
}

// ---------------------------------------------------------------------------
// Sequencing and transformation
// ---------------------------------------------------------------------------

struct Then<A, B> {
    first: Grammar<A>,
    second: Grammar<B>,
}

impl<A: 'static, B: 'static> Rule<(A, B)> for Then<A, B> {
    fn run(&self, session: &mut Session<'_>, at: Cursor, ctx: ParseContext) -> Step<(A, B)> {
        let (a, mid) = self.first.run(session, at, ctx)?;
        let (b, end) = self.second.run(session, mid, ctx)?;
        let span = a.span.merge(b.span);
        Ok((Located::new((a.value, b.value), span), end))
    }
}

struct ThenIgnore<A, B> {
    first: Grammar<A>,
    second: Grammar<B>,
}

impl<A: 'static, B: 'static> Rule<A> for ThenIgnore<A, B> {
    fn run(&self, session: &mut Session<'_>, at: Cursor, ctx: ParseContext) -> Step<A> {
        let (a, mid) = self.first.run(session, at, ctx)?;
        let (_b, end) = self.second.run(session, mid, ctx)?;
        Ok((a, end))
    }
}

struct IgnoreThen<A, B> {
    first: Grammar<A>,
    second: Grammar<B>,
}

impl<A: 'static, B: 'static> Rule<B> for IgnoreThen<A, B> {
    fn run(&self, session: &mut Session<'_>, at: Cursor, ctx: ParseContext) -> Step<B> {
        let (_a, mid) = self.first.run(session, at, ctx)?;
        let (b, end) = self.second.run(session, mid, ctx)?;
        Ok((b, end))
    }
}

type ContextBinder<A> = Arc<dyn Fn(&Located<A>, ParseContext) -> ParseContext + Send + Sync>;

struct ThenWithContext<A, B> {
    first: Grammar<A>,
    second: Grammar<B>,
    bind: ContextBinder<A>,
}

impl<A: 'static, B: 'static> Rule<(A, B)> for ThenWithContext<A, B> {
    fn run(&self, session: &mut Session<'_>, at: Cursor, ctx: ParseContext) -> Step<(A, B)> {
        let (a, mid) = self.first.run(session, at, ctx)?;
        let inner_ctx = (self.bind)(&a, ctx);
        let (b, end) = self.second.run(session, mid, inner_ctx)?;
        let span = a.span.merge(b.span);
        Ok((Located::new((a.value, b.value), span), end))
    }
}

struct Map<A, B> {
    inner: Grammar<A>,
    f: Arc<dyn Fn(A) -> B + Send + Sync>,
}

impl<A: 'static, B: 'static> Rule<B> for Map<A, B> {
    fn run(&self, session: &mut Session<'_>, at: Cursor, ctx: ParseContext) -> Step<B> {
        let (value, end) = self.inner.run(session, at, ctx)?;
        let span = value.span;
        Ok((Located::new((self.f)(value.value), span), end))
    }
}

struct MapWithSpan<A, B> {
    inner: Grammar<A>,
    f: Arc<dyn Fn(A, Span) -> B + Send + Sync>,
}

impl<A: 'static, B: 'static> Rule<B> for MapWithSpan<A, B> {
    fn run(&self, session: &mut Session<'_>, at: Cursor, ctx: ParseContext) -> Step<B> {
        let (value, end) = self.inner.run(session, at, ctx)?;
        let span = value.span;
        Ok((Located::new((self.f)(value.value, span), span), end))
    }
}

struct Filter<A> {
    inner: Grammar<A>,
    pred: Arc<dyn Fn(&A) -> bool + Send + Sync>,
    expected: &'static str,
}

impl<A: 'static> Rule<A> for Filter<A> {
    fn run(&self, session: &mut Session<'_>, at: Cursor, ctx: ParseContext) -> Step<A> {
        let (value, end) = self.inner.run(session, at, ctx)?;
        if (self.pred)(&value.value) {
            Ok((value, end))
        } else {
            let expected = self.expected;
            Err(session.fail(value.span, ErrorCode::E1001, || expected.to_string()))
        }
    }
}

struct WithContext<A> {
    inner: Grammar<A>,
    f: Arc<dyn Fn(ParseContext) -> ParseContext + Send + Sync>,
}

impl<A: 'static> Rule<A> for WithContext<A> {
    fn run(&self, session: &mut Session<'_>, at: Cursor, ctx: ParseContext) -> Step<A> {
        self.inner.run(session, at, (self.f)(ctx))
    }
}

// ---------------------------------------------------------------------------
// Alternation, repetition, commitment
// ---------------------------------------------------------------------------

struct Choice<T> {
    options: Vec<Grammar<T>>,
}

impl<T: 'static> Rule<T> for Choice<T> {
    fn run(&self, session: &mut Session<'_>, at: Cursor, ctx: ParseContext) -> Step<T> {
        if self.options.is_empty() {
            return Err(session.fail(Span::empty_at(at.pos()), ErrorCode::E1003, || {
                "a viable alternative".to_string()
            }));
        }
        let saved = session.cut;
        for option in &self.options {
            session.cut = false;
            match option.run(session, at, ctx) {
                Ok(success) => {
                    // commitments inside a completed branch are spent
                    session.cut = saved;
                    return Ok(success);
                }
                Err(mismatch) => {
                    if session.cut {
                        // structural failure: skip the remaining branches
                        // and leave the flag set for enclosing alternations
                        trace!(offset = at.offset(), "alternation aborted past cut");
                        return Err(mismatch);
                    }
                }
            }
        }
        session.cut = saved;
        Err(Mismatch)
    }
}

/// Ordered alternation: try each branch from the same position; first
/// success wins. See the module docs for the cut interaction.
pub fn choice<T: 'static>(options: Vec<Grammar<T>>) -> Grammar<T> {
    Grammar::from_rule(Choice { options })
}

struct Repeat<T> {
    item: Grammar<T>,
    min: usize,
}

impl<T: 'static> Rule<Vec<T>> for Repeat<T> {
    fn run(&self, session: &mut Session<'_>, at: Cursor, ctx: ParseContext) -> Step<Vec<T>> {
        let mut values = Vec::new();
        let mut span: Option<Span> = None;
        let mut cursor = at;
        let saved = session.cut;
        loop {
            session.cut = false;
            match self.item.run(session, cursor, ctx) {
                Ok((item, next)) => {
                    if next.offset() == cursor.offset() {
                        // zero-consumption success: stop to guarantee
                        // termination
                        break;
                    }
                    span = Some(span.map_or(item.span, |s| s.merge(item.span)));
                    values.push(item.value);
                    cursor = next;
                }
                Err(mismatch) => {
                    if session.cut {
                        return Err(mismatch);
                    }
                    break;
                }
            }
        }
        session.cut = saved;
        if values.len() < self.min {
            return Err(Mismatch);
        }
        let span = span.unwrap_or_else(|| Span::empty_at(at.pos()));
        Ok((Located::new(values, span), cursor))
    }
}

/// Zero-or-more repetition.
pub fn repeat<T: 'static>(item: Grammar<T>) -> Grammar<Vec<T>> {
    Grammar::from_rule(Repeat { item, min: 0 })
}

/// One-or-more repetition.
pub fn repeat1<T: 'static>(item: Grammar<T>) -> Grammar<Vec<T>> {
    Grammar::from_rule(Repeat { item, min: 1 })
}

struct Cut<T> {
    inner: Grammar<T>,
}

impl<T: 'static> Rule<T> for Cut<T> {
    fn run(&self, session: &mut Session<'_>, at: Cursor, ctx: ParseContext) -> Step<T> {
        let success = self.inner.run(session, at, ctx)?;
        session.cut = true;
        Ok(success)
    }
}

/// Commit point: once the wrapped grammar succeeds, a later failure in the
/// same alternation branch propagates instead of trying sibling branches.
pub fn cut<T: 'static>(inner: Grammar<T>) -> Grammar<T> {
    Grammar::from_rule(Cut { inner })
}

struct Reject<T> {
    inner: Grammar<T>,
}

impl<T: 'static> Rule<()> for Reject<T> {
    fn run(&self, session: &mut Session<'_>, at: Cursor, ctx: ParseContext) -> Step<()> {
        let saved_cut = session.cut;
        let saved_furthest = session.furthest.clone();
        let speculation = self.inner.run(session, at, ctx);
        session.cut = saved_cut;
        session.furthest = saved_furthest;
        match speculation {
            Ok(_) => Err(session.fail(Span::empty_at(at.pos()), ErrorCode::E1001, || {
                "unexpected input".to_string()
            })),
            Err(_) => Ok((Located::new((), Span::empty_at(at.pos())), at)),
        }
    }
}

/// Negative lookahead: succeed, consuming nothing, only if the wrapped
/// grammar fails here.
pub fn reject<T: 'static>(inner: Grammar<T>) -> Grammar<()> {
    Grammar::from_rule(Reject { inner })
}

struct CheckMinColumn<T> {
    inner: Grammar<T>,
}

impl<T: 'static> Rule<T> for CheckMinColumn<T> {
    fn run(&self, session: &mut Session<'_>, at: Cursor, ctx: ParseContext) -> Step<T> {
        let (value, end) = self.inner.run(session, at, ctx)?;
        if ctx.allows_column(value.span.start.column) {
            Ok((value, end))
        } else {
            let min = ctx.min_column();
            Err(session.fail(value.span, ErrorCode::E1002, move || {
                format!("content at or beyond column {min}")
            }))
        }
    }
}

/// Context-dependent selection: accept the match only if it starts at or
/// beyond the ambient minimum column.
pub fn check_min_column<T: 'static>(inner: Grammar<T>) -> Grammar<T> {
    Grammar::from_rule(CheckMinColumn { inner })
}

// ---------------------------------------------------------------------------
// Memoization
// ---------------------------------------------------------------------------

struct Memoize<T> {
    inner: Grammar<T>,
}

impl<T: Clone + 'static> Rule<T> for Memoize<T> {
    fn run(&self, session: &mut Session<'_>, at: Cursor, ctx: ParseContext) -> Step<T> {
        let key = MemoKey {
            grammar: self.inner.id(),
            offset: at.pos().offset,
            min_column: ctx.min_column(),
        };
        let mut replay = None;
        if let Some(entry) = session.memo.get(&key) {
            replay = match &entry.outcome {
                Ok((value, end)) => value
                    .downcast_ref::<Located<T>>()
                    .map(|found| (entry.crossed_cut, Some((found.clone(), *end)))),
                Err(()) => Some((entry.crossed_cut, None)),
            };
        }
        if let Some((crossed, outcome)) = replay {
            trace!(grammar = key.grammar, offset = key.offset, "memo hit");
            session.cut |= crossed;
            return match outcome {
                Some(success) => Ok(success),
                None => Err(Mismatch),
            };
        }

        let saved = session.cut;
        session.cut = false;
        let result = self.inner.run(session, at, ctx);
        let crossed = session.cut;
        session.cut = saved || crossed;
        match result {
            Ok((value, end)) => {
                session.memo.insert(
                    key,
                    MemoEntry {
                        crossed_cut: crossed,
                        outcome: Ok((Rc::new(value.clone()), end)),
                    },
                );
                Ok((value, end))
            }
            Err(mismatch) => {
                session.memo.insert(
                    key,
                    MemoEntry {
                        crossed_cut: crossed,
                        outcome: Err(()),
                    },
                );
                Err(mismatch)
            }
        }
    }
}

/// Packrat memoization: repeated attempts to parse the wrapped grammar at
/// the same (position, context) replay the first outcome. The cache key uses
/// the wrapped grammar's identity, so every call site wrapping the same
/// shared grammar hits one cache line.
pub fn memoize<T: Clone + 'static>(inner: Grammar<T>) -> Grammar<T> {
    Grammar::from_rule(Memoize { inner })
}

// ---------------------------------------------------------------------------
// Forward references
// ---------------------------------------------------------------------------

struct RecursiveRule<T> {
    cell: Arc<OnceLock<Grammar<T>>>,
}

impl<T: 'static> Rule<T> for RecursiveRule<T> {
    fn run(&self, session: &mut Session<'_>, at: Cursor, ctx: ParseContext) -> Step<T> {
        match self.cell.get() {
            Some(grammar) => ensure_sufficient_stack(|| grammar.run(session, at, ctx)),
            None => Err(session.fail(Span::empty_at(at.pos()), ErrorCode::E1003, || {
                "a resolved grammar reference".to_string()
            })),
        }
    }
}

/// A forward reference: declared first, resolved exactly once after
/// construction. This is what makes cyclic grammar graphs expressible.
///
/// All handles returned by [`Recursive::grammar`] share one identity, so
/// memoizing any of them shares a single cache line.
pub struct Recursive<T> {
    handle: Grammar<T>,
    cell: Arc<OnceLock<Grammar<T>>>,
}

impl<T: 'static> Recursive<T> {
    /// Declare an unresolved reference.
    pub fn declare() -> Recursive<T> {
        let cell = Arc::new(OnceLock::new());
        let handle = Grammar::from_rule(RecursiveRule {
            cell: Arc::clone(&cell),
        });
        Recursive { handle, cell }
    }

    /// Bind the referenced grammar. Binding twice is a construction bug; the
    /// first binding wins.
    pub fn define(&self, grammar: Grammar<T>) {
        if self.cell.set(grammar).is_err() {
            debug_assert!(false, "forward reference resolved twice");
        }
    }

    /// A grammar evaluating through the reference.
    pub fn grammar(&self) -> Grammar<T> {
        self.handle.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn run_ok<T: std::fmt::Debug + 'static>(grammar: &Grammar<T>, source: &str) -> (Located<T>, usize) {
        let mut session = Session::new(source);
        let (value, end) = grammar
            .run(&mut session, Cursor::start(), ParseContext::new())
            .unwrap_or_else(|_| panic!("expected {source:?} to parse"));
        (value, end.offset())
    }

    fn run_err<T: 'static>(grammar: &Grammar<T>, source: &str) -> ParseFailure {
        let mut session = Session::new(source);
        match grammar.run(&mut session, Cursor::start(), ParseContext::new()) {
            Ok(_) => panic!("expected {source:?} to fail"),
            Err(_) => session.into_failure(),
        }
    }

    #[test]
    fn match_string_consumes_prefix() {
        let g = match_string("ab");
        let (value, end) = run_ok(&g, "abc");
        assert_eq!(end, 2);
        assert_eq!(value.span.start.offset, 0);
        assert_eq!(value.span.end.offset, 2);
        let failure = run_err(&g, "ba");
        assert_eq!(failure.expected, "`ab`");
    }

    #[test]
    fn choice_returns_first_success() {
        let g = choice(vec![
            match_string("aa").map(|()| 1),
            match_string("a").map(|()| 2),
            match_string("ab").map(|()| 3),
        ]);
        // "ab" matches the second branch before the third is tried
        let (value, end) = run_ok(&g, "ab");
        assert_eq!(value.value, 2);
        assert_eq!(end, 1);
    }

    #[test]
    fn furthest_failure_wins() {
        let g = choice(vec![
            match_string("ab").then(match_string("cd")).map(|_| ()),
            match_string("x").map(|()| ()),
        ]);
        // first branch fails at offset 2, second at offset 0
        let failure = run_err(&g, "abXX");
        assert_eq!(failure.span.start.offset, 2);
        assert_eq!(failure.expected, "`cd`");
    }

    #[test]
    fn crossed_cut_skips_remaining_branches() {
        let g = choice(vec![
            cut(match_string("a")).then(match_string("b")).map(|_| 1),
            match_string("ax").map(|()| 2),
        ]);
        // without the cut, "ax" would match the second branch
        let failure = run_err(&g, "ax");
        assert_eq!(failure.code, ErrorCode::E1004);
        assert_eq!(failure.span.start.offset, 1);

        // a successful branch spends its commitment
        let ok = choice(vec![
            cut(match_string("a")).map(|()| 1),
            match_string("b").map(|()| 2),
        ]);
        let mut session = Session::new("a");
        let outcome = ok.run(&mut session, Cursor::start(), ParseContext::new());
        assert!(outcome.is_ok());
        assert!(!session.cut, "commitment must not leak out of a success");
    }

    #[test]
    fn uncrossed_cut_fails_soft() {
        // the cut's sub-grammar itself failing does not commit
        let g = choice(vec![
            match_string("x").ignore_then(cut(match_string("a"))).map(|()| 1),
            match_string("xb").map(|()| 2),
        ]);
        let (value, _) = run_ok(&g, "xb");
        assert_eq!(value.value, 2);
    }

    #[test]
    fn repetition_stops_on_soft_failure() {
        let g = repeat(match_string("ab").map(|()| ()));
        let (value, end) = run_ok(&g, "ababax");
        assert_eq!(value.value.len(), 2);
        assert_eq!(end, 4);
    }

    #[test]
    fn repetition_propagates_crossed_cut() {
        let item = cut(match_string("a")).then(match_string("b")).map(|_| ());
        let g = choice(vec![
            repeat(item).map(|items| items.len()),
            match_string("aba").map(|()| 99),
        ]);
        // second iteration commits on `a` then fails on `b`
        let failure = run_err(&g, "aba");
        assert_eq!(failure.code, ErrorCode::E1004);
    }

    #[test]
    fn repetition_terminates_on_zero_width_success() {
        let g = repeat(nop());
        let (value, end) = run_ok(&g, "rest");
        assert!(value.value.is_empty());
        assert_eq!(end, 0);
    }

    #[test]
    fn repeat1_requires_one_item() {
        let g = repeat1(match_string("a").map(|()| ()));
        assert_eq!(run_ok(&g, "aa").0.value.len(), 2);
        let _ = run_err(&g, "b");
    }

    #[test]
    fn reject_is_negative_lookahead() {
        let g = reject(match_string("ab")).ignore_then(match_string("a"));
        let (_, end) = run_ok(&g, "ax");
        assert_eq!(end, 1);
        let _ = run_err(&g, "ab");
    }

    #[test]
    fn reject_leaves_no_trace() {
        // speculation inside reject must not move the furthest failure or
        // commit a cut
        let speculative = cut(match_string("ab")).then(match_string("zz")).map(|_| ());
        let g = choice(vec![
            reject(speculative).ignore_then(match_string("ab")).map(|()| 1),
            match_string("ab").map(|()| 2),
        ]);
        let (value, _) = run_ok(&g, "abcd");
        assert_eq!(value.value, 1);
    }

    #[test]
    fn memoize_replays_first_outcome() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        let counted = match_string("ab").map(|()| {
            CALLS.fetch_add(1, Ordering::Relaxed);
        });
        let memoized = memoize(counted);
        // two branches both try the memoized grammar at offset 0
        let g = choice(vec![
            memoized.clone().then(match_string("X")).map(|_| 1),
            memoized.then(match_string("c")).map(|_| 2),
        ]);
        let (value, _) = run_ok(&g, "abc");
        assert_eq!(value.value, 2);
        assert_eq!(CALLS.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn memoize_key_includes_context() {
        let g = memoize(check_min_column(match_string("a")));
        let mut session = Session::new("a");
        let constrained = ParseContext::new().with_min_column(5);
        assert!(g.run(&mut session, Cursor::start(), constrained).is_err());
        // same position, different context: must not replay the failure
        assert!(g
            .run(&mut session, Cursor::start(), ParseContext::new())
            .is_ok());
    }

    #[test]
    fn min_column_check_reports_column_violation() {
        let g = check_min_column(match_string("a"));
        let mut session = Session::new("a");
        let ctx = ParseContext::new().with_min_column(3);
        assert!(g.run(&mut session, Cursor::start(), ctx).is_err());
        let failure = session.into_failure();
        assert_eq!(failure.code, ErrorCode::E1002);
        assert_eq!(failure.expected, "content at or beyond column 3");
    }

    #[test]
    fn dependent_context_rebinds_for_second_part() {
        // the second token must start at or beyond the column bound derived
        // from the first token
        let g = match_string("x").then_with_context(
            check_min_column(match_string("\ny")),
            |first, ctx| ctx.with_min_column(first.span.start.column as i32),
        );
        // "\ny" starts at column 1 and the bound is column 1
        assert!({
            let mut session = Session::new("x\ny");
            g.run(&mut session, Cursor::start(), ParseContext::new())
                .is_ok()
        });
    }

    #[test]
    fn recursive_grammar_ties_the_knot() {
        // nested parentheses around `a`
        let expr: Recursive<usize> = Recursive::declare();
        expr.define(choice(vec![
            match_string("(")
                .ignore_then(expr.grammar())
                .then_ignore(match_string(")"))
                .map(|depth| depth + 1),
            match_string("a").map(|()| 0),
        ]));
        let g = expr.grammar();
        assert_eq!(run_ok(&g, "(((a)))").0.value, 3);
    }

    #[test]
    fn sequence_spans_exclude_dropped_parts() {
        let g = match_string("(")
            .ignore_then(match_string("a"))
            .then_ignore(match_string(")"));
        let (value, end) = run_ok(&g, "(a)");
        assert_eq!(end, 3);
        assert_eq!(value.span.start.offset, 1);
        assert_eq!(value.span.end.offset, 2);
    }

    #[test]
    fn eof_only_matches_at_end() {
        let g = match_string("a").then_ignore(eof());
        assert!(run_ok(&g, "a").1 == 1);
        let failure = run_err(&g, "ab");
        assert_eq!(failure.expected, "end of input");
        assert_eq!(failure.span.start.offset, 1);
    }
}
