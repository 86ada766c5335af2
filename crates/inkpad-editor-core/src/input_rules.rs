//! Text-triggered replacements applied after typing.
//!
//! A rule fires when the text just before the caret ends with its trigger.
//! The session applies a matching rule as its own transaction right after
//! the typed text, so a single undo restores the literal input.

use smol_str::SmolStr;

use crate::error::{CommandError, Rejection};
use crate::model::{Child, Position, TextRun, inline};
use crate::transform::{Step, Transaction};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputRule {
    pub name: SmolStr,
    pub trigger: SmolStr,
    pub replacement: SmolStr,
}

impl InputRule {
    pub fn new(name: impl Into<SmolStr>, trigger: impl Into<SmolStr>, replacement: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            trigger: trigger.into(),
            replacement: replacement.into(),
        }
    }
}

/// The first rule whose trigger ends the text before the caret.
///
/// Rules never fire in plain-text blocks or inside inline code.
pub fn find_match<'a>(tr: &Transaction, rules: &'a [InputRule]) -> Option<&'a InputRule> {
    if !tr.selection().is_collapsed() {
        return None;
    }
    let caret = &tr.selection().head;
    let block = tr.doc().node_at(&caret.path)?;
    let kind = tr.schema().node_kind(block.kind()).ok()?;
    if !kind.allows_marks() {
        return None;
    }
    let (before, marks) = inline::text_before(block.content(), caret.offset);
    if marks.has("code") {
        return None;
    }
    rules
        .iter()
        .find(|rule| !rule.trigger.is_empty() && before.ends_with(rule.trigger.as_str()))
}

/// Replace the trigger before the caret with the rule's replacement,
/// keeping the marks of the replaced text.
pub fn apply(tr: &mut Transaction, rule: &InputRule) -> Result<(), CommandError> {
    let caret = tr.selection().head.clone();
    let len = rule.trigger.chars().count();
    let from = caret
        .offset
        .checked_sub(len)
        .ok_or_else(|| Rejection::NotFound(rule.trigger.clone()))?;
    let marks = tr
        .doc()
        .node_at(&caret.path)
        .map(|block| inline::text_before(block.content(), caret.offset).1)
        .unwrap_or_default();
    tr.step(Step::ReplaceInline {
        block: caret.path.clone(),
        from,
        to: caret.offset,
        content: vec![Child::Text(TextRun::new(rule.replacement.as_str(), marks))],
    })?;
    tr.set_caret(Position::new(caret.path, from + rule.replacement.chars().count()));
    tracing::debug!(target: "inkpad::command", rule = %rule.name, "input rule applied");
    Ok(())
}

/// Emoji shortcodes.
pub fn emoji_rules() -> Vec<InputRule> {
    [
        ("smile", "😊"),
        ("heart", "❤️"),
        ("thumbsup", "👍"),
        ("fire", "🔥"),
        ("rocket", "🚀"),
        ("eyes", "👀"),
        ("tada", "🎉"),
        ("thinking", "🤔"),
    ]
    .into_iter()
    .map(|(name, emoji)| InputRule::new(format!("emoji_{name}"), format!(":{name}:"), emoji))
    .collect()
}

/// Typographic replacements.
pub fn typography_rules() -> Vec<InputRule> {
    [
        ("em_dash", "--", "—"),
        ("ellipsis", "...", "…"),
        ("right_arrow", "->", "→"),
        ("left_arrow", "<-", "←"),
        ("copyright", "(c)", "©"),
        ("registered", "(r)", "®"),
        ("trademark", "(tm)", "™"),
        ("not_equal", "!=", "≠"),
    ]
    .into_iter()
    .map(|(name, trigger, replacement)| InputRule::new(name, trigger, replacement))
    .collect()
}
