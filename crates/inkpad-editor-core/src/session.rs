//! The editor session: one document, its history, extensions and node
//! views behind a single facade.
//!
//! Every mutation goes through a [`Transaction`] built from commands and
//! committed here. Committing replaces the state, records an undo step,
//! runs the change hooks and reconciles node views, in that order.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use smol_str::SmolStr;
use tokio::sync::watch;

use crate::commands::{Command, CommandEnv};
use crate::config::EditorConfig;
use crate::error::{CommandError, ImportDegraded, Rejection, SchemaError};
use crate::extension::{DocumentChange, Extension, ExtensionRegistry};
use crate::extensions::{Autosave, Persist, SaveStatus, WordCount, WordStats, resolve};
use crate::history::{History, UndoManager};
use crate::html::{ImportReport, from_html, parse_fragment, to_html, to_html_with_views};
use crate::input_rules;
use crate::keymap::{KeyCombo, KeydownResult};
use crate::markdown::{looks_like_markdown, parse_markdown_fragment};
use crate::model::{Document, Node, Selection, query};
use crate::node_view::{NodeViews, Renderer};
use crate::schema::{Attrs, DEFAULT_TEXTBLOCK, ROOT, Schema};
use crate::transform::{ChangeOrigin, EditorState, Transaction, conform_inline};

/// Clipboard content offered to [`EditorSession::paste`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipboardData {
    Html(String),
    Text(String),
}

/// Outcome of a paste.
#[derive(Debug, Default)]
pub struct Pasted {
    /// Whether the content was inserted.
    pub applied: bool,
    /// What the importer had to drop or flatten.
    pub report: ImportReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ActiveQuery {
    Mark,
    Node,
}

type ActiveCache = HashMap<(ActiveQuery, SmolStr, Attrs), bool>;

pub struct EditorSession {
    config: EditorConfig,
    registry: ExtensionRegistry,
    state: EditorState,
    history: History,
    views: NodeViews,
    word_count: Option<WordCount>,
    autosave: Option<Autosave>,
    active: RefCell<ActiveCache>,
    destroyed: bool,
}

impl EditorSession {
    /// A session over an empty document with the configured built-ins
    /// registered, followed by `extensions`.
    pub fn new(config: EditorConfig, extensions: Vec<Extension>) -> Result<Self, SchemaError> {
        let builtins = resolve(&config.extensions)?;
        let mut registry = ExtensionRegistry::new(config.platform);
        for extension in builtins.extensions.into_iter().chain(extensions) {
            registry.register(extension)?;
        }
        let schema = registry.schema().clone();
        for required in [ROOT, DEFAULT_TEXTBLOCK] {
            if !schema.has_node(required) {
                return Err(SchemaError::MissingRequiredKind(SmolStr::new_static(required)));
            }
        }

        let doc = Document::empty(&schema)?;
        let session = Self {
            history: History::new(config.history_depth),
            state: EditorState::new(doc, &schema),
            registry,
            views: NodeViews::new(),
            word_count: builtins.word_count,
            autosave: None,
            active: RefCell::default(),
            destroyed: false,
            config,
        };
        session.publish_word_count();
        tracing::debug!(
            target: "inkpad::extension",
            extensions = session.registry.extension_names().len(),
            "editor session created"
        );
        Ok(session)
    }

    /// A session over a document imported from stored HTML.
    pub fn from_html(
        config: EditorConfig,
        extensions: Vec<Extension>,
        html: &str,
    ) -> Result<(Self, ImportReport), SchemaError> {
        let mut session = Self::new(config, extensions)?;
        let report = session.set_content(html)?;
        Ok((session, report))
    }

    /// Replace the whole document with imported HTML. History is cleared;
    /// change hooks do not run.
    pub fn set_content(&mut self, html: &str) -> Result<ImportReport, SchemaError> {
        let parsed = from_html(self.schema(), html)?;
        self.state = EditorState::new(parsed.doc, self.schema());
        self.history.clear_history();
        self.active.get_mut().clear();
        self.views.reconcile(self.registry.schema(), &self.state.doc);
        self.publish_word_count();
        Ok(parsed.report)
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn registry(&self) -> &ExtensionRegistry {
        &self.registry
    }

    pub fn schema(&self) -> &Schema {
        self.registry.schema()
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn doc(&self) -> &Document {
        &self.state.doc
    }

    pub fn selection(&self) -> &Selection {
        &self.state.selection
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Move the selection, clamped into the document. Stored marks reset.
    pub fn set_selection(&mut self, selection: Selection) {
        let Some(selection) = self.state.doc.clamp_selection(self.schema(), &selection) else {
            return;
        };
        if selection == self.state.selection && self.state.stored_marks.is_none() {
            return;
        }
        self.state.selection = selection;
        self.state.stored_marks = None;
        self.active.get_mut().clear();
    }

    /// Run one command. `Ok(false)` means it was rejected and nothing
    /// changed.
    pub fn run(&mut self, command: Command) -> Result<bool, SchemaError> {
        match command {
            Command::Undo => Ok(self.undo()),
            Command::Redo => Ok(self.redo()),
            command => self.apply(std::slice::from_ref(&command), ChangeOrigin::Command),
        }
    }

    /// Start a chain of commands that commits as one transaction.
    pub fn chain(&mut self) -> Chain<'_> {
        Chain {
            session: self,
            commands: Vec::new(),
        }
    }

    /// Whether `command` would apply, without changing anything.
    pub fn can(&self, command: &Command) -> bool {
        match command {
            Command::Undo => !self.destroyed && self.history.can_undo(),
            Command::Redo => !self.destroyed && self.history.can_redo(),
            command => self.can_all(std::slice::from_ref(command)),
        }
    }

    fn can_all(&self, commands: &[Command]) -> bool {
        !self.destroyed && self.build(commands, ChangeOrigin::Command).is_ok()
    }

    fn build(&self, commands: &[Command], origin: ChangeOrigin) -> Result<Transaction, CommandError> {
        let mut tr = Transaction::new(&self.state, self.registry.schema().clone());
        tr.set_origin(origin);
        let env = CommandEnv::new(self.registry.commands());
        for command in commands {
            command.apply(&mut tr, &env)?;
        }
        Ok(tr)
    }

    fn apply(&mut self, commands: &[Command], origin: ChangeOrigin) -> Result<bool, SchemaError> {
        if self.destroyed {
            return Ok(reject(&Rejection::Destroyed));
        }
        match self.build(commands, origin) {
            Ok(tr) => {
                self.commit(tr);
                Ok(true)
            }
            Err(CommandError::Rejected(rejection)) => Ok(reject(&rejection)),
            Err(CommandError::Schema(err)) => Err(err),
        }
    }

    fn commit(&mut self, tr: Transaction) {
        let origin = tr.origin();
        let add_to_history = tr.adds_to_history();
        let next = tr.into_state();
        if next == self.state {
            return;
        }
        let previous = std::mem::replace(&mut self.state, next);
        if add_to_history && previous.doc != self.state.doc {
            self.history.record(previous.clone(), self.state.clone());
        }
        self.after_change(&previous, origin);
    }

    fn after_change(&mut self, previous: &EditorState, origin: ChangeOrigin) {
        self.active.get_mut().clear();
        self.registry.notify(&DocumentChange {
            schema: self.registry.schema(),
            doc: &self.state.doc,
            previous: &previous.doc,
            selection: &self.state.selection,
            origin,
        });
        if previous.doc != self.state.doc {
            self.views.reconcile(self.registry.schema(), &self.state.doc);
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo(&mut self) -> bool {
        if self.destroyed {
            return reject(&Rejection::Destroyed);
        }
        let Some(restored) = self.history.undo(&self.state) else {
            return reject(&Rejection::NothingToUndo);
        };
        let previous = std::mem::replace(&mut self.state, restored);
        self.after_change(&previous, ChangeOrigin::Undo);
        true
    }

    pub fn redo(&mut self) -> bool {
        if self.destroyed {
            return reject(&Rejection::Destroyed);
        }
        let Some(restored) = self.history.redo(&self.state) else {
            return reject(&Rejection::NothingToRedo);
        };
        let previous = std::mem::replace(&mut self.state, restored);
        self.after_change(&previous, ChangeOrigin::Redo);
        true
    }

    /// Dispatch a key combination to its shortcut.
    pub fn handle_key(&mut self, combo: &KeyCombo) -> Result<KeydownResult, SchemaError> {
        let Some(binding) = self.registry.shortcut(combo) else {
            return Ok(KeydownResult::NotHandled);
        };
        let command = binding.command();
        tracing::trace!(target: "inkpad::command", shortcut = %combo, extension = %binding.extension, "shortcut");
        Ok(if self.run(command)? {
            KeydownResult::Handled
        } else {
            KeydownResult::PassThrough
        })
    }

    /// Insert typed text, then fire the first matching input rule. The
    /// rule commits separately, so one undo restores the literal text.
    pub fn handle_text_input(&mut self, text: &str) -> Result<bool, SchemaError> {
        if !self.run(Command::insert_text(text))? {
            return Ok(false);
        }
        let mut tr = Transaction::new(&self.state, self.registry.schema().clone());
        tr.set_origin(ChangeOrigin::InputRule);
        let Some(rule) = input_rules::find_match(&tr, self.registry.input_rules()) else {
            return Ok(true);
        };
        match input_rules::apply(&mut tr, rule) {
            Ok(()) => self.commit(tr),
            Err(CommandError::Rejected(rejection)) => {
                reject(&rejection);
            }
            Err(CommandError::Schema(err)) => return Err(err),
        }
        Ok(true)
    }

    /// Paste clipboard content at the selection. HTML goes through the
    /// importer; text that looks like Markdown is converted first.
    pub fn paste(&mut self, data: ClipboardData) -> Result<Pasted, SchemaError> {
        let (mut blocks, mut report) = match data {
            ClipboardData::Html(html) => parse_fragment(self.schema(), &html)?,
            ClipboardData::Text(text) if looks_like_markdown(&text) => {
                parse_markdown_fragment(self.schema(), &text)?
            }
            ClipboardData::Text(text) => {
                if !text.contains('\n') {
                    let applied = self.apply(&[Command::insert_text(text)], ChangeOrigin::Paste)?;
                    return Ok(Pasted {
                        applied,
                        report: ImportReport::default(),
                    });
                }
                (self.text_paragraphs(&text)?, ImportReport::default())
            }
        };
        if blocks.is_empty() {
            return Ok(Pasted {
                applied: reject(&Rejection::EmptyInsert),
                report,
            });
        }
        self.fit_to_caret(&mut blocks, &mut report)?;
        let applied = self.apply(&[Command::InsertContent(blocks)], ChangeOrigin::Paste)?;
        Ok(Pasted { applied, report })
    }

    /// A lone pasted textblock merges into the block at the caret, so its
    /// content is adapted to that block's kind first and the losses reported.
    fn fit_to_caret(&self, blocks: &mut [Node], report: &mut ImportReport) -> Result<(), SchemaError> {
        let [single] = blocks else {
            return Ok(());
        };
        let schema = self.schema();
        if !schema.node_kind(single.kind())?.is_textblock() {
            return Ok(());
        }
        let Some(target) = self.state.doc.node_at(&self.state.selection.start().path) else {
            return Ok(());
        };
        let kind = schema.node_kind(target.kind())?;
        if !kind.is_textblock() {
            return Ok(());
        }
        let conformed = conform_inline(schema, kind, single.content().to_vec());
        for dropped in conformed.dropped {
            report.push(ImportDegraded::Misplaced {
                kind: dropped,
                parent: kind.name.clone(),
            });
        }
        if conformed.stripped_marks {
            report.push(ImportDegraded::MarksStripped {
                parent: kind.name.clone(),
            });
        }
        *single = single.with_content(conformed.content);
        Ok(())
    }

    fn text_paragraphs(&self, text: &str) -> Result<Vec<Node>, SchemaError> {
        let schema = self.schema();
        text.lines()
            .map(str::trim_end)
            .filter(|line| !line.is_empty())
            .map(|line| schema.create_node(DEFAULT_TEXTBLOCK, &Attrs::new(), vec![schema.text(line, [])]))
            .collect()
    }

    /// HTML for display, including node-view output and state.
    pub fn export_html(&self) -> String {
        to_html_with_views(self.schema(), &self.state.doc, &self.views)
    }

    /// HTML for storage, without node-view state.
    pub fn to_html(&self) -> String {
        to_html(self.schema(), &self.state.doc)
    }

    pub fn plain_text(&self) -> String {
        self.state.doc.plain_text(self.schema())
    }

    /// Whether a mark of `kind` matching `filter` covers the selection.
    pub fn is_mark_active(&self, kind: &str, filter: &Attrs) -> bool {
        self.cached(ActiveQuery::Mark, kind, filter, || {
            query::is_mark_active(
                &self.state.doc,
                self.schema(),
                &self.state.selection,
                self.state.stored_marks.as_ref(),
                kind,
                filter,
            )
        })
    }

    /// Whether the selection sits inside a node of `kind` matching `filter`.
    pub fn is_node_active(&self, kind: &str, filter: &Attrs) -> bool {
        self.cached(ActiveQuery::Node, kind, filter, || {
            query::is_node_active(&self.state.doc, self.schema(), &self.state.selection, kind, filter)
        })
    }

    fn cached(&self, query: ActiveQuery, kind: &str, filter: &Attrs, compute: impl FnOnce() -> bool) -> bool {
        let key = (query, SmolStr::new(kind), filter.clone());
        if let Some(&active) = self.active.borrow().get(&key) {
            return active;
        }
        let active = compute();
        self.active.borrow_mut().insert(key, active);
        active
    }

    /// Render opaque nodes of `kind` with `renderer`.
    pub fn register_renderer(&mut self, kind: &str, renderer: impl Renderer) -> Result<(), SchemaError> {
        let spec = self.registry.schema().node_kind(kind)?;
        if !spec.is_opaque() {
            tracing::warn!(target: "inkpad::node_view", kind, "renderer registered for a kind without opaque content");
        }
        let name = spec.name.clone();
        self.views.register(name, renderer);
        self.views.reconcile(self.registry.schema(), &self.state.doc);
        Ok(())
    }

    pub fn node_views(&self) -> &NodeViews {
        &self.views
    }

    /// Apply finished renders. Returns whether any view changed.
    pub fn poll_node_views(&mut self) -> bool {
        self.views.poll()
    }

    /// Wait for every in-flight render to finish.
    pub async fn settle_node_views(&mut self) {
        self.views.settle().await;
    }

    /// Live word statistics, if `word_count` is enabled.
    pub fn word_stats(&self) -> Option<watch::Receiver<WordStats>> {
        self.word_count.as_ref().map(WordCount::subscribe)
    }

    fn publish_word_count(&self) {
        if let Some(counter) = &self.word_count {
            counter.update(&self.plain_text());
        }
    }

    /// Persist the exported HTML through `persist` once edits pause for
    /// the configured delay. Must be called inside a tokio runtime.
    pub fn enable_autosave(&mut self, persist: Arc<dyn Persist>) -> Result<watch::Receiver<SaveStatus>, SchemaError> {
        let autosave = Autosave::spawn(persist, self.config.autosave_delay());
        self.registry.register(autosave.extension())?;
        let status = autosave.status();
        self.autosave = Some(autosave);
        Ok(status)
    }

    /// Tear the session down: pending saves are dropped, in-flight renders
    /// abandoned, and later commands rejected.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.autosave = None;
        self.views.destroy();
        tracing::debug!(target: "inkpad::extension", "editor session destroyed");
    }
}

impl std::fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSession")
            .field("registry", &self.registry)
            .field("selection", &self.state.selection)
            .field("views", &self.views)
            .field("destroyed", &self.destroyed)
            .finish_non_exhaustive()
    }
}

fn reject(rejection: &Rejection) -> bool {
    tracing::trace!(target: "inkpad::command", %rejection, "command rejected");
    false
}

/// Commands folded into one transaction and one undo step.
#[must_use = "a chain does nothing until `run`"]
pub struct Chain<'s> {
    session: &'s mut EditorSession,
    commands: Vec<Command>,
}

impl Chain<'_> {
    pub fn then(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }

    fn history_in_chain(&self) -> bool {
        self.commands.len() > 1 && self.commands.iter().any(Command::is_history)
    }

    /// Whether the whole chain would apply.
    pub fn can(&self) -> bool {
        match &self.commands[..] {
            [] => false,
            [single] => self.session.can(single),
            commands => !self.history_in_chain() && self.session.can_all(commands),
        }
    }

    /// Apply every command or none.
    pub fn run(self) -> Result<bool, SchemaError> {
        if self.commands.is_empty() {
            return Ok(reject(&Rejection::EmptyChain));
        }
        if self.history_in_chain() {
            return Ok(reject(&Rejection::HistoryInChain));
        }
        match <[Command; 1]>::try_from(self.commands) {
            Ok([single]) => self.session.run(single),
            Err(commands) => self.session.apply(&commands, ChangeOrigin::Command),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::attrs;
    use crate::keymap::{Key, Modifiers, Platform};
    use crate::model::Position;

    fn config() -> EditorConfig {
        EditorConfig {
            platform: Platform::Other,
            ..EditorConfig::default()
        }
    }

    fn session(html: &str) -> EditorSession {
        let (session, report) = EditorSession::from_html(config(), Vec::new(), html).unwrap();
        assert!(report.is_clean(), "{report:?}");
        session
    }

    fn select(session: &mut EditorSession, path: &[usize], from: usize, to: usize) {
        session.set_selection(Selection::new(Position::new(path, from), Position::new(path, to)));
    }

    fn caret(session: &mut EditorSession, path: &[usize], offset: usize) {
        session.set_selection(Selection::collapsed(Position::new(path, offset)));
    }

    #[test]
    fn test_unknown_extension_fails_construction() {
        let config = EditorConfig {
            extensions: vec!["starter_kit".into(), "sparkles".into()],
            ..config()
        };
        assert!(matches!(
            EditorSession::new(config, Vec::new()),
            Err(SchemaError::UnknownExtension(name)) if name == "sparkles"
        ));
    }

    #[test]
    fn test_missing_required_kind() {
        let config = EditorConfig {
            extensions: vec!["underline".into()],
            ..config()
        };
        assert!(matches!(
            EditorSession::new(config, Vec::new()),
            Err(SchemaError::MissingRequiredKind(kind)) if kind == "doc"
        ));
    }

    #[test]
    fn test_toggle_bold_then_undo_redo() {
        let mut session = session("<p>Hello world</p>");
        select(&mut session, &[0], 6, 11);
        assert!(session.run(Command::toggle_mark("bold")).unwrap());
        assert_eq!(session.to_html(), "<p>Hello <strong>world</strong></p>");
        assert!(session.is_mark_active("bold", &Attrs::new()));

        assert!(session.undo());
        assert_eq!(session.to_html(), "<p>Hello world</p>");
        assert!(!session.is_mark_active("bold", &Attrs::new()));
        assert!(session.run(Command::Redo).unwrap());
        assert_eq!(session.to_html(), "<p>Hello <strong>world</strong></p>");
        assert!(!session.redo());
    }

    #[test]
    fn test_empty_chain_is_rejected() {
        let mut session = session("<p>Hello</p>");
        let before = session.state().clone();
        assert!(!session.chain().can());
        assert!(!session.chain().run().unwrap());
        assert_eq!(session.state(), &before);
        assert!(!session.can_undo());
    }

    #[test]
    fn test_history_in_chain_rejected() {
        let mut session = session("<p>Hello</p>");
        select(&mut session, &[0], 0, 5);
        let applied = session
            .chain()
            .then(Command::toggle_mark("bold"))
            .then(Command::Undo)
            .run()
            .unwrap();
        assert!(!applied);
        assert_eq!(session.to_html(), "<p>Hello</p>");
    }

    #[test]
    fn test_chain_is_one_undo_step() {
        let mut session = session("<p>Hello</p>");
        select(&mut session, &[0], 0, 5);
        assert!(
            session
                .chain()
                .then(Command::toggle_mark("bold"))
                .then(Command::toggle_mark("italic"))
                .run()
                .unwrap()
        );
        assert_eq!(session.to_html(), "<p><strong><em>Hello</em></strong></p>");
        assert!(session.undo());
        assert_eq!(session.to_html(), "<p>Hello</p>");
        assert!(!session.can_undo());
    }

    #[test]
    fn test_can_does_not_mutate() {
        let mut session = session("<p>Hello</p>");
        caret(&mut session, &[0], 2);
        assert!(session.can(&Command::toggle_heading(2)));
        assert!(!session.can(&Command::FocusNextCell));
        assert!(!session.can(&Command::Undo));
        assert_eq!(session.to_html(), "<p>Hello</p>");
    }

    #[test]
    fn test_handle_key() {
        let mut session = session("<p>Hello world</p>");
        select(&mut session, &[0], 0, 5);
        let bold = KeyCombo::primary(Key::character("b"), Platform::Other);
        assert_eq!(session.handle_key(&bold).unwrap(), KeydownResult::Handled);
        assert_eq!(session.to_html(), "<p><strong>Hello</strong> world</p>");

        // Tab is bound to table navigation, which rejects outside a table.
        caret(&mut session, &[0], 1);
        let tab = KeyCombo::new(Key::Tab);
        assert_eq!(session.handle_key(&tab).unwrap(), KeydownResult::PassThrough);

        let unbound = KeyCombo::with_modifiers(Key::character("q"), Modifiers::CTRL);
        assert_eq!(session.handle_key(&unbound).unwrap(), KeydownResult::NotHandled);

        let undo = KeyCombo::primary(Key::character("z"), Platform::Other);
        assert_eq!(session.handle_key(&undo).unwrap(), KeydownResult::Handled);
        assert_eq!(session.to_html(), "<p>Hello world</p>");
    }

    #[test]
    fn test_input_rule_is_separate_undo_step() {
        let mut session = session("<p>a</p>");
        caret(&mut session, &[0], 1);
        assert!(session.handle_text_input("-").unwrap());
        assert!(session.handle_text_input("-").unwrap());
        assert_eq!(session.to_html(), "<p>a—</p>");

        assert!(session.undo());
        assert_eq!(session.to_html(), "<p>a--</p>");
    }

    #[test]
    fn test_input_rule_skipped_in_code_block() {
        let mut session = session("<pre><code>a-</code></pre>");
        caret(&mut session, &[0], 2);
        assert!(session.handle_text_input(">").unwrap());
        assert_eq!(session.to_html(), "<pre><code>a-&gt;</code></pre>");
    }

    #[test]
    fn test_stored_marks_apply_to_typed_text() {
        let mut session = session("<p>ab</p>");
        caret(&mut session, &[0], 1);
        assert!(session.run(Command::toggle_mark("italic")).unwrap());
        assert!(session.is_mark_active("italic", &Attrs::new()));
        assert!(session.handle_text_input("x").unwrap());
        assert_eq!(session.to_html(), "<p>a<em>x</em>b</p>");
    }

    #[test]
    fn test_paste_html_inline() {
        let mut session = session("<p>ab</p>");
        caret(&mut session, &[0], 1);
        let pasted = session
            .paste(ClipboardData::Html("<p><em>x</em></p>".into()))
            .unwrap();
        assert!(pasted.applied);
        assert!(pasted.report.is_clean());
        assert_eq!(session.to_html(), "<p>a<em>x</em>b</p>");
    }

    #[test]
    fn test_paste_html_reports_degraded() {
        let mut session = session("<p>ab</p>");
        caret(&mut session, &[0], 2);
        let pasted = session
            .paste(ClipboardData::Html("<blink>hi</blink>".into()))
            .unwrap();
        assert!(pasted.applied);
        assert!(!pasted.report.is_clean());
        assert_eq!(session.plain_text(), "abhi");
    }

    #[test]
    fn test_paste_into_code_block_reports_losses() {
        let mut session = session("<pre><code>ab</code></pre>");
        caret(&mut session, &[0], 1);
        let pasted = session
            .paste(ClipboardData::Html(r#"<p>x<img src="i.png"><strong>y</strong></p>"#.into()))
            .unwrap();
        assert!(pasted.applied);
        assert_eq!(
            pasted.report.degraded,
            [
                ImportDegraded::Misplaced {
                    kind: "image".into(),
                    parent: "code_block".into(),
                },
                ImportDegraded::MarksStripped {
                    parent: "code_block".into(),
                },
            ]
        );
        assert_eq!(session.to_html(), "<pre><code>axyb</code></pre>");
    }

    #[test]
    fn test_paste_markdown_text() {
        let mut session = EditorSession::new(config(), Vec::new()).unwrap();
        let pasted = session
            .paste(ClipboardData::Text("# Title\n\nbody".into()))
            .unwrap();
        assert!(pasted.applied);
        assert_eq!(session.to_html(), "<h1>Title</h1><p>body</p>");
    }

    #[test]
    fn test_paste_plain_text_lines() {
        let mut session = EditorSession::new(config(), Vec::new()).unwrap();
        let pasted = session
            .paste(ClipboardData::Text("one\ntwo".into()))
            .unwrap();
        assert!(pasted.applied);
        assert_eq!(session.to_html(), "<p>one</p><p>two</p>");
        assert!(session.undo());
        assert_eq!(session.to_html(), "<p></p>");
    }

    #[test]
    fn test_word_stats_follow_commits() {
        let mut session = session("<p>one two</p>");
        let stats = session.word_stats().unwrap();
        assert_eq!(stats.borrow().words, 2);
        caret(&mut session, &[0], 7);
        session.handle_text_input(" three").unwrap();
        assert_eq!(stats.borrow().words, 3);
        assert_eq!(stats.borrow().reading_minutes, 1);
    }

    #[test]
    fn test_hooks_run_once_per_commit() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let hook = Extension::new("counter").on_document_changed(move |change| {
            assert_eq!(change.origin, ChangeOrigin::Command);
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let mut session = EditorSession::new(config(), vec![hook]).unwrap();
        session
            .chain()
            .then(Command::insert_text("a"))
            .then(Command::insert_text("b"))
            .run()
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Rejected commands commit nothing.
        session.run(Command::FocusNextCell).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_node_active_cache_clears_on_selection_change() {
        let mut session = session("<h2>Title</h2><p>body</p>");
        caret(&mut session, &[0], 1);
        let level = attrs! { "level" => 2 };
        assert!(session.is_node_active("heading", &level));
        caret(&mut session, &[1], 1);
        assert!(!session.is_node_active("heading", &level));
        assert!(session.is_node_active("paragraph", &Attrs::new()));
    }

    #[test]
    fn test_destroyed_session_rejects_commands() {
        let mut session = session("<p>Hello</p>");
        select(&mut session, &[0], 0, 5);
        session.destroy();
        assert!(!session.run(Command::toggle_mark("bold")).unwrap());
        assert!(!session.undo());
        assert_eq!(session.to_html(), "<p>Hello</p>");
    }
}
