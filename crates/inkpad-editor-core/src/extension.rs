//! Extensions: bundles of schema kinds, commands, shortcuts, input rules
//! and change hooks, registered on an [`ExtensionRegistry`].
//!
//! Registration is atomic per extension. Shortcut conflicts resolve by
//! last registration winning.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use smol_str::SmolStr;

use crate::commands::{Command, CustomCommand, CustomCommands};
use crate::error::SchemaError;
use crate::input_rules::InputRule;
use crate::keymap::{KeyCombo, Platform};
use crate::model::{Document, Selection};
use crate::schema::{KindDef, MarkKind, NodeKind, Schema};
use crate::transform::ChangeOrigin;

/// Produces the command a shortcut runs.
pub type ShortcutThunk = Arc<dyn Fn() -> Command + Send + Sync>;

/// Observer called after every committed document change. Hooks get a
/// read-only view and cannot alter the transaction.
pub type DocumentHook = Arc<dyn Fn(&DocumentChange<'_>) + Send + Sync>;

/// A committed change, as seen by hooks.
#[derive(Debug, Clone, Copy)]
pub struct DocumentChange<'a> {
    pub schema: &'a Schema,
    pub doc: &'a Document,
    pub previous: &'a Document,
    pub selection: &'a Selection,
    pub origin: ChangeOrigin,
}

#[derive(Clone)]
pub struct Extension {
    name: SmolStr,
    kinds: Vec<KindDef>,
    commands: Vec<(SmolStr, Arc<dyn CustomCommand>)>,
    shortcuts: Vec<(SmolStr, ShortcutThunk)>,
    input_rules: Vec<InputRule>,
    hooks: Vec<DocumentHook>,
}

impl Extension {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            kinds: Vec::new(),
            commands: Vec::new(),
            shortcuts: Vec::new(),
            input_rules: Vec::new(),
            hooks: Vec::new(),
        }
    }

    pub fn name(&self) -> &SmolStr {
        &self.name
    }

    pub fn node(mut self, kind: NodeKind) -> Self {
        self.kinds.push(kind.into());
        self
    }

    pub fn mark(mut self, kind: MarkKind) -> Self {
        self.kinds.push(kind.into());
        self
    }

    pub fn command(mut self, name: impl Into<SmolStr>, command: impl CustomCommand + 'static) -> Self {
        self.commands.push((name.into(), Arc::new(command)));
        self
    }

    /// Bind `spec` (e.g. `"Mod-b"`) to the command `thunk` builds.
    pub fn shortcut(
        mut self,
        spec: impl Into<SmolStr>,
        thunk: impl Fn() -> Command + Send + Sync + 'static,
    ) -> Self {
        self.shortcuts.push((spec.into(), Arc::new(thunk)));
        self
    }

    pub fn input_rule(mut self, rule: InputRule) -> Self {
        self.input_rules.push(rule);
        self
    }

    pub fn input_rules(mut self, rules: impl IntoIterator<Item = InputRule>) -> Self {
        self.input_rules.extend(rules);
        self
    }

    pub fn on_document_changed(mut self, hook: impl Fn(&DocumentChange<'_>) + Send + Sync + 'static) -> Self {
        self.hooks.push(Arc::new(hook));
        self
    }
}

impl fmt::Debug for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extension")
            .field("name", &self.name)
            .field("kinds", &self.kinds.len())
            .field("commands", &self.commands.iter().map(|(n, _)| n).collect::<Vec<_>>())
            .field("shortcuts", &self.shortcuts.iter().map(|(s, _)| s).collect::<Vec<_>>())
            .field("input_rules", &self.input_rules.len())
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

/// A shortcut and the extension that owns it.
#[derive(Clone)]
pub struct ShortcutBinding {
    pub extension: SmolStr,
    thunk: ShortcutThunk,
}

impl ShortcutBinding {
    pub fn command(&self) -> Command {
        (self.thunk)()
    }
}

impl fmt::Debug for ShortcutBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShortcutBinding")
            .field("extension", &self.extension)
            .field("command", &self.command())
            .finish()
    }
}

pub struct ExtensionRegistry {
    platform: Platform,
    schema: Arc<Schema>,
    extensions: Vec<SmolStr>,
    commands: CustomCommands,
    shortcuts: HashMap<KeyCombo, ShortcutBinding>,
    input_rules: Vec<InputRule>,
    hooks: Vec<(SmolStr, DocumentHook)>,
}

impl ExtensionRegistry {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            schema: Arc::new(Schema::new()),
            extensions: Vec::new(),
            commands: HashMap::new(),
            shortcuts: HashMap::new(),
            input_rules: Vec::new(),
            hooks: Vec::new(),
        }
    }

    /// Register an extension. On error nothing from it is applied.
    pub fn register(&mut self, extension: Extension) -> Result<(), SchemaError> {
        let Extension {
            name,
            kinds,
            commands,
            shortcuts,
            input_rules,
            hooks,
        } = extension;
        if self.extensions.contains(&name) {
            return Err(SchemaError::DuplicateExtension(name));
        }

        let mut schema = (*self.schema).clone();
        for kind in kinds {
            schema.register(kind)?;
        }
        let shortcuts = shortcuts
            .into_iter()
            .map(|(spec, thunk)| KeyCombo::parse(&spec, self.platform).map(|combo| (combo, thunk)))
            .collect::<Result<Vec<_>, _>>()?;

        self.schema = Arc::new(schema);
        for (command, handler) in commands {
            if self.commands.insert(command.clone(), handler).is_some() {
                tracing::debug!(target: "inkpad::extension", %command, extension = %name, "command replaced");
            }
        }
        for (combo, thunk) in shortcuts {
            let binding = ShortcutBinding {
                extension: name.clone(),
                thunk,
            };
            if let Some(previous) = self.shortcuts.insert(combo.clone(), binding) {
                tracing::debug!(
                    target: "inkpad::extension",
                    shortcut = %combo,
                    previous = %previous.extension,
                    winner = %name,
                    "shortcut overridden"
                );
            }
        }
        self.input_rules.extend(input_rules);
        self.hooks.extend(hooks.into_iter().map(|hook| (name.clone(), hook)));
        tracing::debug!(target: "inkpad::extension", extension = %name, "registered extension");
        self.extensions.push(name);
        Ok(())
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn extension_names(&self) -> &[SmolStr] {
        &self.extensions
    }

    pub fn commands(&self) -> &CustomCommands {
        &self.commands
    }

    /// The binding for `combo`. A shifted letter also matches a binding on
    /// the lowercase letter with shift.
    pub fn shortcut(&self, combo: &KeyCombo) -> Option<&ShortcutBinding> {
        self.shortcuts.get(combo).or_else(|| {
            let key = combo.key.unshifted()?;
            self.shortcuts.get(&KeyCombo::with_modifiers(key, combo.modifiers))
        })
    }

    /// Every effective shortcut, sorted by its display form.
    pub fn shortcuts(&self) -> Vec<(&KeyCombo, &ShortcutBinding)> {
        let mut all: Vec<_> = self.shortcuts.iter().collect();
        all.sort_by_cached_key(|(combo, _)| combo.to_string());
        all
    }

    pub fn input_rules(&self) -> &[InputRule] {
        &self.input_rules
    }

    /// Run every change hook, in registration order.
    pub fn notify(&self, change: &DocumentChange<'_>) {
        for (extension, hook) in &self.hooks {
            tracing::trace!(target: "inkpad::extension", %extension, "document changed hook");
            hook(change);
        }
    }
}

impl fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("platform", &self.platform)
            .field("extensions", &self.extensions)
            .field("shortcuts", &self.shortcuts.len())
            .field("input_rules", &self.input_rules.len())
            .finish()
    }
}
