//! Built-in extensions, enabled by name.
//!
//! The order of [`BUILTIN_NAMES`] is the default registration order, which
//! matters where shortcuts collide: `highlight` registers after
//! `starter_kit`, so `Mod-Shift-b` toggles a blue highlight rather than a
//! blockquote.

mod autosave;
mod blocks;
mod inline;
mod opaque;
mod starter_kit;
mod text;
mod word_count;

use smol_str::SmolStr;

pub use autosave::{Autosave, Persist, SaveStatus, Snapshot};
pub use opaque::{DEFAULT_DIAGRAM_TYPE, DIAGRAM_TYPES, diagram_template};
pub use word_count::{WordCount, WordStats};

use crate::error::SchemaError;
use crate::extension::Extension;

/// The built-in extensions enabled by default, in registration order.
pub const BUILTIN_NAMES: &[&str] = &[
    "starter_kit",
    "underline",
    "text_align",
    "link",
    "image",
    "task_list",
    "table",
    "table_navigation",
    "script",
    "text_style",
    "highlight",
    "admonition",
    "math",
    "diagram",
    "collapsible",
    "footnote",
    "emoji",
    "typography",
    "word_count",
];

/// Built-in extensions that are only registered when named in the config.
pub const OPTIONAL_NAMES: &[&str] = &["definition_list"];

/// Languages offered by the code block language picker.
pub const CODE_LANGUAGES: &[&str] = &[
    "javascript",
    "typescript",
    "python",
    "java",
    "cpp",
    "css",
    "html",
    "json",
    "bash",
    "sql",
    "php",
    "go",
    "rust",
    "yaml",
    "markdown",
    "text",
];

/// The extensions named in a config, ready to register.
#[derive(Debug, Default)]
pub struct BuiltinSet {
    pub extensions: Vec<Extension>,
    /// Present when `word_count` is enabled.
    pub word_count: Option<WordCount>,
}

/// Resolve enabled extension names, keeping their order.
pub fn resolve<S: AsRef<str>>(names: &[S]) -> Result<BuiltinSet, SchemaError> {
    let mut set = BuiltinSet::default();
    for name in names {
        let name = name.as_ref();
        if name == "word_count" {
            let counter = WordCount::new();
            set.extensions.push(counter.extension());
            set.word_count = Some(counter);
            continue;
        }
        let extension = builtin(name).ok_or_else(|| SchemaError::UnknownExtension(SmolStr::new(name)))?;
        set.extensions.push(extension);
    }
    Ok(set)
}

/// A stateless built-in extension by name.
pub fn builtin(name: &str) -> Option<Extension> {
    let extension = match name {
        "starter_kit" => starter_kit::extension(),
        "underline" => inline::underline(),
        "text_align" => text::text_align(),
        "link" => inline::link(),
        "image" => blocks::image(),
        "task_list" => blocks::task_list(),
        "table" => blocks::table(),
        "table_navigation" => blocks::table_navigation(),
        "script" => inline::script(),
        "text_style" => inline::text_style(),
        "highlight" => inline::highlight(),
        "admonition" => blocks::admonition(),
        "math" => opaque::math(),
        "diagram" => opaque::diagram(),
        "collapsible" => blocks::collapsible(),
        "footnote" => text::footnote(),
        "emoji" => text::emoji(),
        "typography" => text::typography(),
        "definition_list" => blocks::definition_list(),
        _ => return None,
    };
    Some(extension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::ExtensionRegistry;
    use crate::keymap::{Key, KeyCombo, Platform};
    use crate::commands::Command;

    #[test]
    fn test_all_builtins_register() {
        let set = resolve(BUILTIN_NAMES).unwrap();
        assert!(set.word_count.is_some());
        let mut registry = ExtensionRegistry::new(Platform::Other);
        for extension in set.extensions {
            registry.register(extension).unwrap();
        }
        assert_eq!(registry.extension_names().len(), BUILTIN_NAMES.len());
        for kind in ["doc", "paragraph", "table", "diagram", "math_inline", "collapsible_section"] {
            assert!(registry.schema().has_node(kind), "{kind}");
        }
    }

    #[test]
    fn test_optional_builtins_resolve_by_name() {
        for name in OPTIONAL_NAMES {
            assert!(!BUILTIN_NAMES.contains(name), "{name}");
            assert!(builtin(name).is_some(), "{name}");
        }
        let mut registry = ExtensionRegistry::new(Platform::Other);
        for extension in resolve(&["starter_kit", "definition_list"]).unwrap().extensions {
            registry.register(extension).unwrap();
        }
        assert!(registry.schema().has_node("definition_list"));
    }

    #[test]
    fn test_unknown_extension_fails_fast() {
        assert!(matches!(
            resolve(&["starter_kit", "focus_mode"]),
            Err(SchemaError::UnknownExtension(name)) if name == "focus_mode"
        ));
    }

    #[test]
    fn test_highlight_overrides_blockquote_shortcut() {
        let mut registry = ExtensionRegistry::new(Platform::Mac);
        for name in ["starter_kit", "highlight"] {
            registry.register(builtin(name).unwrap()).unwrap();
        }
        let combo = KeyCombo::primary_shift(Key::character("b"), Platform::Mac);
        let binding = registry.shortcut(&combo).unwrap();
        assert_eq!(binding.extension, "highlight");
        assert_eq!(binding.command(), Command::toggle_highlight("blue"));
    }

    #[test]
    fn test_code_languages_end_with_plain_text() {
        assert_eq!(CODE_LANGUAGES.len(), 16);
        assert_eq!(CODE_LANGUAGES.last(), Some(&"text"));
    }
}
