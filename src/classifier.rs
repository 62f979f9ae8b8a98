//! Event categories
//!
//! Categories are named groups of raw event kinds (`before` = call + c-call,
//! and so on). The table below is the single source of truth: each row
//! defines the [`Category`] variant, its lookup name, the predicate generated
//! on [`EventRecord`] and the kinds it contains. Adding a row is all it takes
//! to add a category.

use crate::error::TraceError;
use crate::event::{EventKind, EventRecord};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

macro_rules! event_categories {
    ($(
        $(#[$doc:meta])*
        $variant:ident => $name:literal, $predicate:ident, [$($kind:ident),* $(,)?];
    )*) => {
        /// Named group of raw event kinds
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum Category {
            $($(#[$doc])* $variant,)*
        }

        impl Category {
            /// Every category, in table order
            pub const ALL: &'static [Category] = &[$(Category::$variant),*];

            /// Canonical lookup name
            pub fn name(self) -> &'static str {
                match self {
                    $(Category::$variant => $name,)*
                }
            }

            /// Raw kinds belonging to this category
            pub fn kinds(self) -> &'static [EventKind] {
                match self {
                    $(Category::$variant => &[$(EventKind::$kind),*],)*
                }
            }
        }

        impl EventRecord {
            $(
                #[doc = concat!("Whether this event is in the `", $name, "` category")]
                pub fn $predicate(&self) -> bool {
                    self.matches(Category::$variant)
                }
            )*
        }
    };
}

event_categories! {
    /// Every event kind
    All => "all", is_all, [Call, NativeCall, Return, NativeReturn, Line, Class, ScopeEnd, Raise];
    /// Entry into a scripted or native method
    Before => "before", is_before, [Call, NativeCall];
    /// Exit from a scripted or native method
    After => "after", is_after, [Return, NativeReturn];
    Call => "call", is_call, [Call];
    Return => "return", is_return, [Return];
    NativeCall => "native_call", is_native_call, [NativeCall];
    NativeReturn => "native_return", is_native_return, [NativeReturn];
    Line => "line", is_line, [Line];
    Class => "class", is_class, [Class];
    ScopeEnd => "scope_end", is_scope_end, [ScopeEnd];
    Raise => "raise", is_raise, [Raise];
}

/// Legacy spellings that do not normalize onto a canonical name
const ALIASES: &[(&str, Category)] = &[
    ("ccall", Category::NativeCall),
    ("creturn", Category::NativeReturn),
    ("end", Category::ScopeEnd),
    ("classenter", Category::Class),
];

/// Lowercase and strip separators and a leading symbol colon
fn normalize(name: &str) -> String {
    name.trim()
        .trim_start_matches(':')
        .chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

impl Category {
    /// Look a category up by name, ignoring case and separators
    ///
    /// `NativeCall`, `native-call`, `:native_call` and `ccall` all resolve to
    /// [`Category::NativeCall`].
    pub fn lookup(name: &str) -> Option<Category> {
        let key = normalize(name);
        Category::ALL
            .iter()
            .copied()
            .find(|c| normalize(c.name()) == key)
            .or_else(|| {
                ALIASES
                    .iter()
                    .find(|(alias, _)| *alias == key)
                    .map(|(_, c)| *c)
            })
    }

    pub fn contains(self, kind: EventKind) -> bool {
        self.kinds().contains(&kind)
    }
}

impl FromStr for Category {
    type Err = TraceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::lookup(s).ok_or_else(|| TraceError::UnknownCategory(s.to_string()))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw kinds in `category`
pub fn kinds_for(category: Category) -> &'static [EventKind] {
    category.kinds()
}

/// Raw kinds in the category called `name`; empty when there is none
pub fn kinds_for_name(name: &str) -> &'static [EventKind] {
    match Category::lookup(name) {
        Some(category) => category.kinds(),
        None => {
            warn!(name, "unknown event category");
            &[]
        }
    }
}

/// Categories containing `kind`, in table order
pub fn categories_for(kind: EventKind) -> Vec<Category> {
    Category::ALL
        .iter()
        .copied()
        .filter(|c| c.contains(kind))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_is_in_all_and_its_singleton() {
        for kind in EventKind::ALL {
            let cats = categories_for(kind);
            assert!(cats.contains(&Category::All), "{kind} missing from all");
            let singletons = cats
                .iter()
                .filter(|c| c.kinds() == [kind].as_slice())
                .count();
            assert_eq!(singletons, 1, "{kind} should have exactly one singleton");
        }
    }

    #[test]
    fn test_before_and_after() {
        assert_eq!(kinds_for(Category::Before), &[EventKind::Call, EventKind::NativeCall]);
        assert_eq!(kinds_for(Category::After), &[EventKind::Return, EventKind::NativeReturn]);
    }

    #[test]
    fn test_categories_for_native_call() {
        assert_eq!(
            categories_for(EventKind::NativeCall),
            vec![Category::All, Category::Before, Category::NativeCall]
        );
    }

    #[test]
    fn test_lookup_is_lenient() {
        for name in ["native_call", "native-call", "NativeCall", ":native_call", "NATIVE CALL", "ccall"] {
            assert_eq!(Category::lookup(name), Some(Category::NativeCall), "{name}");
        }
        assert_eq!(Category::lookup("end"), Some(Category::ScopeEnd));
        assert_eq!(Category::lookup("scope-end"), Some(Category::ScopeEnd));
        assert_eq!(Category::lookup("Before"), Some(Category::Before));
    }

    #[test]
    fn test_unknown_category_is_empty() {
        assert_eq!(Category::lookup("nonexistent"), None);
        assert!(kinds_for_name("nonexistent").is_empty());
        assert!(kinds_for_name("").is_empty());
    }

    #[test]
    fn test_from_str() {
        assert_eq!("line".parse::<Category>().unwrap(), Category::Line);
        let err = "bogus".parse::<Category>().unwrap_err();
        assert!(matches!(err, TraceError::UnknownCategory(ref s) if s == "bogus"));
    }

    #[test]
    fn test_names_round_trip() {
        for category in Category::ALL {
            assert_eq!(Category::lookup(category.name()), Some(*category));
            assert_eq!(category.to_string(), category.name());
        }
    }

    #[test]
    fn test_generated_predicates() {
        let ev = EventRecord::new(Some(EventKind::NativeReturn), "a.rb", 1, None, None);
        assert!(ev.is_all());
        assert!(ev.is_after());
        assert!(ev.is_native_return());
        assert!(!ev.is_before());
        assert!(!ev.is_return());
        assert!(!ev.is_line());
        assert!(!ev.is_class());
        assert!(!ev.is_scope_end());
        assert!(!ev.is_raise());
        assert!(!ev.is_call());
        assert!(!ev.is_native_call());
    }
}
