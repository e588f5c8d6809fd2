use std::borrow::Cow;

use heck::ToSnakeCase;
use rustc_hash::FxHashMap;
use unicase::UniCase;

/// Deduplicates names that would collide once they're written as
/// snake-case file or module names on a case-insensitive file system.
///
/// `WidgetOperations`, `widget_operations`, and `WIDGET_OPERATIONS` are
/// distinct in the input, but all become `widget_operations`.
#[derive(Debug, Default)]
pub struct UniqueNames {
    space: FxHashMap<UniCase<String>, usize>,
}

impl UniqueNames {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a scope that reserves the given names.
    ///
    /// # Examples
    ///
    /// ```
    /// # use strata_core::codegen::UniqueNames;
    /// let mut names = UniqueNames::with_reserved(["_client"]);
    /// assert_eq!(names.uniquify("_client"), "_client2");
    /// assert_eq!(names.uniquify("_models"), "_models");
    /// ```
    pub fn with_reserved<S: AsRef<str>>(reserved: impl IntoIterator<Item = S>) -> Self {
        let space = reserved
            .into_iter()
            .map(|name| (key(name.as_ref()), 1))
            .collect();
        Self { space }
    }

    /// Adds a name. If no name that collides with it was added yet,
    /// returns the name as-is; otherwise, returns the name with the
    /// lowest numeric suffix that doesn't collide either.
    ///
    /// # Examples
    ///
    /// ```
    /// # use strata_core::codegen::UniqueNames;
    /// let mut names = UniqueNames::new();
    /// assert_eq!(names.uniquify("WidgetOperations"), "WidgetOperations");
    /// assert_eq!(names.uniquify("widget_operations"), "widget_operations2");
    /// ```
    pub fn uniquify<'b>(&mut self, name: &'b str) -> Cow<'b, str> {
        let key = key(name);
        let Some(&count) = self.space.get(&key) else {
            self.space.insert(key, 1);
            return name.into();
        };
        let mut count = count;
        loop {
            count += 1;
            let candidate = format!("{name}{count}");
            let candidate_key = self::key(&candidate);
            if !self.space.contains_key(&candidate_key) {
                self.space.insert(key, count);
                self.space.insert(candidate_key, 1);
                return candidate.into();
            }
        }
    }
}

fn key(name: &str) -> UniCase<String> {
    // Keep leading underscores, which mark private modules.
    let trimmed = name.trim_start_matches('_');
    let prefix = &name[..name.len() - trimmed.len()];
    UniCase::new(format!("{prefix}{}", trimmed.to_snake_case()))
}
