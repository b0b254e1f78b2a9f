//! Document-level class list

use cadence_core::sync::lock;
use rustc_hash::FxHashSet;
use std::sync::Mutex;

/// The root element whose class list carries the theme
pub trait DocumentClass: Send + Sync {
    /// Add or remove `class`
    fn set_class(&self, class: &str, enabled: bool);

    fn has_class(&self, class: &str) -> bool;
}

/// In-memory class list
#[derive(Debug, Default)]
pub struct DocumentRoot {
    classes: Mutex<FxHashSet<String>>,
}

impl DocumentRoot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current classes, sorted
    pub fn classes(&self) -> Vec<String> {
        let mut classes: Vec<String> = lock(&self.classes).iter().cloned().collect();
        classes.sort_unstable();
        classes
    }
}

impl DocumentClass for DocumentRoot {
    fn set_class(&self, class: &str, enabled: bool) {
        let mut classes = lock(&self.classes);
        if enabled {
            classes.insert(class.to_string());
        } else {
            classes.remove(class);
        }
    }

    fn has_class(&self, class: &str) -> bool {
        lock(&self.classes).contains(class)
    }
}
