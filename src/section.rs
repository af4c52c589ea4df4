/// Named section of the final document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Section title
    pub name: String,

    /// Section text
    pub text: String,
}

/// Insertion-ordered mapping from section name to text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionSet {
    sections: Vec<Section>,
}

impl SectionSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a section, replacing the text in place if the name exists.
    pub fn insert(&mut self, name: impl Into<String>, text: impl Into<String>) {
        let name = name.into();
        let text = text.into();

        match self.sections.iter_mut().find(|s| s.name == name) {
            Some(existing) => existing.text = text,
            None => self.sections.push(Section { name, text }),
        }
    }

    /// Returns the text of a section.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.sections
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.text.as_str())
    }

    /// Iterates sections in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter()
    }

    /// Returns the number of sections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Returns true if there are no sections.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Applies `f` to the text of a section, if present.
    pub fn update(&mut self, name: &str, f: impl FnOnce(&str) -> String) {
        if let Some(section) = self.sections.iter_mut().find(|s| s.name == name) {
            section.text = f(&section.text);
        }
    }
}

impl<N: Into<String>, T: Into<String>> FromIterator<(N, T)> for SectionSet {
    fn from_iter<I: IntoIterator<Item = (N, T)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (name, text) in iter {
            set.insert(name, text);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order() {
        let set: SectionSet = [("Introduction", "a"), ("Summary", "b"), ("Technical Details", "c")]
            .into_iter()
            .collect();

        let names: Vec<_> = set.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Introduction", "Summary", "Technical Details"]);
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut set = SectionSet::new();
        set.insert("Introduction", "old");
        set.insert("Summary", "b");
        set.insert("Introduction", "new");

        assert_eq!(set.len(), 2);
        assert_eq!(set.get("Introduction"), Some("new"));
        assert_eq!(set.iter().next().unwrap().name, "Introduction");
    }

    #[test]
    fn test_update() {
        let mut set = SectionSet::new();
        set.insert("Summary", "hello");
        set.update("Summary", str::to_uppercase);
        set.update("Missing", |_| unreachable!());

        assert_eq!(set.get("Summary"), Some("HELLO"));
    }
}
