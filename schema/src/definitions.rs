use indexmap::IndexMap;

use crate::tree::Element;

/// Maps a definition name to its alternative bodies.
///
/// A grammar may define the same name more than once; the bodies are then alternatives that are
/// all inlined at every use site. Each body is a wrapper [`Element`] named after the definition.
#[derive(Clone, Debug, Default)]
pub struct DefinitionTable {
    definitions: IndexMap<String, Vec<Element>>,
}

impl DefinitionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>, body: Element) {
        self.definitions.entry(name.into()).or_default().push(body);
    }

    pub fn get(&self, name: &str) -> Option<&[Element]> {
        self.definitions.get(name).map(Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Temporarily removes the bodies of `name` so they can be mutated while the rest of the
    /// table is consulted. Must be paired with [`DefinitionTable::restore`].
    pub(crate) fn take(&mut self, name: &str) -> Option<Vec<Element>> {
        self.definitions.get_mut(name).map(std::mem::take)
    }

    pub(crate) fn restore(&mut self, name: &str, bodies: Vec<Element>) {
        if let Some(slot) = self.definitions.get_mut(name) {
            *slot = bodies;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_definitions_are_alternatives() {
        let mut table = DefinitionTable::new();
        table.add("inline", Element::new("inline"));
        table.add("block", Element::new("block"));
        table.add("inline", Element::new("inline"));

        assert_eq!(table.len(), 2);
        assert_eq!(table.get("inline").map(<[_]>::len), Some(2));
        assert_eq!(table.names().collect::<Vec<_>>(), ["inline", "block"]);
        assert!(table.get("missing").is_none());
    }

    #[test]
    fn take_keeps_the_name_registered() {
        let mut table = DefinitionTable::new();
        table.add("a", Element::new("a"));

        let bodies = table.take("a").unwrap();
        assert!(table.contains("a"));
        assert_eq!(table.get("a").map(<[_]>::len), Some(0));

        table.restore("a", bodies);
        assert_eq!(table.get("a").map(<[_]>::len), Some(1));
    }
}
