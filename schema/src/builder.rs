use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::{
    definitions::DefinitionTable,
    document::{self, Document, Identifier, Relation},
    pattern::Pattern,
    tree::{Attribute, Element, Reference},
};

/// Converts a resolved pattern tree into a [`Document`].
///
/// Elements are visited depth-first from the start wrapper. Every distinct element is built
/// once: copies of one definition share an identifier, while an element whose content differs
/// from all earlier ones of the same name gets its own, `<name>#<n>`.
pub struct DocumentBuilder<'a> {
    definitions: &'a DefinitionTable,
    document: Document,
    /// Elements built so far under each name, with their identifiers.
    seen: HashMap<&'a str, Vec<(&'a Element, Identifier)>>,
}

impl<'a> DocumentBuilder<'a> {
    pub fn new(definitions: &'a DefinitionTable) -> Self {
        Self {
            definitions,
            document: Document::default(),
            seen: HashMap::new(),
        }
    }

    pub fn build(mut self, start: &'a Element) -> Document {
        let (elements, _) = self.content(start);
        for (element, _) in elements {
            let identifier = self.visit(element);
            if !self.document.roots.contains(&identifier) {
                self.document.roots.push(identifier);
            }
        }
        self.document
    }

    /// Element and attribute patterns that make up the content of `element`, together with the
    /// pattern they occur under. Guarded references contribute the top-level content of the
    /// definition they name.
    fn content(
        &self,
        element: &'a Element,
    ) -> (Vec<(&'a Element, Pattern)>, Vec<(&'a Attribute, Pattern)>) {
        let mut elements: Vec<_> = element.elements.iter().map(|e| (e, e.pattern)).collect();
        let mut attributes: Vec<_> = element
            .attributes
            .iter()
            .map(|a| (a, a.pattern()))
            .collect();

        for reference in &element.references {
            let Some(bodies) = self.definitions.get(&reference.name) else {
                warn!(
                    "Dropping reference to undefined {:?} in {:?}",
                    reference.name, element.name
                );
                continue;
            };
            for body in bodies {
                reference_content(reference, body, &mut elements, &mut attributes);
            }
        }
        (elements, attributes)
    }

    /// The identifier of `element`, and whether it is new.
    fn identify(&mut self, element: &'a Element) -> (Identifier, bool) {
        let built = self.seen.entry(element.name.as_str()).or_default();
        if let Some((_, identifier)) = built.iter().find(|(other, _)| other.same_content(element)) {
            return (identifier.clone(), false);
        }
        let identifier = if built.is_empty() {
            element.name.clone()
        } else {
            let identifier = format!("{}#{}", element.name, built.len() + 1);
            debug!(
                "Element {:?} differs from the earlier ones, building it as {identifier:?}",
                element.name
            );
            identifier
        };
        built.push((element, identifier.clone()));
        (identifier, true)
    }

    fn visit(&mut self, element: &'a Element) -> Identifier {
        let (identifier, new) = self.identify(element);
        if !new {
            return identifier;
        }
        debug!("Building element {identifier:?}");

        // Inserted before the children so parents precede them
        self.document.elements.insert(
            identifier.clone(),
            document::Element {
                identifier: identifier.clone(),
                name: element.name.clone(),
                text: element.has_text,
                data_type: element.data_type,
                facet: element.facet.clone().filter(|facet| !facet.is_empty()),
                ..document::Element::default()
            },
        );

        let (elements, attributes) = self.content(element);

        let mut attribute_relations: Vec<Relation> = Vec::new();
        for (attribute, pattern) in attributes {
            let target = format!("{identifier}@{}", attribute.name);
            if attribute_relations.iter().any(|r| r.target == target) {
                debug!("Ignoring repeated attribute {target:?}");
                continue;
            }
            self.document
                .attributes
                .entry(target.clone())
                .or_insert_with(|| document::Attribute {
                    identifier: target.clone(),
                    name: attribute.name.clone(),
                    data_type: attribute.data_type,
                    facet: attribute.facet.clone().filter(|facet| !facet.is_empty()),
                });
            attribute_relations.push(Relation::new(target, pattern.to_occurs()));
        }

        let mut element_relations: Vec<Relation> = Vec::new();
        let mut choices: IndexMap<Option<u32>, Vec<Identifier>> = IndexMap::new();
        for (child, pattern) in elements {
            let target = self.visit(child);
            let occurs = pattern.to_occurs();
            if let Some(existing) = element_relations.iter_mut().find(|r| r.target == target) {
                // Two slots for the same element fold into one, wide enough for both
                existing.occurs = existing.occurs.widen(occurs);
                continue;
            }
            if pattern.choice {
                choices
                    .entry(pattern.choice_group)
                    .or_default()
                    .push(target.clone());
            }
            element_relations.push(Relation::new(target, occurs));
        }

        for members in choices.values().filter(|members| members.len() > 1) {
            let group = members.join("+");
            for relation in &mut element_relations {
                if members.contains(&relation.target) {
                    relation.choice = Some(group.clone());
                }
            }
        }

        if let Some(entity) = self.document.elements.get_mut(&identifier) {
            entity.element_relations = element_relations;
            entity.attribute_relations = attribute_relations;
        }
        identifier
    }
}

fn reference_content<'a>(
    reference: &Reference,
    body: &'a Element,
    elements: &mut Vec<(&'a Element, Pattern)>,
    attributes: &mut Vec<(&'a Attribute, Pattern)>,
) {
    for child in &body.elements {
        elements.push((child, child.pattern.merged(reference.pattern)));
    }
    for attribute in &body.attributes {
        attributes.push((
            attribute,
            attribute.pattern().merged(reference.pattern).for_attribute(),
        ));
    }
}

/// Builds the [`Document`] for a resolved start wrapper.
pub fn build_document(start: &Element, definitions: &DefinitionTable) -> Document {
    DocumentBuilder::new(definitions).build(start)
}
