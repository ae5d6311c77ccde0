//! Inlines named definitions into their use sites.

use std::collections::HashMap;

use tracing::{debug, trace, warn};

use crate::{
    definitions::DefinitionTable,
    tree::{Element, Reference},
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum State {
    InProgress,
    Resolved,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Resolution {
    Resolved,
    /// The definition is being resolved further up the call stack.
    Recursive,
    Missing,
}

/// Substitutes [`Reference`]s with the content of the definitions they name.
///
/// Every definition is resolved at most once. References that would lead back into a definition
/// that is currently being resolved, as well as references from an element to itself, are kept
/// in place. These guarded references are the only ones left after resolution.
pub struct Resolver<'d> {
    definitions: &'d mut DefinitionTable,
    states: HashMap<String, State>,
}

impl<'d> Resolver<'d> {
    pub fn new(definitions: &'d mut DefinitionTable) -> Self {
        Self {
            definitions,
            states: HashMap::new(),
        }
    }

    /// Resolves all references in `element` and its descendants, in place.
    pub fn substitute(&mut self, element: &mut Element) {
        let references = std::mem::take(&mut element.references);
        let mut kept = Vec::new();

        for mut reference in references {
            if reference.name == element.name {
                // Inlining a self-reference would never terminate. Only this reference is kept,
                // the element's other references are still substituted.
                trace!("Keeping self-reference {:?}", reference.name);
                kept.push(reference);
                continue;
            }
            if reference.substituted {
                kept.push(reference);
                continue;
            }
            reference.substituted = true;

            match self.resolve_definition(&reference.name) {
                Resolution::Resolved => self.inline(element, &reference, &mut kept),
                Resolution::Recursive => {
                    debug!(
                        "Keeping recursive reference {:?} in {:?}",
                        reference.name, element.name
                    );
                    kept.push(reference);
                }
                Resolution::Missing => {
                    warn!(
                        "Reference to undefined {:?} in {:?}",
                        reference.name, element.name
                    );
                    kept.push(reference);
                }
            }
        }
        element.references = kept;

        self.resolve_attribute_values(element);
        for child in &mut element.elements {
            self.substitute(child);
        }
    }

    fn resolve_definition(&mut self, name: &str) -> Resolution {
        match self.states.get(name) {
            Some(State::Resolved) => return Resolution::Resolved,
            Some(State::InProgress) => return Resolution::Recursive,
            None => {}
        }
        let Some(mut bodies) = self.definitions.take(name) else {
            return Resolution::Missing;
        };

        self.states.insert(name.to_string(), State::InProgress);
        for body in &mut bodies {
            self.substitute(body);
        }
        self.definitions.restore(name, bodies);
        self.states.insert(name.to_string(), State::Resolved);
        trace!("Resolved definition {name:?}");
        Resolution::Resolved
    }

    /// Appends the content of every body of `reference`'s definition to `element`.
    fn inline(&self, element: &mut Element, reference: &Reference, kept: &mut Vec<Reference>) {
        let Some(bodies) = self.definitions.get(&reference.name) else {
            return;
        };
        for body in bodies {
            for child in &body.elements {
                let mut child = child.clone();
                child.pattern.merge(reference.pattern);
                element.elements.push(child);
            }
            for attribute in &body.attributes {
                let mut attribute = attribute.clone();
                attribute.merge_pattern(reference.pattern);
                element.attributes.push(attribute);
            }
            // Guarded references of the body now also apply here
            for nested in &body.references {
                let mut nested = nested.clone();
                nested.pattern.merge(reference.pattern);
                nested.substituted = true;
                kept.push(nested);
            }

            element.has_text |= body.has_text;
            if element.data_type.is_none() {
                element.data_type = body.data_type;
            }
            if element.facet.is_none() {
                element.facet.clone_from(&body.facet);
            }
        }
    }

    /// Folds `<attribute><ref/></attribute>` value definitions into the attributes' types.
    fn resolve_attribute_values(&mut self, element: &mut Element) {
        for attribute in &mut element.attributes {
            let Some(name) = attribute.value_reference.take() else {
                continue;
            };
            if self.resolve_definition(&name) == Resolution::Missing {
                warn!(
                    "Attribute {:?} refers to undefined {name:?}, treating it as text",
                    attribute.name
                );
                continue;
            }
            for body in self.definitions.get(&name).unwrap_or_default() {
                if attribute.data_type.is_none() {
                    attribute.data_type = body.data_type;
                }
                if attribute.facet.is_none() {
                    attribute.facet = body.facet.clone().filter(|facet| !facet.is_empty());
                }
            }
        }
    }
}
