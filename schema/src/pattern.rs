use crate::document::{MaxOccurs, Occurs};

/// Cardinality and structure modifiers under which a pattern occurs relative to its parent.
///
/// The four flags are independent. Merging is a logical OR per flag, so a flag that has been set
/// once is never cleared again.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Pattern {
    pub optional: bool,
    pub zero_or_more: bool,
    pub one_or_more: bool,
    pub choice: bool,
    /// The alternation the pattern belongs to, numbered by the parser. Siblings from different
    /// `choice` wrappers never share a group.
    pub choice_group: Option<u32>,
}

impl Pattern {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        !(self.optional || self.zero_or_more || self.one_or_more || self.choice)
    }

    pub fn merge(&mut self, other: Pattern) {
        self.optional |= other.optional;
        self.zero_or_more |= other.zero_or_more;
        self.one_or_more |= other.one_or_more;
        self.choice |= other.choice;
        // The enclosing alternation wins over one nested inside a definition
        if other.choice_group.is_some() {
            self.choice_group = other.choice_group;
        }
    }

    pub fn merged(mut self, other: Pattern) -> Self {
        self.merge(other);
        self
    }

    pub fn with_optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn with_zero_or_more(mut self) -> Self {
        self.zero_or_more = true;
        self
    }

    pub fn with_one_or_more(mut self) -> Self {
        self.one_or_more = true;
        self
    }

    pub fn with_choice(mut self) -> Self {
        self.choice = true;
        self
    }

    /// Marks the pattern as an alternative of `group`, unless it already is one of an outer
    /// alternation, which then also takes the nested alternatives.
    pub fn in_choice(mut self, group: u32) -> Self {
        self.choice = true;
        self.choice_group.get_or_insert(group);
        self
    }

    /// The pattern as it applies to an attribute. Attributes never alternate with each other in
    /// the canonical model, so an attribute reached through a `choice` becomes optional instead.
    pub fn for_attribute(mut self) -> Self {
        if self.choice {
            self.choice = false;
            self.optional = true;
        }
        self.choice_group = None;
        self
    }

    /// Occurrence bounds of this pattern. `oneOrMore` and `zeroOrMore` are strictly wider than
    /// `optional` and win when several flags are set.
    pub fn to_occurs(&self) -> Occurs {
        if self.one_or_more {
            Occurs::new(1, MaxOccurs::Unbounded)
        } else if self.zero_or_more {
            Occurs::new(0, MaxOccurs::Unbounded)
        } else if self.optional {
            Occurs::new(0, MaxOccurs::Count(1))
        } else {
            Occurs::new(1, MaxOccurs::Count(1))
        }
    }
}
