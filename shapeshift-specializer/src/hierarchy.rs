//! Class hierarchy graph used to decide inheritance chains and `this` assignability

use petgraph::graph::NodeIndex;
use petgraph::{Direction, Graph as PetGraph};
use shapeshift_program::Program;
use std::collections::HashMap;

/// Inheritance graph with edges from superclass to subclass
#[derive(Debug, Clone, Default)]
pub struct ClassHierarchy {
    graph: PetGraph<String, ()>,
    class_to_node: HashMap<String, NodeIndex>,
    exported: HashMap<String, bool>,
}

impl ClassHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the hierarchy of every class in `program`
    pub fn from_program(program: &Program) -> Self {
        let mut hierarchy = Self::new();
        for class in &program.classes {
            hierarchy.get_or_create_node(&class.name);
            hierarchy.exported.insert(class.name.clone(), class.exported);
        }
        for class in &program.classes {
            if let Some(parent) = &class.extends {
                let parent_node = hierarchy.get_or_create_node(parent);
                let child_node = hierarchy.get_or_create_node(&class.name);
                hierarchy.graph.add_edge(parent_node, child_node, ());
            }
        }
        hierarchy
    }

    fn get_or_create_node(&mut self, name: &str) -> NodeIndex {
        if let Some(&node) = self.class_to_node.get(name) {
            return node;
        }
        let node = self.graph.add_node(name.to_string());
        self.class_to_node.insert(name.to_string(), node);
        node
    }

    pub fn contains(&self, class: &str) -> bool {
        self.class_to_node.contains_key(class)
    }

    pub fn is_exported(&self, class: &str) -> bool {
        self.exported.get(class).copied().unwrap_or(false)
    }

    /// Check whether any class in the unit extends `class`
    pub fn has_subclasses(&self, class: &str) -> bool {
        self.class_to_node.get(class).is_some_and(|&node| {
            self.graph
                .neighbors_directed(node, Direction::Outgoing)
                .next()
                .is_some()
        })
    }

    /// Whether `this` in a method of `class` can denote more than one class
    pub fn is_inheritance_chain(&self, class: &str) -> bool {
        self.has_subclasses(class) || self.is_exported(class)
    }

    /// Check whether `class` is `ancestor` or transitively extends it
    pub fn is_subclass_of(&self, class: &str, ancestor: &str) -> bool {
        match (self.class_to_node.get(class), self.class_to_node.get(ancestor)) {
            (Some(&from), Some(&to)) => petgraph::algo::has_path_connecting(&self.graph, to, from, None),
            _ => class == ancestor,
        }
    }
}
