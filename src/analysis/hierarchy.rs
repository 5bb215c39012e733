//! Batch-wide class hierarchy and method reachability.
//!
//! The hierarchy is built once per batch from the full set of analyses and
//! passed by reference to consumers; it is never mutated after the build.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use crate::core::facts::{CallReceiver, ClassKind, MethodDecl, NameRefKind};
use crate::core::{FileAnalysis, UnusedMethod};

#[derive(Clone, Debug)]
pub struct ClassNode {
    pub name: String,
    pub fqcn: String,
    pub kind: ClassKind,
    pub file: PathBuf,
    pub extends: Option<String>,
    pub implements: Vec<String>,
    pub methods: Vec<MethodDecl>,
}

/// A reachable call target. `receiver: None` is an instance call whose
/// receiver type is unknown statically and matches any class.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CallSignature {
    pub receiver: Option<String>,
    pub method: String,
}

impl CallSignature {
    fn new(receiver: Option<&str>, method: &str) -> Self {
        Self {
            receiver: receiver.map(|r| short_name(r).to_lowercase()),
            method: method.to_lowercase(),
        }
    }
}

pub struct ClassHierarchy {
    nodes: Vec<ClassNode>,
    /// Short names and FQCNs both resolve to node indices
    index: HashMap<String, usize>,
}

impl ClassHierarchy {
    pub fn build(analyses: &[FileAnalysis]) -> Self {
        let mut nodes = Vec::new();
        let mut index = HashMap::new();

        for analysis in analyses {
            let Some(facts) = analysis.php() else {
                continue;
            };
            for class in &facts.classes {
                let node = ClassNode {
                    name: class.name.clone(),
                    fqcn: class.fqcn.clone(),
                    kind: class.kind,
                    file: analysis.path.clone(),
                    extends: class.extends.clone(),
                    implements: class.implements.clone(),
                    methods: class.methods.clone(),
                };
                let idx = nodes.len();
                index.insert(class.name.to_lowercase(), idx);
                index.insert(class.fqcn.to_lowercase(), idx);
                nodes.push(node);
            }
        }

        Self { nodes, index }
    }

    pub fn classes(&self) -> &[ClassNode] {
        &self.nodes
    }

    pub fn get(&self, name: &str) -> Option<&ClassNode> {
        self.index
            .get(&name.to_lowercase())
            .or_else(|| self.index.get(&short_name(name).to_lowercase()))
            .map(|&idx| &self.nodes[idx])
    }

    /// Ancestors ordered nearest-first. Terminates on cycles and on
    /// parents that are not part of the batch.
    pub fn parent_classes(&self, name: &str) -> Vec<String> {
        let mut parents = Vec::new();
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(short_name(name).to_lowercase());

        let mut current = self.get(name).and_then(|node| node.extends.clone());
        while let Some(parent) = current {
            let key = short_name(&parent).to_lowercase();
            if !visited.insert(key) {
                break;
            }
            parents.push(parent.clone());
            current = self.get(&parent).and_then(|node| node.extends.clone());
        }

        parents
    }

    pub fn child_classes(&self, name: &str) -> Vec<String> {
        let target = short_name(name).to_lowercase();
        self.nodes
            .iter()
            .filter(|node| {
                node.extends
                    .as_deref()
                    .is_some_and(|parent| short_name(parent).to_lowercase() == target)
            })
            .map(|node| node.name.clone())
            .collect()
    }

    /// Transitive descendants, cycle-safe
    fn descendants(&self, name: &str) -> Vec<String> {
        let mut result = Vec::new();
        let mut queue = vec![short_name(name).to_string()];
        let mut visited: HashSet<String> = HashSet::new();

        while let Some(current) = queue.pop() {
            if !visited.insert(current.to_lowercase()) {
                continue;
            }
            for child in self.child_classes(&current) {
                result.push(child.clone());
                queue.push(child);
            }
        }

        result
    }

    /// The reachable-call-signature set for a batch: instance calls,
    /// `self::`/`static::`/`parent::` static calls and constructor calls,
    /// each resolved against the declaring file's classes.
    pub fn method_usage(&self, analyses: &[FileAnalysis]) -> HashSet<CallSignature> {
        let mut usage = HashSet::new();

        for analysis in analyses {
            let Some(facts) = analysis.php() else {
                continue;
            };

            for call in &facts.calls {
                let enclosing = facts
                    .classes
                    .iter()
                    .find(|class| class.span.contains(call.line))
                    .map(|class| class.name.as_str());

                match &call.receiver {
                    CallReceiver::This | CallReceiver::SelfType | CallReceiver::LateStatic => {
                        // resolves within the enclosing class or its chain
                        if let Some(class) = enclosing {
                            usage.insert(CallSignature::new(Some(class), &call.method));
                        } else {
                            usage.insert(CallSignature::new(None, &call.method));
                        }
                    }
                    CallReceiver::Parent => {
                        let parent = enclosing
                            .and_then(|class| self.get(class))
                            .and_then(|node| node.extends.clone());
                        if let Some(parent) = parent {
                            usage.insert(CallSignature::new(Some(&parent), &call.method));
                        }
                    }
                    CallReceiver::Class(class) => {
                        usage.insert(CallSignature::new(Some(class), &call.method));
                    }
                    CallReceiver::Instance => {
                        usage.insert(CallSignature::new(None, &call.method));
                    }
                    CallReceiver::Function => {}
                }
            }

            for name_ref in &facts.name_refs {
                if name_ref.kind == NameRefKind::New {
                    usage.insert(CallSignature::new(Some(&name_ref.name), "__construct"));
                }
            }
        }

        usage
    }

    /// A method is used if any reachable call resolves to it, directly or
    /// through a subclass, or if an implemented interface declares it
    /// (interface contracts cannot be proven dead by call-site analysis).
    pub fn is_method_used(
        &self,
        class: &str,
        method: &str,
        usage: &HashSet<CallSignature>,
    ) -> bool {
        let method_key = method.to_lowercase();

        if usage.contains(&CallSignature::new(None, method)) {
            return true;
        }

        let mut receivers = vec![short_name(class).to_string()];
        receivers.extend(self.descendants(class));
        for receiver in &receivers {
            if usage.contains(&CallSignature::new(Some(receiver), method)) {
                return true;
            }
        }

        self.interfaces_of(class)
            .iter()
            .filter_map(|iface| self.get(iface))
            .any(|node| {
                node.kind == ClassKind::Interface
                    && node
                        .methods
                        .iter()
                        .any(|m| m.name.to_lowercase() == method_key)
            })
    }

    /// Interfaces implemented by the class or any ancestor
    fn interfaces_of(&self, class: &str) -> Vec<String> {
        let mut interfaces = Vec::new();
        let mut chain = vec![class.to_string()];
        chain.extend(self.parent_classes(class));

        for link in chain {
            if let Some(node) = self.get(&link) {
                interfaces.extend(node.implements.iter().cloned());
            }
        }

        interfaces
    }
}

fn short_name(name: &str) -> &str {
    name.rsplit('\\').next().unwrap_or(name)
}

/// Batch-wide unused-method detection across the hierarchy. Public and
/// magic methods are never reported.
pub fn find_unused_methods(
    hierarchy: &ClassHierarchy,
    analyses: &[FileAnalysis],
) -> Vec<UnusedMethod> {
    let usage = hierarchy.method_usage(analyses);
    let mut unused = Vec::new();

    for node in hierarchy.classes() {
        if node.kind != ClassKind::Class {
            continue;
        }
        for method in &node.methods {
            if method.visibility.is_public() || method.name.starts_with("__") {
                continue;
            }
            if !hierarchy.is_method_used(&node.name, &method.name, &usage) {
                unused.push(UnusedMethod {
                    file: node.file.clone(),
                    class: node.name.clone(),
                    method: method.name.clone(),
                    span: method.span,
                });
            }
        }
    }

    unused
}
