//! Hierarchical scope tree and per-scope signal descriptors.

use crate::signal::SignalIdx;
use serde::{Deserialize, Serialize};

/// The instance name given to the distinguished root scope of every waveform.
pub const ROOT_INSTANCE_NAME: &str = "(root)";

/// The kind of a hierarchical scope, matching the VCD/FST scope-type vocabulary.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum ScopeKind {
    /// A module instance.
    Module,
    /// A Verilog `task` block.
    Task,
    /// A Verilog `function` block.
    Function,
    /// A `begin/end` block.
    Block,
}

/// The kind of a declared signal.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum SignalKind {
    /// A `reg`-like, clocked storage element.
    Register,
    /// A `wire`-like combinational net.
    Wire,
    /// An `integer` variable.
    Integer,
}

/// A per-scope declaration of a signal: its name, kind, and a possibly-aliased index.
///
/// An alias descriptor (`alias == true`) refers to a [`Signal`](crate::signal::Signal)
/// also reachable through another, earlier descriptor; the referenced signal
/// is only ever destroyed once, when the waveform itself is dropped.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct SignalDesc {
    /// The signal's name as declared in this scope.
    pub name: String,
    /// The signal's declared kind.
    pub kind: SignalKind,
    /// Whether this descriptor reuses a signal already registered elsewhere.
    pub alias: bool,
    /// The signal this descriptor refers to.
    pub idx: SignalIdx,
}

/// A node in the hierarchical scope tree.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Scope {
    /// This scope's own name, e.g. `"DUT"`.
    pub instance_name: String,
    /// Dotted path from the root, e.g. `"tbench.DUT"`. Empty for the root.
    pub full_scope_name: String,
    /// The name under which this scope was declared. Equal to `instance_name`
    /// unless a caller builds the scope tree directly rather than through
    /// [`Scope::add_scope`].
    pub declared_name: String,
    /// The scope's kind.
    pub kind: ScopeKind,
    /// Child scopes, in declaration order.
    pub sub_scopes: Vec<Scope>,
    /// Signal descriptors declared directly in this scope, in declaration order.
    pub signals: Vec<SignalDesc>,
}

impl Scope {
    /// Creates the distinguished root scope of a waveform.
    pub fn root() -> Self {
        Self {
            instance_name: ROOT_INSTANCE_NAME.to_string(),
            full_scope_name: String::new(),
            declared_name: ROOT_INSTANCE_NAME.to_string(),
            kind: ScopeKind::Module,
            sub_scopes: Vec::new(),
            signals: Vec::new(),
        }
    }

    /// True if this is the distinguished root scope (no parent, empty full name).
    pub fn is_root(&self) -> bool {
        self.full_scope_name.is_empty()
    }

    /// Returns the existing child matching `instance_name`, or creates one of
    /// the given `kind` if none exists.
    ///
    /// Kind conflicts on an existing child are not re-checked: the first
    /// scope added under a given instance name wins, matching the source
    /// library's behavior (see the design notes on scope-kind conflicts).
    pub fn add_scope(&mut self, instance_name: &str, kind: ScopeKind) -> &mut Scope {
        if let Some(pos) = self
            .sub_scopes
            .iter()
            .position(|s| s.instance_name == instance_name)
        {
            return &mut self.sub_scopes[pos];
        }
        let full_scope_name = if self.is_root() {
            instance_name.to_string()
        } else {
            format!("{}.{}", self.full_scope_name, instance_name)
        };
        self.sub_scopes.push(Scope {
            instance_name: instance_name.to_string(),
            full_scope_name,
            declared_name: instance_name.to_string(),
            kind,
            sub_scopes: Vec::new(),
            signals: Vec::new(),
        });
        self.sub_scopes.last_mut().expect("just pushed")
    }

    /// Appends a signal descriptor to this scope.
    ///
    /// Fails with [`crate::error::WaveformError::DuplicateSignalInScope`] if a
    /// descriptor with the same name already exists directly in this scope.
    pub fn add_signal(
        &mut self,
        name: &str,
        kind: SignalKind,
        alias: bool,
        idx: SignalIdx,
    ) -> Result<(), crate::error::WaveformError> {
        if self.signals.iter().any(|d| d.name == name) {
            return Err(crate::error::WaveformError::DuplicateSignalInScope {
                scope: self.full_scope_name.clone(),
                name: name.to_string(),
            });
        }
        self.signals.push(SignalDesc {
            name: name.to_string(),
            kind,
            alias,
            idx,
        });
        Ok(())
    }

    /// Depth-first search for the signal descriptor named `signal_name` in
    /// the scope whose full name is `full_scope_name`.
    pub fn find_signal_desc(&self, full_scope_name: &str, signal_name: &str) -> Option<&SignalDesc> {
        if self.full_scope_name == full_scope_name {
            return self.signals.iter().find(|d| d.name == signal_name);
        }
        self.sub_scopes
            .iter()
            .find_map(|child| child.find_signal_desc(full_scope_name, signal_name))
    }

    /// Depth-first search for the scope whose full name is `full_scope_name`.
    pub fn find_scope(&self, full_scope_name: &str) -> Option<&Scope> {
        if self.full_scope_name == full_scope_name {
            return Some(self);
        }
        self.sub_scopes
            .iter()
            .find_map(|child| child.find_scope(full_scope_name))
    }

    /// Mutable counterpart of [`Scope::find_scope`].
    pub fn find_scope_mut(&mut self, full_scope_name: &str) -> Option<&mut Scope> {
        if self.full_scope_name == full_scope_name {
            return Some(self);
        }
        self.sub_scopes
            .iter_mut()
            .find_map(|child| child.find_scope_mut(full_scope_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::SignalIdx;
    use wan_common::ArenaId;

    #[test]
    fn root_has_empty_full_name() {
        let root = Scope::root();
        assert!(root.is_root());
        assert_eq!(root.full_scope_name, "");
    }

    #[test]
    fn add_scope_under_root_has_no_prefix() {
        let mut root = Scope::root();
        let tb = root.add_scope("tbench", ScopeKind::Module);
        assert_eq!(tb.full_scope_name, "tbench");
    }

    #[test]
    fn add_scope_nested_dotted_path() {
        let mut root = Scope::root();
        let tb = root.add_scope("tbench", ScopeKind::Module);
        let dut = tb.add_scope("DUT", ScopeKind::Module);
        assert_eq!(dut.full_scope_name, "tbench.DUT");
    }

    #[test]
    fn add_scope_reuses_existing_child_regardless_of_kind() {
        let mut root = Scope::root();
        root.add_scope("tbench", ScopeKind::Module);
        let tb_again = root.add_scope("tbench", ScopeKind::Task);
        // first write wins: kind stays Module even though we asked for Task
        assert_eq!(tb_again.kind, ScopeKind::Module);
        assert_eq!(root.sub_scopes.len(), 1);
    }

    #[test]
    fn add_signal_rejects_duplicate_name() {
        let mut root = Scope::root();
        root.add_signal("clk", SignalKind::Wire, false, SignalIdx::from_raw(0))
            .unwrap();
        let err = root
            .add_signal("clk", SignalKind::Wire, false, SignalIdx::from_raw(1))
            .unwrap_err();
        assert_eq!(
            err,
            crate::error::WaveformError::DuplicateSignalInScope {
                scope: String::new(),
                name: "clk".into(),
            }
        );
    }

    #[test]
    fn find_signal_desc_dfs() {
        let mut root = Scope::root();
        let tb = root.add_scope("tbench", ScopeKind::Module);
        let dut = tb.add_scope("DUT", ScopeKind::Module);
        dut.add_signal("q", SignalKind::Register, false, SignalIdx::from_raw(3))
            .unwrap();

        let found = root.find_signal_desc("tbench.DUT", "q").unwrap();
        assert_eq!(found.idx, SignalIdx::from_raw(3));
        assert!(root.find_signal_desc("tbench.DUT", "missing").is_none());
        assert!(root.find_signal_desc("nope", "q").is_none());
    }

    #[test]
    fn find_scope_dfs() {
        let mut root = Scope::root();
        root.add_scope("tbench", ScopeKind::Module)
            .add_scope("DUT", ScopeKind::Module);
        assert!(root.find_scope("tbench.DUT").is_some());
        assert!(root.find_scope("tbench.MISSING").is_none());
    }
}
