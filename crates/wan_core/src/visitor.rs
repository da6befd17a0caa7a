//! Depth-first traversal over a waveform's scope tree, with per-kind skip
//! flags and ordered scope-name filters.

use crate::scope::{Scope, SignalDesc, SignalKind};

/// The capability set a traversal invokes as it walks the scope tree.
///
/// The root scope is never announced through `enter_scope`/`leave_scope`;
/// only its children and their descendants are.
pub trait Visitor {
    /// Called on entering a non-root scope, before its signals or children.
    fn enter_scope(&mut self, scope: &Scope);
    /// Called after a scope's signals and children have all been visited.
    fn leave_scope(&mut self);
    /// Called for each signal descriptor that passes the active filters.
    fn visit_signal(&mut self, full_scope_name: &str, desc: &SignalDesc);
}

/// The outcome of testing a scope's full name against one scope filter.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ScopeFilterResult {
    /// No filter applies, the filter equals the scope's full name, or the
    /// filter is a (string) prefix of it: emit this scope's signals and
    /// descend into its children.
    VisitAll,
    /// The scope's full name is a (string) prefix of the filter: descend
    /// into children, but do not emit this scope's own signals.
    EnterScopeOnly,
    /// Neither relationship holds: skip this scope and its entire subtree.
    SkipAll,
}

/// Traversal options: per-signal-kind skip flags plus an ordered list of
/// scope-name filters.
#[derive(Clone, Debug, Default)]
pub struct VisitOptions {
    /// Skip all `REGISTER`-kind signals.
    pub skip_registers: bool,
    /// Skip all `WIRE`-kind signals.
    pub skip_wires: bool,
    /// Skip all `INTEGER`-kind signals.
    pub skip_integers: bool,
    /// Scope-name filters. An empty list means "visit everything".
    pub scope_filters: Vec<String>,
}

impl VisitOptions {
    /// Creates options with no skip flags and no scope filters (visits everything).
    pub fn visit_all() -> Self {
        Self::default()
    }

    fn skips(&self, kind: SignalKind) -> bool {
        match kind {
            SignalKind::Register => self.skip_registers,
            SignalKind::Wire => self.skip_wires,
            SignalKind::Integer => self.skip_integers,
        }
    }

    /// Resolves the combined effect of every configured filter against one
    /// scope's full name.
    ///
    /// `VISIT_ALL` from any single filter wins outright; otherwise
    /// `ENTER_SCOPE_ONLY` wins over `SKIP_ALL`.
    pub fn resolve_scope_filter(&self, full_scope_name: &str) -> ScopeFilterResult {
        if self.scope_filters.is_empty() {
            return ScopeFilterResult::VisitAll;
        }
        let mut best = ScopeFilterResult::SkipAll;
        for filter in &self.scope_filters {
            match match_one(filter, full_scope_name) {
                ScopeFilterResult::VisitAll => return ScopeFilterResult::VisitAll,
                ScopeFilterResult::EnterScopeOnly => best = ScopeFilterResult::EnterScopeOnly,
                ScopeFilterResult::SkipAll => {}
            }
        }
        best
    }
}

/// Matches a single filter string against a scope's full name.
///
/// "Proper prefix" here is plain string containment (the filter's
/// characters match the start of the full name, or vice versa) — there is
/// no dotted-component boundary check, matching the source library's own
/// loose matching.
fn match_one(filter: &str, full_scope_name: &str) -> ScopeFilterResult {
    if filter == full_scope_name {
        return ScopeFilterResult::VisitAll;
    }
    if full_scope_name.len() > filter.len() && full_scope_name.starts_with(filter) {
        return ScopeFilterResult::VisitAll;
    }
    if filter.len() > full_scope_name.len() && filter.starts_with(full_scope_name) {
        return ScopeFilterResult::EnterScopeOnly;
    }
    ScopeFilterResult::SkipAll
}

/// Runs a depth-first traversal over `root`'s children (the root itself is
/// never announced), applying `options`' skip flags and scope filters.
pub fn visit(root: &Scope, visitor: &mut dyn Visitor, options: &VisitOptions) {
    for child in &root.sub_scopes {
        visit_scope(child, visitor, options);
    }
}

fn visit_scope(scope: &Scope, visitor: &mut dyn Visitor, options: &VisitOptions) {
    let resolution = options.resolve_scope_filter(&scope.full_scope_name);
    if resolution == ScopeFilterResult::SkipAll {
        return;
    }
    visitor.enter_scope(scope);
    if resolution == ScopeFilterResult::VisitAll {
        for desc in &scope.signals {
            if options.skips(desc.kind) {
                continue;
            }
            visitor.visit_signal(&scope.full_scope_name, desc);
        }
    }
    for child in &scope.sub_scopes {
        visit_scope(child, visitor, options);
    }
    visitor.leave_scope();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::SignalIdx;
    use wan_common::ArenaId;

    #[derive(Default)]
    struct Recorder {
        entered: Vec<String>,
        left: usize,
        signals: Vec<(String, String)>,
    }

    impl Visitor for Recorder {
        fn enter_scope(&mut self, scope: &Scope) {
            self.entered.push(scope.full_scope_name.clone());
        }

        fn leave_scope(&mut self) {
            self.left += 1;
        }

        fn visit_signal(&mut self, full_scope_name: &str, desc: &SignalDesc) {
            self.signals
                .push((full_scope_name.to_string(), desc.name.clone()));
        }
    }

    fn sample_tree() -> Scope {
        let mut root = Scope::root();
        {
            let tbench = root.add_scope("tbench", crate::scope::ScopeKind::Module);
            tbench
                .add_signal(
                    "clk",
                    SignalKind::Wire,
                    false,
                    SignalIdx::from_raw(0),
                )
                .unwrap();
            let dut = tbench.add_scope("DUT", crate::scope::ScopeKind::Module);
            dut.add_signal("q", SignalKind::Register, false, SignalIdx::from_raw(1))
                .unwrap();
            dut.add_signal(
                "count",
                SignalKind::Integer,
                false,
                SignalIdx::from_raw(2),
            )
            .unwrap();
        }
        root
    }

    #[test]
    fn depth_first_signals_before_subscopes() {
        let root = sample_tree();
        let mut rec = Recorder::default();
        visit(&root, &mut rec, &VisitOptions::visit_all());
        assert_eq!(rec.entered, vec!["tbench", "tbench.DUT"]);
        assert_eq!(rec.left, 2);
        assert_eq!(
            rec.signals,
            vec![
                ("tbench".to_string(), "clk".to_string()),
                ("tbench.DUT".to_string(), "q".to_string()),
                ("tbench.DUT".to_string(), "count".to_string()),
            ]
        );
    }

    #[test]
    fn root_itself_is_never_announced() {
        let root = sample_tree();
        let mut rec = Recorder::default();
        visit(&root, &mut rec, &VisitOptions::visit_all());
        assert!(!rec.entered.iter().any(|s| s.is_empty()));
    }

    #[test]
    fn all_skip_flags_set_yields_no_signals() {
        let root = sample_tree();
        let mut rec = Recorder::default();
        let options = VisitOptions {
            skip_registers: true,
            skip_wires: true,
            skip_integers: true,
            scope_filters: Vec::new(),
        };
        visit(&root, &mut rec, &options);
        assert!(rec.signals.is_empty());
        // scopes are still entered even if no signals pass
        assert_eq!(rec.entered, vec!["tbench", "tbench.DUT"]);
    }

    #[test]
    fn scope_filter_prefix_match_emits_within_dut() {
        // Testable property: filter "tbench.D" against DUT scope "tbench.DUT".
        let root = sample_tree();
        let mut rec = Recorder::default();
        let options = VisitOptions {
            scope_filters: vec!["tbench.D".to_string()],
            ..VisitOptions::visit_all()
        };
        visit(&root, &mut rec, &options);
        assert!(rec.signals.iter().all(|(scope, _)| scope == "tbench.DUT"));
        assert!(rec.signals.iter().any(|(scope, _)| scope == "tbench.DUT"));
    }

    #[test]
    fn scope_filter_exact_match_visits_all() {
        let root = sample_tree();
        let mut rec = Recorder::default();
        let options = VisitOptions {
            scope_filters: vec!["tbench.DUT".to_string()],
            ..VisitOptions::visit_all()
        };
        visit(&root, &mut rec, &options);
        assert_eq!(rec.entered, vec!["tbench", "tbench.DUT"]);
        assert_eq!(rec.signals.len(), 2);
    }

    #[test]
    fn scope_filter_ancestor_is_enter_scope_only() {
        let root = sample_tree();
        let mut rec = Recorder::default();
        let options = VisitOptions {
            scope_filters: vec!["tbench.DUT".to_string()],
            ..VisitOptions::visit_all()
        };
        visit(&root, &mut rec, &options);
        // "tbench" is entered (to descend) but emits no signals of its own
        assert!(!rec.signals.iter().any(|(scope, _)| scope == "tbench"));
    }

    #[test]
    fn unrelated_filter_skips_entire_subtree() {
        let root = sample_tree();
        let mut rec = Recorder::default();
        let options = VisitOptions {
            scope_filters: vec!["other".to_string()],
            ..VisitOptions::visit_all()
        };
        visit(&root, &mut rec, &options);
        assert!(rec.entered.is_empty());
        assert!(rec.signals.is_empty());
    }
}
