//! Multi-Runtime Fan-Out
//!
//! Lets several independent host runtimes observe the same logical state at
//! once. A [`MultiAdapter`] wraps N backing adapters and is itself an
//! [`Adapter`]; every dependency it creates is a [`CompositeDependency`]
//! holding one sub-dependency per backing runtime.
//!
//! `depend()` registers with every member and `notify()` notifies every
//! member unconditionally, regardless of which runtime's context triggered
//! the read. The scope probe is a conservative OR: tracking is never
//! skipped just because one runtime happens to be idle.

use std::any::Any;
use std::sync::Arc;

use smallvec::SmallVec;
use tracing::debug;

use crate::adapter::{Adapter, Dependency, DisposeCallback};
use crate::error::{Result, TrellisError};

type Member = (Arc<dyn Adapter>, Arc<dyn Dependency>);

/// One logical dependency fanned out to N per-runtime dependencies.
pub struct CompositeDependency {
    members: SmallVec<[Member; 2]>,
}

impl CompositeDependency {
    fn new(adapters: &[Arc<dyn Adapter>]) -> Self {
        Self {
            members: adapters
                .iter()
                .map(|adapter| (adapter.clone(), adapter.create()))
                .collect(),
        }
    }

    /// Number of member dependencies.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// The sub-dependency created by the `index`-th backing adapter.
    pub fn member(&self, index: usize) -> Option<&Arc<dyn Dependency>> {
        self.members.get(index).map(|(_, dep)| dep)
    }
}

impl Dependency for CompositeDependency {
    fn depend(&self) {
        for (_, dep) in &self.members {
            dep.depend();
        }
    }

    fn notify(&self) {
        for (_, dep) in &self.members {
            dep.notify();
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// An [`Adapter`] that fans every dependency out to N backing adapters.
pub struct MultiAdapter {
    adapters: SmallVec<[Arc<dyn Adapter>; 2]>,
}

impl MultiAdapter {
    /// Build a fan-out over the given adapters.
    ///
    /// Fails immediately with [`TrellisError::EmptyAdapters`] when the list
    /// is empty.
    pub fn new(adapters: Vec<Arc<dyn Adapter>>) -> Result<Self> {
        if adapters.is_empty() {
            return Err(TrellisError::EmptyAdapters);
        }
        Ok(Self {
            adapters: adapters.into_iter().collect(),
        })
    }

    /// Number of backing adapters.
    pub fn adapter_count(&self) -> usize {
        self.adapters.len()
    }
}

impl Adapter for MultiAdapter {
    fn create(&self) -> Arc<dyn Dependency> {
        Arc::new(CompositeDependency::new(&self.adapters))
    }

    /// Active if any member reports active; members without a probe count
    /// as active through their default.
    fn is_in_scope(&self) -> bool {
        self.adapters.iter().any(|adapter| adapter.is_in_scope())
    }

    /// Forward `callback` to each member adapter, passing that adapter's
    /// own sub-dependency. Members without a dispose hook drop the request
    /// through their default. Only meaningful for a composite handle;
    /// anything else is skipped.
    fn on_dispose(&self, callback: DisposeCallback, dependency: &Arc<dyn Dependency>) {
        let Some(composite) = dependency.as_any().downcast_ref::<CompositeDependency>() else {
            debug!("dispose requested on a non-composite dependency, skipping");
            return;
        };
        for (adapter, dep) in &composite.members {
            adapter.on_dispose(callback.clone(), dep);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct CountingDependency {
        depends: AtomicUsize,
        notifies: AtomicUsize,
    }

    impl CountingDependency {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                depends: AtomicUsize::new(0),
                notifies: AtomicUsize::new(0),
            })
        }
    }

    impl Dependency for CountingDependency {
        fn depend(&self) {
            self.depends.fetch_add(1, Ordering::SeqCst);
        }

        fn notify(&self) {
            self.notifies.fetch_add(1, Ordering::SeqCst);
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    struct ProbeAdapter {
        in_scope: AtomicBool,
        created: AtomicUsize,
        disposed: AtomicUsize,
    }

    impl ProbeAdapter {
        fn new(in_scope: bool) -> Arc<Self> {
            Arc::new(Self {
                in_scope: AtomicBool::new(in_scope),
                created: AtomicUsize::new(0),
                disposed: AtomicUsize::new(0),
            })
        }
    }

    impl Adapter for ProbeAdapter {
        fn create(&self) -> Arc<dyn Dependency> {
            self.created.fetch_add(1, Ordering::SeqCst);
            CountingDependency::new()
        }

        fn is_in_scope(&self) -> bool {
            self.in_scope.load(Ordering::SeqCst)
        }

        fn on_dispose(&self, _callback: DisposeCallback, _dependency: &Arc<dyn Dependency>) {
            self.disposed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn counting(dep: &Arc<dyn Dependency>) -> &CountingDependency {
        dep.as_any().downcast_ref::<CountingDependency>().unwrap()
    }

    #[test]
    fn empty_adapter_list_is_rejected() {
        let result = MultiAdapter::new(Vec::new());
        assert!(matches!(result, Err(TrellisError::EmptyAdapters)));
    }

    #[test]
    fn create_builds_one_member_per_adapter() {
        let a = ProbeAdapter::new(true);
        let b = ProbeAdapter::new(true);
        let multi =
            MultiAdapter::new(vec![a.clone() as Arc<dyn Adapter>, b.clone() as _]).unwrap();

        let dep = multi.create();
        let composite = dep.as_any().downcast_ref::<CompositeDependency>().unwrap();

        assert_eq!(composite.len(), 2);
        assert_eq!(a.created.load(Ordering::SeqCst), 1);
        assert_eq!(b.created.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn depend_and_notify_fan_out_to_every_member() {
        let multi = MultiAdapter::new(vec![
            ProbeAdapter::new(true) as Arc<dyn Adapter>,
            ProbeAdapter::new(false) as _,
        ])
        .unwrap();
        let dep = multi.create();

        dep.depend();
        dep.notify();
        dep.notify();

        let composite = dep.as_any().downcast_ref::<CompositeDependency>().unwrap();
        for index in 0..composite.len() {
            let member = counting(composite.member(index).unwrap());
            assert_eq!(member.depends.load(Ordering::SeqCst), 1);
            assert_eq!(member.notifies.load(Ordering::SeqCst), 2);
        }
    }

    #[test]
    fn scope_probe_is_an_or_over_members() {
        let active = ProbeAdapter::new(true);
        let idle = ProbeAdapter::new(false);

        let multi =
            MultiAdapter::new(vec![idle.clone() as Arc<dyn Adapter>, active.clone() as _])
                .unwrap();
        assert!(multi.is_in_scope());

        active.in_scope.store(false, Ordering::SeqCst);
        assert!(!multi.is_in_scope());
    }

    #[test]
    fn dispose_forwards_to_each_member_adapter() {
        let a = ProbeAdapter::new(true);
        let b = ProbeAdapter::new(true);
        let multi =
            MultiAdapter::new(vec![a.clone() as Arc<dyn Adapter>, b.clone() as _]).unwrap();

        let dep = multi.create();
        multi.on_dispose(Arc::new(|| {}), &dep);

        assert_eq!(a.disposed.load(Ordering::SeqCst), 1);
        assert_eq!(b.disposed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dispose_skips_non_composite_handles() {
        let a = ProbeAdapter::new(true);
        let multi = MultiAdapter::new(vec![a.clone() as Arc<dyn Adapter>]).unwrap();

        let plain: Arc<dyn Dependency> = CountingDependency::new();
        multi.on_dispose(Arc::new(|| {}), &plain);

        assert_eq!(a.disposed.load(Ordering::SeqCst), 0);
    }
}
