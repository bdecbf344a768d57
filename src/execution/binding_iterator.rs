use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use super::diagnostics::{DiagnosticSink, LogSink};
use super::errors::ExecutionError;
use super::registry::ConnectionRegistry;
use super::sql_iterator::{CancelHandle, SqlIterator};
use crate::query_planner::{Binding, CompatibleRelationGroup, NodeRelation};
use crate::relational::{ProjectionSpec, Relation};
use crate::sql_generator::build_select;

/// Streams the bindings of a translated pattern.
///
/// Groups run one statement at a time, and only when the bindings of the
/// previous group are used up. Every row yields one binding per group
/// member that accepts it.
pub struct BindingIterator {
    groups: VecDeque<CompatibleRelationGroup>,
    registry: Arc<ConnectionRegistry>,
    sink: Arc<dyn DiagnosticSink>,
    cancel: CancelHandle,
    current: Option<(Vec<NodeRelation>, SqlIterator)>,
    pending: VecDeque<Binding>,
    failed: bool,
}

impl BindingIterator {
    pub fn new(groups: Vec<CompatibleRelationGroup>, registry: Arc<ConnectionRegistry>) -> Self {
        BindingIterator {
            groups: groups.into(),
            registry,
            sink: Arc::new(LogSink),
            cancel: CancelHandle::new(),
            current: None,
            pending: VecDeque::new(),
            failed: false,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Cancels whichever statement is running.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Stops iteration and releases the running statement.
    pub fn close(&mut self) -> Result<(), ExecutionError> {
        self.groups.clear();
        self.pending.clear();
        match self.current.take() {
            Some((_, mut rows)) => rows.close(),
            None => Ok(()),
        }
    }

    fn start(&mut self, group: CompatibleRelationGroup) -> Result<(), ExecutionError> {
        let relation = group.base_relation();
        match &relation {
            Relation::Empty => {}
            Relation::True => {
                let no_columns = BTreeMap::<ProjectionSpec, String>::new();
                self.pending
                    .extend(group.members().iter().filter_map(|m| m.make_binding(&no_columns)));
            }
            Relation::Rows(data) => {
                let connection = self.registry.get(data.database.name())?;
                let statement = build_select(&relation)?;
                let rows = SqlIterator::new(statement, connection)
                    .with_sink(Arc::clone(&self.sink))
                    .with_cancel_handle(self.cancel.clone());
                self.current = Some((group.members().to_vec(), rows));
            }
        }
        Ok(())
    }

    fn fail(&mut self, err: ExecutionError) -> Option<Result<Binding, ExecutionError>> {
        self.failed = true;
        if let Err(close_err) = self.close() {
            log::warn!("{}", close_err);
        }
        Some(Err(err))
    }
}

impl Iterator for BindingIterator {
    type Item = Result<Binding, ExecutionError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(binding) = self.pending.pop_front() {
                return Some(Ok(binding));
            }
            if self.failed {
                return None;
            }
            if let Some((members, rows)) = self.current.as_mut() {
                match rows.next_row() {
                    Ok(Some(row)) => {
                        self.pending
                            .extend(members.iter().filter_map(|m| m.make_binding(&row)));
                    }
                    Ok(None) => self.current = None,
                    Err(e) => return self.fail(e),
                }
                continue;
            }
            let group = self.groups.pop_front()?;
            if let Err(e) = self.start(group) {
                return self.fail(e);
            }
        }
    }
}
