//! Lazily materializing result cursor
//!
//! Holds the ordered row ids produced by the relational executor and turns
//! them into node references on demand. A cache miss resolves a whole batch
//! of not-yet-resolved positions starting at the requested index with one
//! resolver round trip.

use std::collections::HashMap;

use bitvec::prelude::*;
use serde::Serialize;

use super::errors::ResultSetError;
use super::limit::{classify, LimitBy, LimitClassification, ResultOptions};
use super::row::ResultRow;
use crate::config::EngineConfig;
use crate::dictionary::TenantMapper;
use crate::node::{NodeRef, NodeResolver};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResultMetadata {
    pub length: usize,
    pub limit_by: LimitBy,
    pub max_size: usize,
    pub bulk_fetch_size: i32,
}

pub struct ResultCursor<'a> {
    ids: Vec<i64>,
    /// `None` with the prefetched bit set marks a node deleted since the query ran
    refs: Vec<Option<NodeRef>>,
    prefetched: BitVec,
    resolver: &'a dyn NodeResolver,
    tenant: &'a dyn TenantMapper,
    bulk_fetch_size: i32,
    limit: LimitClassification,
}

impl<'a> ResultCursor<'a> {
    pub fn new(
        ids: Vec<i64>,
        resolver: &'a dyn NodeResolver,
        tenant: &'a dyn TenantMapper,
        config: &EngineConfig,
        options: &ResultOptions,
    ) -> Self {
        let len = ids.len();
        let limit = classify(len, options, config.max_permission_checks);
        log::debug!(
            "Result cursor over {} ids, limited by {:?} (max {})",
            len,
            limit.limit_by,
            limit.max_size
        );
        Self {
            ids,
            refs: vec![None; len],
            prefetched: bitvec![0; len],
            resolver,
            tenant,
            bulk_fetch_size: config.bulk_fetch_size,
            limit,
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Candidates found before permission filtering
    pub fn count_found(&self) -> usize {
        self.ids.len()
    }

    pub fn limit_by(&self) -> LimitBy {
        self.limit.limit_by
    }

    pub fn max_size(&self) -> usize {
        self.limit.max_size
    }

    pub fn metadata(&self) -> ResultMetadata {
        ResultMetadata {
            length: self.len(),
            limit_by: self.limit.limit_by,
            max_size: self.limit.max_size,
            bulk_fetch_size: self.bulk_fetch_size,
        }
    }

    fn check_index(&self, index: usize) -> Result<(), ResultSetError> {
        if index < self.ids.len() {
            Ok(())
        } else {
            Err(ResultSetError::IndexOutOfBounds {
                index,
                len: self.ids.len(),
            })
        }
    }

    pub fn node_id(&self, index: usize) -> Result<i64, ResultSetError> {
        self.check_index(index)?;
        Ok(self.ids[index])
    }

    /// Node reference at `index`, `None` if the node no longer exists
    pub fn node_ref(&mut self, index: usize) -> Result<Option<NodeRef>, ResultSetError> {
        self.check_index(index)?;
        if self.prefetched[index] {
            return Ok(self.refs[index].clone());
        }

        if self.bulk_fetch_size <= 0 {
            let found = self
                .resolver
                .node_ref(self.ids[index])?
                .map(|node| self.tenant.base_node_ref(&node));
            self.refs[index] = found.clone();
            self.prefetched.set(index, true);
            return Ok(found);
        }

        self.prefetch_from(index)?;
        Ok(self.refs[index].clone())
    }

    fn prefetch_from(&mut self, start: usize) -> Result<(), ResultSetError> {
        let batch: Vec<usize> = (start..self.ids.len())
            .filter(|&i| !self.prefetched[i])
            .take(self.bulk_fetch_size as usize)
            .collect();
        let ids: Vec<i64> = batch.iter().map(|&i| self.ids[i]).collect();

        let found: HashMap<i64, NodeRef> = self.resolver.node_refs(&ids)?.into_iter().collect();
        log::debug!(
            "Prefetched {} of {} node refs starting at index {}",
            found.len(),
            batch.len(),
            start
        );

        for index in batch {
            self.refs[index] = found
                .get(&self.ids[index])
                .map(|node| self.tenant.base_node_ref(node));
            self.prefetched.set(index, true);
        }
        Ok(())
    }

    pub fn row(&mut self, index: usize) -> Result<ResultRow, ResultSetError> {
        let node_ref = self.node_ref(index)?;
        Ok(ResultRow::new(index, self.ids[index], node_ref))
    }

    /// Whether the node at `index` still exists
    pub fn exists(&self, index: usize) -> Result<bool, ResultSetError> {
        let id = self.node_id(index)?;
        Ok(self.resolver.exists(id)?)
    }

    pub fn node_refs(&mut self) -> NodeRefs<'_, 'a> {
        let back = self.ids.len();
        NodeRefs {
            cursor: self,
            front: 0,
            back,
        }
    }
}

/// Iterator over every node reference in result order
pub struct NodeRefs<'c, 'a> {
    cursor: &'c mut ResultCursor<'a>,
    front: usize,
    back: usize,
}

impl Iterator for NodeRefs<'_, '_> {
    type Item = Result<Option<NodeRef>, ResultSetError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        let item = self.cursor.node_ref(self.front);
        self.front += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.back - self.front;
        (remaining, Some(remaining))
    }
}

impl DoubleEndedIterator for NodeRefs<'_, '_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        self.back -= 1;
        Some(self.cursor.node_ref(self.back))
    }
}

impl ExactSizeIterator for NodeRefs<'_, '_> {}
