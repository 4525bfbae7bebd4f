//! In-memory delegation repository.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::delegation::domain::{Delegation, DelegationHandle};
use crate::delegation::ports::{
    DelegationRepository, DelegationRepositoryError, DelegationRepositoryResult,
};
use crate::record::domain::RecordId;

/// Thread-safe in-memory delegation repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDelegationRepository {
    delegations: Arc<RwLock<HashMap<DelegationHandle, Delegation>>>,
}

impl InMemoryDelegationRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn select(
        &self,
        predicate: impl Fn(&Delegation) -> bool,
    ) -> DelegationRepositoryResult<Vec<Delegation>> {
        let delegations = self.delegations.read().map_err(poisoned)?;
        let mut selected: Vec<Delegation> = delegations
            .values()
            .filter(|delegation| predicate(delegation))
            .cloned()
            .collect();
        sort_oldest_first(&mut selected);
        Ok(selected)
    }
}

fn poisoned(err: impl ToString) -> DelegationRepositoryError {
    DelegationRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

/// Orders delegations by creation time, then handle.
pub(super) fn sort_oldest_first(delegations: &mut [Delegation]) {
    delegations.sort_by(|left, right| {
        left.created_at
            .cmp(&right.created_at)
            .then_with(|| left.handle.cmp(&right.handle))
    });
}

#[async_trait]
impl DelegationRepository for InMemoryDelegationRepository {
    async fn insert(&self, delegation: &Delegation) -> DelegationRepositoryResult<()> {
        let mut delegations = self.delegations.write().map_err(poisoned)?;
        if delegations.contains_key(&delegation.handle) {
            return Err(DelegationRepositoryError::Duplicate(delegation.handle));
        }
        delegations.insert(delegation.handle, delegation.clone());
        Ok(())
    }

    async fn update(&self, delegation: &Delegation) -> DelegationRepositoryResult<()> {
        let mut delegations = self.delegations.write().map_err(poisoned)?;
        let stored = delegations
            .get_mut(&delegation.handle)
            .ok_or(DelegationRepositoryError::NotFound(delegation.handle))?;
        *stored = delegation.clone();
        Ok(())
    }

    async fn find(&self, handle: DelegationHandle) -> DelegationRepositoryResult<Option<Delegation>> {
        let delegations = self.delegations.read().map_err(poisoned)?;
        Ok(delegations.get(&handle).cloned())
    }

    async fn list_for_task(&self, task_id: &RecordId) -> DelegationRepositoryResult<Vec<Delegation>> {
        self.select(|delegation| &delegation.task_id == task_id)
    }

    async fn list_outstanding(&self) -> DelegationRepositoryResult<Vec<Delegation>> {
        self.select(|delegation| delegation.state.is_outstanding())
    }
}
