use crate::error::StoreError;
use crate::models::{NewTask, Task, TaskId, TaskUpdate, UserId};

/// Owner-scoped task persistence. Implementations must never return, modify
/// or delete a task belonging to a different owner; a foreign id behaves
/// exactly like a missing one.
pub trait TaskStore {
    /// All of the owner's tasks in creation order.
    fn list_tasks(&self, owner: UserId) -> Result<Vec<Task>, StoreError>;

    fn create_task(&mut self, owner: UserId, fields: NewTask) -> Result<Task, StoreError>;

    /// Applies the given fields and refreshes `updated_at`.
    fn update_task(&mut self, owner: UserId, id: TaskId, update: TaskUpdate) -> Result<Task, StoreError>;

    fn delete_task(&mut self, owner: UserId, id: TaskId) -> Result<(), StoreError>;

    fn get_task(&self, owner: UserId, id: TaskId) -> Result<Task, StoreError> {
        self.list_tasks(owner)?
            .into_iter()
            .find(|task| task.id == id)
            .ok_or_else(|| StoreError::not_found(id))
    }
}
