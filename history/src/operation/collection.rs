//! Collection operations.
//!
//! Each operation addresses a list through its owner and the last segment
//! of its path (see [`resolve_list`]). Lists that no slot holds directly,
//! such as a list stored as an item of another list, are pinned with
//! `with_list` instead. Indices follow the list's final-index convention,
//! so every move is reverted by swapping its indices.

use strata_core::{CoreList, CoreObject, Value};

use super::{ChangeOperation, resolve_list};
use crate::context::OperationExecutionContext;
use crate::error::OperationResult;

#[derive(Debug)]
struct CollectionTarget {
    owner: CoreObject,
    property_path: String,
    pinned: Option<CoreList>,
}

impl CollectionTarget {
    fn new(owner: CoreObject, property_path: String) -> Self {
        Self {
            owner,
            property_path,
            pinned: None,
        }
    }

    fn list(&self, ctx: &OperationExecutionContext) -> OperationResult<CoreList> {
        match &self.pinned {
            Some(list) => Ok(list.clone()),
            None => resolve_list(&ctx.resolve(&self.owner), &self.property_path),
        }
    }
}

/// Inserts a run of items. An index past the end appends.
#[derive(Debug)]
pub struct InsertCollectionRangeOperation {
    sequence_number: u64,
    target: CollectionTarget,
    items: Vec<Value>,
    index: usize,
}

impl InsertCollectionRangeOperation {
    pub fn new(
        owner: CoreObject,
        property_path: impl Into<String>,
        items: Vec<Value>,
        index: usize,
        sequence_number: u64,
    ) -> Self {
        Self {
            sequence_number,
            target: CollectionTarget::new(owner, property_path.into()),
            items,
            index,
        }
    }

    /// Targets `list` directly instead of resolving it through the owner.
    pub fn with_list(mut self, list: CoreList) -> Self {
        self.target.pinned = Some(list);
        self
    }

    pub fn owner(&self) -> &CoreObject {
        &self.target.owner
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

impl ChangeOperation for InsertCollectionRangeOperation {
    fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    fn apply(&mut self, ctx: &OperationExecutionContext) -> OperationResult {
        let list = self.target.list(ctx)?;
        self.index = self.index.min(list.len());
        list.insert_range(self.index, self.items.clone())?;
        Ok(())
    }

    fn revert(&mut self, ctx: &OperationExecutionContext) -> OperationResult {
        let list = self.target.list(ctx)?;
        list.remove_range(self.index, self.items.len())?;
        Ok(())
    }

    fn description(&self) -> &str {
        &self.target.property_path
    }

    fn property_path(&self) -> Option<&str> {
        Some(&self.target.property_path)
    }
}

/// Removes a run of items starting at `index`.
#[derive(Debug)]
pub struct RemoveCollectionRangeOperation {
    sequence_number: u64,
    target: CollectionTarget,
    items: Vec<Value>,
    index: usize,
}

impl RemoveCollectionRangeOperation {
    pub fn new(
        owner: CoreObject,
        property_path: impl Into<String>,
        items: Vec<Value>,
        index: usize,
        sequence_number: u64,
    ) -> Self {
        Self {
            sequence_number,
            target: CollectionTarget::new(owner, property_path.into()),
            items,
            index,
        }
    }

    /// Targets `list` directly instead of resolving it through the owner.
    pub fn with_list(mut self, list: CoreList) -> Self {
        self.target.pinned = Some(list);
        self
    }

    pub fn owner(&self) -> &CoreObject {
        &self.target.owner
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

impl ChangeOperation for RemoveCollectionRangeOperation {
    fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    fn apply(&mut self, ctx: &OperationExecutionContext) -> OperationResult {
        let list = self.target.list(ctx)?;
        list.remove_range(self.index, self.items.len())?;
        Ok(())
    }

    fn revert(&mut self, ctx: &OperationExecutionContext) -> OperationResult {
        let list = self.target.list(ctx)?;
        let index = self.index.min(list.len());
        list.insert_range(index, self.items.clone())?;
        Ok(())
    }

    fn description(&self) -> &str {
        &self.target.property_path
    }

    fn property_path(&self) -> Option<&str> {
        Some(&self.target.property_path)
    }
}

/// Moves a block of `count` items so that it starts at `new_index`.
#[derive(Debug)]
pub struct MoveCollectionRangeOperation {
    sequence_number: u64,
    target: CollectionTarget,
    old_index: usize,
    new_index: usize,
    count: usize,
}

impl MoveCollectionRangeOperation {
    pub fn new(
        owner: CoreObject,
        property_path: impl Into<String>,
        old_index: usize,
        new_index: usize,
        count: usize,
        sequence_number: u64,
    ) -> Self {
        Self {
            sequence_number,
            target: CollectionTarget::new(owner, property_path.into()),
            old_index,
            new_index,
            count,
        }
    }

    /// Targets `list` directly instead of resolving it through the owner.
    pub fn with_list(mut self, list: CoreList) -> Self {
        self.target.pinned = Some(list);
        self
    }

    pub fn owner(&self) -> &CoreObject {
        &self.target.owner
    }

    pub fn old_index(&self) -> usize {
        self.old_index
    }

    pub fn new_index(&self) -> usize {
        self.new_index
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

impl ChangeOperation for MoveCollectionRangeOperation {
    fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    fn apply(&mut self, ctx: &OperationExecutionContext) -> OperationResult {
        let list = self.target.list(ctx)?;
        list.move_range(self.old_index, self.count, self.new_index)?;
        Ok(())
    }

    fn revert(&mut self, ctx: &OperationExecutionContext) -> OperationResult {
        let list = self.target.list(ctx)?;
        list.move_range(self.new_index, self.count, self.old_index)?;
        Ok(())
    }

    fn description(&self) -> &str {
        &self.target.property_path
    }

    fn property_path(&self) -> Option<&str> {
        Some(&self.target.property_path)
    }
}

/// Inserts a single item. An index past the end appends.
#[derive(Debug)]
pub struct InsertCollectionItemOperation(InsertCollectionRangeOperation);

impl InsertCollectionItemOperation {
    pub fn new(
        owner: CoreObject,
        property_path: impl Into<String>,
        item: Value,
        index: usize,
        sequence_number: u64,
    ) -> Self {
        Self(InsertCollectionRangeOperation::new(
            owner,
            property_path,
            vec![item],
            index,
            sequence_number,
        ))
    }

    pub fn owner(&self) -> &CoreObject {
        self.0.owner()
    }

    pub fn item(&self) -> &Value {
        &self.0.items[0]
    }

    pub fn index(&self) -> usize {
        self.0.index
    }
}

/// Removes the single item at `index`.
#[derive(Debug)]
pub struct RemoveCollectionItemOperation(RemoveCollectionRangeOperation);

impl RemoveCollectionItemOperation {
    pub fn new(
        owner: CoreObject,
        property_path: impl Into<String>,
        item: Value,
        index: usize,
        sequence_number: u64,
    ) -> Self {
        Self(RemoveCollectionRangeOperation::new(
            owner,
            property_path,
            vec![item],
            index,
            sequence_number,
        ))
    }

    pub fn owner(&self) -> &CoreObject {
        self.0.owner()
    }

    pub fn item(&self) -> &Value {
        &self.0.items[0]
    }

    pub fn index(&self) -> usize {
        self.0.index
    }
}

/// Moves a single item so that it ends up at `new_index`.
#[derive(Debug)]
pub struct MoveCollectionItemOperation(MoveCollectionRangeOperation);

impl MoveCollectionItemOperation {
    pub fn new(
        owner: CoreObject,
        property_path: impl Into<String>,
        old_index: usize,
        new_index: usize,
        sequence_number: u64,
    ) -> Self {
        Self(MoveCollectionRangeOperation::new(
            owner,
            property_path,
            old_index,
            new_index,
            1,
            sequence_number,
        ))
    }

    pub fn owner(&self) -> &CoreObject {
        self.0.owner()
    }

    pub fn old_index(&self) -> usize {
        self.0.old_index
    }

    pub fn new_index(&self) -> usize {
        self.0.new_index
    }
}

macro_rules! delegate_operation {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ChangeOperation for $ty {
                fn sequence_number(&self) -> u64 {
                    self.0.sequence_number()
                }

                fn apply(&mut self, ctx: &OperationExecutionContext) -> OperationResult {
                    self.0.apply(ctx)
                }

                fn revert(&mut self, ctx: &OperationExecutionContext) -> OperationResult {
                    self.0.revert(ctx)
                }

                fn description(&self) -> &str {
                    self.0.description()
                }

                fn property_path(&self) -> Option<&str> {
                    self.0.property_path()
                }
            }
        )*
    };
}

delegate_operation!(
    InsertCollectionItemOperation,
    RemoveCollectionItemOperation,
    MoveCollectionItemOperation,
);
