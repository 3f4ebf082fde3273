use std::sync::atomic::{AtomicU64, Ordering};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{FieldValue, Record};

/// Transaction ID generator
static TRANSACTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransactionState {
    Active,
    Committed,
    Aborted,
}

/// Transaction operation log
#[derive(Debug, Clone)]
pub enum TransactionOp {
    Insert(Record),
    /// Only the given attributes change; the key attribute selects the row
    Update(Record),
    Delete { model: String, key: FieldValue },
}

/// Buffered changes, applied atomically by `MemoryStore::commit`
#[derive(Debug)]
pub struct Transaction {
    pub id: u64,
    state: TransactionState,
    operations: Vec<TransactionOp>,
}

impl Transaction {
    pub fn begin() -> Self {
        Transaction {
            id: TRANSACTION_ID_COUNTER.fetch_add(1, Ordering::SeqCst),
            state: TransactionState::Active,
            operations: Vec::new(),
        }
    }

    pub fn insert(&mut self, record: Record) -> Result<()> {
        self.check_active()?;
        self.operations.push(TransactionOp::Insert(record));
        Ok(())
    }

    pub fn update(&mut self, record: Record) -> Result<()> {
        self.check_active()?;
        self.operations.push(TransactionOp::Update(record));
        Ok(())
    }

    pub fn delete(&mut self, model: &str, key: impl Into<FieldValue>) -> Result<()> {
        self.check_active()?;
        self.operations.push(TransactionOp::Delete {
            model: model.to_string(),
            key: key.into(),
        });
        Ok(())
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Drop every buffered operation
    pub fn rollback(&mut self) -> Result<()> {
        self.check_active()?;
        self.operations.clear();
        self.state = TransactionState::Aborted;
        Ok(())
    }

    /// Hand the operation log to the store, closing the transaction
    pub(crate) fn take_operations(&mut self) -> Result<Vec<TransactionOp>> {
        self.check_active()?;
        self.state = TransactionState::Committed;
        Ok(std::mem::take(&mut self.operations))
    }

    fn check_active(&self) -> Result<()> {
        if self.state != TransactionState::Active {
            return Err(Error::new(ErrorKind::InvalidState, "Transaction is not active".to_string()));
        }
        Ok(())
    }
}
