//! Transaction scoping.
//!
//! [`RequestTransaction`] opens a transaction before the handler and
//! settles it afterwards: commit when the reply is a success, rollback
//! otherwise, rollback implicitly if the chain unwinds. The store here is
//! an in-memory stand-in for the MySQL collaborator; the pipeline only
//! sees the transaction handle in the argument bag.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use http::StatusCode;

use tally_core::{ArgKey, Arguments, Reply};
use tally_pipeline::{Decorator, Dispatch};

use crate::billing::BillRepository;

/// Bag key under which the open transaction is stored.
pub static TRANSACTION: ArgKey<SharedTransaction> = ArgKey::new("transaction");

/// The transaction handle as stored in the bag. `None` once settled.
pub type SharedTransaction = Arc<Mutex<Option<Transaction>>>;

/// Store failures surfaced to the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store no longer accepts transactions (shutting down).
    #[error("store is closed")]
    Closed,
}

/// In-memory persistence stand-in.
#[derive(Debug, Default)]
pub struct Store {
    repositories: Mutex<Vec<BillRepository>>,
    next_id: AtomicU64,
    closed: AtomicBool,
}

impl Store {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a transaction.
    pub fn begin(self: &Arc<Self>) -> Result<Transaction, StoreError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StoreError::Closed);
        }
        Ok(Transaction {
            store: Arc::clone(self),
            staged: Vec::new(),
        })
    }

    /// Stops accepting new transactions.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Number of committed bill repositories.
    #[must_use]
    pub fn bill_repository_count(&self) -> usize {
        self.repositories.lock().expect("store lock").len()
    }

    fn commit(&self, staged: Vec<BillRepository>) {
        self.repositories.lock().expect("store lock").extend(staged);
    }

    fn committed_for_account(&self, aws_account_id: u64) -> Vec<BillRepository> {
        self.repositories
            .lock()
            .expect("store lock")
            .iter()
            .filter(|repository| repository.aws_account_id == aws_account_id)
            .cloned()
            .collect()
    }
}

/// One request's transaction: staged writes visible to the request, made
/// durable only on commit.
#[derive(Debug)]
pub struct Transaction {
    store: Arc<Store>,
    staged: Vec<BillRepository>,
}

impl Transaction {
    /// Stages a new bill repository, assigning its identifier.
    pub fn insert_bill_repository(
        &mut self,
        aws_account_id: u64,
        bucket: &str,
        prefix: &str,
    ) -> BillRepository {
        let id = self.store.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let repository = BillRepository::new(id, aws_account_id, bucket, prefix);
        self.staged.push(repository.clone());
        repository
    }

    /// Returns the account's bill repositories, committed and staged.
    #[must_use]
    pub fn bill_repositories_for_account(&self, aws_account_id: u64) -> Vec<BillRepository> {
        let mut repositories = self.store.committed_for_account(aws_account_id);
        repositories.extend(
            self.staged
                .iter()
                .filter(|repository| repository.aws_account_id == aws_account_id)
                .cloned(),
        );
        repositories
    }

    /// Makes the staged writes durable.
    pub fn commit(self) {
        let staged = self.staged;
        self.store.commit(staged);
    }

    /// Discards the staged writes.
    pub fn rollback(self) {
        tracing::debug!(discarded = self.staged.len(), "transaction rolled back");
    }
}

/// Runs `f` against the request's open transaction.
///
/// # Panics
///
/// Panics if no [`RequestTransaction`] decorator ran for this request;
/// that is a registration-time composition bug.
pub fn with_transaction<R>(arguments: &Arguments, f: impl FnOnce(&mut Transaction) -> R) -> R {
    let shared = arguments.expect(&TRANSACTION);
    let mut guard = shared.lock().expect("transaction lock");
    let transaction = guard.as_mut().expect("transaction already settled");
    f(transaction)
}

/// Decorator scoping each request in a transaction.
///
/// If a transaction cannot be opened the request is answered with a
/// generic 500 before the handler runs. Otherwise the handle is stored in
/// the bag; once the inner chain replies, a 2xx status commits and
/// anything else rolls back.
pub struct RequestTransaction {
    store: Arc<Store>,
}

impl RequestTransaction {
    /// Creates the decorator over a store.
    #[must_use]
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }
}

impl Decorator for RequestTransaction {
    fn name(&self) -> &'static str {
        "request-transaction"
    }

    fn wrap(&self, next: Dispatch) -> Dispatch {
        let store = Arc::clone(&self.store);
        Arc::new(move |request, mut arguments| {
            let next = Arc::clone(&next);
            let store = Arc::clone(&store);
            Box::pin(async move {
                let transaction = match store.begin() {
                    Ok(transaction) => transaction,
                    Err(err) => {
                        tracing::error!(error = %err, "failed to open transaction");
                        return Reply::error(StatusCode::INTERNAL_SERVER_ERROR, "internal error");
                    }
                };

                let shared: SharedTransaction = Arc::new(Mutex::new(Some(transaction)));
                arguments.set(&TRANSACTION, Arc::clone(&shared));

                let reply = next(request, arguments).await;

                // A poisoned lock means the chain panicked while holding
                // it; the staged writes are discarded either way.
                let transaction = shared.lock().ok().and_then(|mut guard| guard.take());
                if let Some(transaction) = transaction {
                    if reply.status().is_success() {
                        transaction.commit();
                    } else {
                        transaction.rollback();
                    }
                }
                reply
            })
        })
    }
}
