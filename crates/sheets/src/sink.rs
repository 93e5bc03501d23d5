use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::Semaphore;

/// One row appended to a sheet: sheet id plus the cell values, left to right.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendedRow {
    pub sheet_id: String,
    pub values: Vec<String>,
}

/// Error type for remote append operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("rate limited")]
    RateLimited,
    #[error("request failed: {0}")]
    RequestFailed(String),
}

/// Append-only writer for remote sheets.
///
/// One call appends exactly one row. Implementations must not retry on their
/// own; the caller decides what a failure means.
pub trait RowAppender: Send + Sync {
    fn name(&self) -> &str;

    fn append_row(
        &self,
        sheet_id: &str,
        values: Vec<String>,
    ) -> Pin<Box<dyn Future<Output = Result<(), TransportError>> + Send + '_>>;
}

/// In-memory appender for tests. Records every successful append.
///
/// `fail_with` makes every append fail with the given error. `held` parks each
/// append until a permit is released on the returned semaphore.
#[derive(Debug, Default)]
pub struct MockAppender {
    rows: Mutex<Vec<AppendedRow>>,
    attempts: Mutex<usize>,
    failure: Option<TransportError>,
    gate: Option<Arc<Semaphore>>,
}

impl MockAppender {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mock whose appends always fail.
    pub fn fail_with(error: TransportError) -> Self {
        Self { failure: Some(error), ..Self::default() }
    }

    /// A mock whose appends block until a permit is added to the gate.
    pub fn held() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let mock = Self { gate: Some(gate.clone()), ..Self::default() };
        (mock, gate)
    }

    /// Rows appended so far, in completion order.
    pub fn rows(&self) -> Vec<AppendedRow> {
        self.rows.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Number of append calls started, including failed ones.
    pub fn attempts(&self) -> usize {
        self.attempts.lock().map(|a| *a).unwrap_or_default()
    }
}

impl RowAppender for MockAppender {
    fn name(&self) -> &str {
        "mock"
    }

    fn append_row(
        &self,
        sheet_id: &str,
        values: Vec<String>,
    ) -> Pin<Box<dyn Future<Output = Result<(), TransportError>> + Send + '_>> {
        let row = AppendedRow { sheet_id: sheet_id.to_owned(), values };
        Box::pin(async move {
            if let Ok(mut attempts) = self.attempts.lock() {
                *attempts += 1;
            }
            if let Some(gate) = &self.gate {
                let permit = gate
                    .acquire()
                    .await
                    .map_err(|e| TransportError::RequestFailed(e.to_string()))?;
                permit.forget();
            }
            if let Some(err) = &self.failure {
                return Err(err.clone());
            }
            if let Ok(mut rows) = self.rows.lock() {
                rows.push(row);
            }
            Ok(())
        })
    }
}
