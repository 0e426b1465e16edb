use crate::domain::entities::ReceiptId;
use crate::domain::errors::ReceiptError;
use crate::domain::receipt::ReceiptCounter;
use crate::ports::outbound::{Clock, ImageStore};
use std::sync::Arc;
use tracing::info;

/// Allocates receipt ids for the clock's current day.
pub struct ReceiptIdGenerator {
    clock: Arc<dyn Clock>,
    counter: ReceiptCounter,
}

impl ReceiptIdGenerator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            counter: ReceiptCounter::new(),
        }
    }

    /// Continue numbering after the highest receipt of today already in `images`.
    pub fn seeded(clock: Arc<dyn Clock>, images: &dyn ImageStore) -> Self {
        let counter = match clock.today() {
            Ok(today) => match images.highest_sequence(today) {
                Some(last) => {
                    info!(
                        "[rx-intake] resuming receipt numbering for {} after sequence {}",
                        today, last
                    );
                    ReceiptCounter::resume_from(today, last)
                }
                None => ReceiptCounter::new(),
            },
            Err(_) => ReceiptCounter::new(),
        };
        Self { clock, counter }
    }

    pub fn allocate(&self) -> Result<ReceiptId, ReceiptError> {
        let today = self.clock.today()?;
        Ok(self.counter.next(today))
    }

    pub fn last(&self) -> Option<ReceiptId> {
        self.counter.last()
    }
}
