use std::sync::{Arc, Mutex, MutexGuard};

/// Latest published translation.
#[derive(Clone, Debug, PartialEq)]
pub struct Translation {
    pub text: String,
    pub confidence: f32,
    /// Seconds since the Unix epoch at detection time.
    pub timestamp: f64,
}

type Cell = Arc<Mutex<Option<Arc<Translation>>>>;

/// Single-slot, last-write-wins cell between the producer and the broadcaster.
///
/// The slot holds either nothing or one whole `Translation`; writers replace the
/// `Arc`, readers clone it, so a reader never observes a half-written value.
pub fn latest_slot() -> (SlotWriter, SlotReader) {
    let cell: Cell = Arc::new(Mutex::new(None));
    (SlotWriter { cell: cell.clone() }, SlotReader { cell })
}

/// Producer side. Not `Clone`: there is exactly one writer.
#[derive(Debug)]
pub struct SlotWriter {
    cell: Cell,
}

impl SlotWriter {
    pub fn publish(&self, translation: Translation) {
        *lock(&self.cell) = Some(Arc::new(translation));
    }
}

#[derive(Clone, Debug)]
pub struct SlotReader {
    cell: Cell,
}

impl SlotReader {
    pub fn latest(&self) -> Option<Arc<Translation>> {
        lock(&self.cell).clone()
    }
}

// A poisoned slot still holds a whole value; keep serving it.
fn lock(cell: &Cell) -> MutexGuard<'_, Option<Arc<Translation>>> {
    cell.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translation(text: &str, timestamp: f64) -> Translation {
        Translation {
            text: text.to_string(),
            confidence: 0.9,
            timestamp,
        }
    }

    #[test]
    fn slot_starts_empty_and_keeps_last_write() {
        let (writer, reader) = latest_slot();
        assert!(reader.latest().is_none());

        writer.publish(translation("A", 1.0));
        writer.publish(translation("B", 2.0));
        let latest = reader.latest().unwrap();
        assert_eq!(latest.text, "B");
        assert_eq!(latest.timestamp, 2.0);
    }

    #[test]
    fn readers_keep_their_snapshot() {
        let (writer, reader) = latest_slot();
        writer.publish(translation("A", 1.0));
        let snapshot = reader.latest().unwrap();
        writer.publish(translation("B", 2.0));
        assert_eq!(snapshot.text, "A");
        assert_eq!(reader.clone().latest().unwrap().text, "B");
    }
}
