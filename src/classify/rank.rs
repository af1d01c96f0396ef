use std::collections::HashMap;

/// Sentinel label index for movement classes with no entry in the label table.
pub const INVALID_LABEL: i32 = -1;

/// One entry of a top-N ranking over a score vector.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RankedPrediction {
    pub index: usize,
    pub score: f32,
}

/// A ranking entry after translation into the shared label index space.
/// `label_index` is `INVALID_LABEL` for unmapped classes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MappedPrediction {
    pub label_index: i32,
    pub score: f32,
}

impl MappedPrediction {
    pub fn is_valid(&self) -> bool {
        self.label_index != INVALID_LABEL
    }
}

/// The `n` highest scores, descending.
///
/// Indices come from a stable ascending sort that is then reversed, so equal
/// scores appear with the higher original index first. Output length is
/// `min(n, scores.len())`.
pub fn top_n(scores: &[f32], n: usize) -> Vec<RankedPrediction> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));
    order
        .into_iter()
        .rev()
        .take(n)
        .map(|index| RankedPrediction {
            index,
            score: scores[index],
        })
        .collect()
}

/// Movement-model class index -> label table index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MovementIndexMap {
    entries: HashMap<usize, i32>,
}

impl MovementIndexMap {
    pub fn new(entries: impl IntoIterator<Item = (usize, i32)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn get(&self, movement_index: usize) -> i32 {
        self.entries
            .get(&movement_index)
            .copied()
            .unwrap_or(INVALID_LABEL)
    }

    /// Same-length translation; unknown indices become `INVALID_LABEL`.
    pub fn remap(&self, movement_indices: &[usize]) -> Vec<i32> {
        movement_indices.iter().map(|&i| self.get(i)).collect()
    }

    /// Translate a ranking, keeping invalid entries in their rank slot.
    pub fn remap_ranked(&self, ranked: &[RankedPrediction]) -> Vec<MappedPrediction> {
        ranked
            .iter()
            .map(|p| MappedPrediction {
                label_index: self.get(p.index),
                score: p.score,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MovementIndexMap {
    /// Movement classes of the shipped movement model: idle, "J", "Z".
    fn default() -> Self {
        Self::new([(0, INVALID_LABEL), (1, 9), (2, 25)])
    }
}
