use crate::core::error::{Error, Result};
use crate::core::types::FrameId;
use crate::mvcc::snapshot::IndexSnapshot;
use crate::query::FieldSelection;

/// Ordered term pair within one frame.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Skipgram {
    pub frame_id: FrameId,
    pub left: String,
    pub right: String,
}

impl IndexSnapshot {
    /// Every pair of terms in one frame whose position distance lies in
    /// `[start_offset, end_offset]`, ordered by frame, then left position.
    /// When `frame_ids` is given the field selection is ignored.
    pub fn skipgrams(
        &self,
        start_offset: u32,
        end_offset: u32,
        selection: &FieldSelection,
        frame_ids: Option<&[FrameId]>,
    ) -> Result<Vec<Skipgram>> {
        if start_offset == 0 || end_offset == 0 || start_offset > end_offset {
            return Err(Error::invalid_argument(format!(
                "skip-gram window [{}, {}] must satisfy 1 <= start <= end",
                start_offset, end_offset
            )));
        }

        let mut grams = Vec::new();
        for frame in self.frames_matching(selection, frame_ids) {
            let mut terms: Vec<&(String, u32)> = frame.terms.iter().collect();
            terms.sort_by_key(|(_, position)| *position);

            for (i, (left, left_pos)) in terms.iter().enumerate() {
                for (right, right_pos) in &terms[i + 1..] {
                    let distance = right_pos - left_pos;
                    if distance > end_offset {
                        break;
                    }
                    if distance >= start_offset {
                        grams.push(Skipgram {
                            frame_id: frame.id,
                            left: left.clone(),
                            right: right.clone(),
                        });
                    }
                }
            }
        }
        Ok(grams)
    }
}
