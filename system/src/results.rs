use crate::poll::Question;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Per-option numbers in the order the options were declared.
///
/// Serializes as a JSON object keyed by option label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tally(Vec<(String, u32)>);

impl Tally {
    pub fn get(&self, option: &str) -> Option<u32> {
        self.0
            .iter()
            .find(|(label, _)| label == option)
            .map(|(_, value)| *value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.0.iter().map(|(label, value)| (label.as_str(), *value))
    }

    fn slot_mut(&mut self, option: &str) -> Option<&mut u32> {
        self.0
            .iter_mut()
            .find(|(label, _)| label == option)
            .map(|(_, value)| value)
    }
}

impl Serialize for Tally {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (label, value) in self.iter() {
            map.serialize_entry(label, &value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct QuestionResults {
    pub counts: Tally,
    pub percentages: Tally,
    /// Number of stored answers, including ones whose option is not declared.
    pub total: u32,
}

/// Tallies the answers of `question`.
pub fn aggregate(question: &Question) -> QuestionResults {
    let mut counts = Tally::default();
    for option in &question.options {
        if counts.slot_mut(option).is_none() {
            counts.0.push((option.clone(), 0));
        }
    }

    for answer in &question.answers {
        // undeclared options stay stored but are not counted
        if let Some(count) = counts.slot_mut(&answer.selected_option) {
            *count += 1;
        }
    }

    let total = question.answers.len() as u32;
    let percentages = Tally(
        counts
            .iter()
            .map(|(label, count)| (label.to_owned(), percentage(count, total)))
            .collect(),
    );

    QuestionResults {
        counts,
        percentages,
        total,
    }
}

/// round(100 * count / total) with halves rounded up; 0 when nobody answered.
fn percentage(count: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let (count, total) = (count as u64, total as u64);
    ((200 * count + total) / (2 * total)) as u32
}
