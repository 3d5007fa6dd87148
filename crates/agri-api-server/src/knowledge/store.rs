use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::{error, info};

const UNAVAILABLE: &str = "Knowledge base is not available.";
const NO_MATCH: &str = "No specific information found in the knowledge base for this query.";

/// How many matching entries are serialized into the retrieved context.
const MAX_CONTEXT_ENTRIES: usize = 3;

/// One top-level category of the reference file. Entries are kept as raw
/// JSON so unrecognized fields survive into the retrieved context blocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    #[serde(default)]
    pub items: Vec<Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Static reference records, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    categories: Vec<Category>,
}

impl KnowledgeBase {
    /// Load the reference file. A missing or malformed file logs an error
    /// and yields an empty store; retrieval then answers with the
    /// "unavailable" sentinel instead of failing requests.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str::<Vec<Category>>(&raw) {
                Ok(categories) => {
                    info!(
                        "Successfully loaded knowledge base with {} entries",
                        categories.len()
                    );
                    Self { categories }
                }
                Err(e) => {
                    error!("Knowledge base loading failed: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                error!("Knowledge base loading failed ({}): {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn from_categories(categories: Vec<Category>) -> Self {
        Self { categories }
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Keyword-overlap lookup: an entry matches when any lowercase query
    /// word occurs as a substring of its bilingual name/symptom text. The
    /// first three matches, in file order, are returned as pretty JSON
    /// blocks. Deterministic, no state.
    pub fn retrieve(&self, query: &str) -> String {
        if self.is_empty() {
            return UNAVAILABLE.to_string();
        }

        let query_words: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect();

        let mut blocks = Vec::new();
        'outer: for category in &self.categories {
            for item in &category.items {
                let searchable = searchable_text(item).to_lowercase();
                if query_words.iter().any(|word| searchable.contains(word.as_str())) {
                    blocks.push(
                        serde_json::to_string_pretty(item).unwrap_or_else(|_| item.to_string()),
                    );
                    if blocks.len() == MAX_CONTEXT_ENTRIES {
                        break 'outer;
                    }
                }
            }
        }

        if blocks.is_empty() {
            return NO_MATCH.to_string();
        }

        blocks.join("\n---\n")
    }
}

/// Flatten an entry's bilingual name and symptom fields into one haystack.
fn searchable_text(item: &Value) -> String {
    let mut text = String::new();

    if let Some(name) = item.get("name").and_then(Value::as_object) {
        for lang in ["en", "ta"] {
            if let Some(value) = name.get(lang).and_then(Value::as_str) {
                text.push_str(value);
                text.push(' ');
            }
        }
    }

    if let Some(symptoms) = item.get("symptoms").and_then(Value::as_object) {
        for lang in ["en", "ta"] {
            if let Some(values) = symptoms.get(lang).and_then(Value::as_array) {
                for value in values.iter().filter_map(Value::as_str) {
                    text.push_str(value);
                    text.push(' ');
                }
            }
        }
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> KnowledgeBase {
        let raw = json!([
            {
                "category": "fungal",
                "items": [
                    {
                        "name": {"en": "Leaf Blight", "ta": "இலை கருகல்"},
                        "symptoms": {"en": ["brown spots", "wilting leaves"], "ta": ["பழுப்பு புள்ளிகள்"]},
                        "crops": ["rice", "maize"]
                    },
                    {
                        "name": {"en": "Powdery Mildew", "ta": "பவுடரி பூஞ்சை"},
                        "symptoms": {"en": ["white powder on leaves"], "ta": []}
                    }
                ]
            },
            {
                "category": "bacterial",
                "items": [
                    {
                        "name": {"en": "Bacterial Wilt", "ta": "பாக்டீரியா வாடல்"},
                        "symptoms": {"en": ["sudden wilting"], "ta": []}
                    },
                    {
                        "name": {"en": "Citrus Canker", "ta": "எலுமிச்சை புண்"},
                        "symptoms": {"en": ["raised lesions", "wilting twigs"], "ta": []}
                    }
                ]
            }
        ]);
        let categories: Vec<Category> = serde_json::from_value(raw).unwrap();
        KnowledgeBase::from_categories(categories)
    }

    #[test]
    fn test_empty_store_returns_unavailable_sentinel() {
        let kb = KnowledgeBase::default();
        assert_eq!(kb.retrieve("blight"), UNAVAILABLE);
    }

    #[test]
    fn test_no_match_returns_sentinel() {
        let kb = sample();
        assert_eq!(kb.retrieve("submarine"), NO_MATCH);
    }

    #[test]
    fn test_match_is_case_insensitive_substring() {
        let kb = sample();
        let context = kb.retrieve("BLIGHT");
        assert!(context.contains("Leaf Blight"));
        assert!(!context.contains("Powdery Mildew"));
    }

    #[test]
    fn test_symptom_words_match() {
        let kb = sample();
        let context = kb.retrieve("white powder");
        assert!(context.contains("Powdery Mildew"));
    }

    #[test]
    fn test_bilingual_fields_are_searchable() {
        let kb = sample();
        let context = kb.retrieve("இலை");
        assert!(context.contains("Leaf Blight"));
    }

    #[test]
    fn test_at_most_three_entries_in_file_order() {
        let kb = sample();
        // "wilting" matches Leaf Blight, Bacterial Wilt and Citrus Canker;
        // "powder" adds Powdery Mildew for a fourth candidate
        let context = kb.retrieve("wilting powder");
        let blocks: Vec<&str> = context.split("\n---\n").collect();
        assert_eq!(blocks.len(), 3);
        assert!(blocks[0].contains("Leaf Blight"));
        assert!(blocks[1].contains("Powdery Mildew"));
        assert!(blocks[2].contains("Bacterial Wilt"));
    }

    #[test]
    fn test_extra_entry_fields_survive_into_context() {
        let kb = sample();
        let context = kb.retrieve("blight");
        assert!(context.contains("rice"));
    }

    #[test]
    fn test_load_missing_file_yields_empty_store() {
        let kb = KnowledgeBase::load("/nonexistent/disease_info.json");
        assert!(kb.is_empty());
    }
}
