use serde::{Deserialize, Serialize};

/// Structured classifier output, passed through to the client verbatim.
///
/// The field layout matches what the vision model is instructed to emit;
/// anything that fails to deserialize into this shape is a parse failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiseaseReport {
    pub disease_name: String,
    #[serde(default)]
    pub precautions: Vec<String>,
    #[serde(default)]
    pub remedies: Vec<String>,
    #[serde(default)]
    pub medicines: Vec<Medicine>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medicine {
    pub name: String,
    pub mixing_ratio: String,
}
