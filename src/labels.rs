/// Class label vocabulary and label -> (plant, disease) interpretation.
///
/// Labels look like `Tomato___Late_blight`: plant and disease joined by a triple
/// underscore, words joined by single underscores, sometimes with a parenthetical
/// qualifier (`Corn_(maize)`, `Esca_(Black_Measles)`).

use std::path::Path;

pub const LABEL_DELIMITER: &str = "___";

pub const DEFAULT_DISEASE: &str = "healthy";

/// Index-aligned with the classifier output.
pub const CLASS_LABELS: [&str; 23] = [
    "Apple___Apple_scab",
    "Apple___Black_rot",
    "Apple___healthy",
    "Cherry_(including_sour)___Powdery_mildew",
    "Cherry_(including_sour)___healthy",
    "Corn_(maize)___Common_rust_",
    "Corn_(maize)___healthy",
    "Grape___Black_rot",
    "Grape___Esca_(Black_Measles)",
    "Grape___healthy",
    "Peach___Bacterial_spot",
    "Peach___healthy",
    "Pepper,_bell___Bacterial_spot",
    "Pepper,_bell___healthy",
    "Potato___Early_blight",
    "Potato___Late_blight",
    "Potato___healthy",
    "Strawberry___Leaf_scorch",
    "Strawberry___healthy",
    "Tomato___Bacterial_spot",
    "Tomato___Early_blight",
    "Tomato___Late_blight",
    "Tomato___healthy",
];

/// Applied in order, before underscores become spaces.
const PLANT_REPLACEMENTS: &[(&str, &str)] = &[
    ("_(including_sour)", ""),
    ("(including_sour)", ""),
    ("(maize)", ""),
    (",", ""),
];

const DISEASE_REPLACEMENTS: &[(&str, &str)] = &[
    ("_(Black_Measles)", ""),
    ("(Black_Measles)", ""),
];

/// Split a raw label and normalize both halves to lower-case, space-separated words.
pub fn interpret(raw_label: &str) -> (String, String) {
    let (raw_plant, raw_disease) = raw_label
        .split_once(LABEL_DELIMITER)
        .unwrap_or((raw_label, DEFAULT_DISEASE));

    (
        clean(raw_plant, PLANT_REPLACEMENTS),
        clean(raw_disease, DISEASE_REPLACEMENTS),
    )
}

fn clean(part: &str, replacements: &[(&str, &str)]) -> String {
    let mut text = part.to_string();
    for (from, to) in replacements {
        text = text.replace(from, to);
    }
    let text = text.replace('_', " ").to_lowercase();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Ordered class labels the classifier's score indices refer to.
#[derive(Clone, Debug)]
pub struct LabelSet {
    labels: Vec<String>,
}

impl Default for LabelSet {
    fn default() -> Self {
        Self {
            labels: CLASS_LABELS.iter().map(|l| l.to_string()).collect(),
        }
    }
}

impl LabelSet {
    /// One label per line; blank lines and `#` comments are skipped.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let labels: Vec<String> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(String::from)
            .collect();

        if labels.is_empty() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("no labels in {}", path.display()),
            ));
        }
        Ok(Self { labels })
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
