/// Dosage table and dose arithmetic.
///
/// The table is a CSV with columns `plant,disease,pesticide,base_ml_per_L`.
/// Lookups are case-insensitive on plant and disease; a miss is a normal outcome
/// (healthy leaves usually have no row).

use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

pub const DEFAULT_CONTAINER_VOLUME_ML: f64 = 100.0;

#[derive(Debug, Deserialize)]
struct DosageRow {
    plant: String,
    disease: String,
    pesticide: String,
    #[serde(rename = "base_ml_per_L")]
    base_ml_per_liter: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DoseEntry {
    pub pesticide: String,
    pub base_ml_per_liter: f64,
}

#[derive(Debug)]
pub enum DosageTableError {
    Io(std::io::Error),
    Csv(csv::Error),
}

impl std::fmt::Display for DosageTableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DosageTableError::Io(e) => write!(f, "dosage table IO error: {e}"),
            DosageTableError::Csv(e) => write!(f, "dosage table parse error: {e}"),
        }
    }
}

impl std::error::Error for DosageTableError {}

impl From<std::io::Error> for DosageTableError {
    fn from(err: std::io::Error) -> Self {
        DosageTableError::Io(err)
    }
}

impl From<csv::Error> for DosageTableError {
    fn from(err: csv::Error) -> Self {
        DosageTableError::Csv(err)
    }
}

#[derive(Clone, Debug, Default)]
pub struct DosageTable {
    entries: HashMap<(String, String), DoseEntry>,
}

impl DosageTable {
    pub fn from_path(path: &Path) -> Result<Self, DosageTableError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// First row wins when a (plant, disease) pair repeats.
    pub fn from_reader(reader: impl Read) -> Result<Self, DosageTableError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut entries = HashMap::new();
        for row in rdr.deserialize::<DosageRow>() {
            let row = row?;
            entries
                .entry(key(&row.plant, &row.disease))
                .or_insert(DoseEntry {
                    pesticide: row.pesticide,
                    base_ml_per_liter: row.base_ml_per_liter,
                });
        }

        Ok(Self { entries })
    }

    pub fn lookup(&self, plant: &str, disease: &str) -> Option<&DoseEntry> {
        self.entries.get(&key(plant, disease))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn key(plant: &str, disease: &str) -> (String, String) {
    (plant.trim().to_lowercase(), disease.trim().to_lowercase())
}

/// Recommended treatment for one diagnosis.
#[derive(Clone, Debug, PartialEq)]
pub struct Dose {
    pub pesticide: String,
    pub base_ml_per_liter: f64,
    pub dose_ml: f64,
}

/// Round to `places` decimals, ties to even on the exact binary value.
pub fn round_to(value: f64, places: usize) -> f64 {
    format!("{value:.places$}").parse().unwrap_or(value)
}

/// Confidence in [0,1] to infection percent in [0,100], two decimals.
pub fn infection_percent(confidence: f64) -> f64 {
    round_to(confidence * 100.0, 2)
}

/// Per-liter base rate scaled by container size and infection severity, three decimals.
pub fn dose_ml(base_ml_per_liter: f64, infection_percent: f64, container_volume_ml: f64) -> f64 {
    let for_container = base_ml_per_liter * (container_volume_ml / 1000.0);
    round_to(for_container * (infection_percent / 100.0), 3)
}

#[derive(Clone, Debug)]
pub struct DoseCalculator {
    table: DosageTable,
    container_volume_ml: f64,
}

impl DoseCalculator {
    pub fn new(table: DosageTable, container_volume_ml: f64) -> Self {
        Self {
            table,
            container_volume_ml,
        }
    }

    /// `None` when the table has no row for the diagnosis.
    pub fn dose(
        &self,
        plant: &str,
        disease: &str,
        confidence: f64,
        container_volume_ml: f64,
    ) -> Option<Dose> {
        let entry = self.table.lookup(plant, disease)?;
        Some(Dose {
            pesticide: entry.pesticide.clone(),
            base_ml_per_liter: entry.base_ml_per_liter,
            dose_ml: dose_ml(
                entry.base_ml_per_liter,
                infection_percent(confidence),
                container_volume_ml,
            ),
        })
    }

    /// Dose for the configured container volume.
    pub fn dose_default(&self, plant: &str, disease: &str, confidence: f64) -> Option<Dose> {
        self.dose(plant, disease, confidence, self.container_volume_ml)
    }
}
