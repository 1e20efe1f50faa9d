//! Conversion of loosely named sheet columns into canonical exercise records.

use once_cell::sync::Lazy;
use phf::phf_map;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

use crate::sheet::{RawRow, SheetError};

pub const DEFAULT_PLAN: &str = "Padrão";
pub const DEFAULT_WORKOUT_DAY: &str = "Sem treino";
pub const DASH: &str = "-";

/// A load value as typed in the sheet or by the user.
///
/// Numeric text becomes [`Load::Number`]; anything else is kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Load {
    Number(f64),
    Text(String),
}

impl Load {
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        let parsed = trimmed
            .parse::<f64>()
            .or_else(|_| trimmed.replacen(',', ".", 1).parse::<f64>());
        match parsed {
            Ok(v) if v.is_finite() => Load::Number(v),
            _ => Load::Text(input.to_string()),
        }
    }
}

impl Default for Load {
    fn default() -> Self {
        Load::Number(0.0)
    }
}

impl std::fmt::Display for Load {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Load::Number(v) if v.fract() == 0.0 => write!(f, "{v:.0}"),
            Load::Number(v) => write!(f, "{v}"),
            Load::Text(s) => f.write_str(s),
        }
    }
}

/// One exercise line of a plan. Every field always carries a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseRecord {
    pub plan: String,
    pub workout_day: String,
    pub muscle_group: String,
    pub exercise_name: String,
    pub sets: String,
    pub reps: String,
    pub technique: String,
    pub notes: String,
    /// Raw rest text; empty means no rest was given.
    pub rest_seconds: String,
    pub base_load: Load,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Field {
    Plan,
    WorkoutDay,
    MuscleGroup,
    Exercise,
    Sets,
    Reps,
    Rest,
    Technique,
    Notes,
    Load,
}

const ALL_FIELDS: [Field; 10] = [
    Field::Plan,
    Field::WorkoutDay,
    Field::MuscleGroup,
    Field::Exercise,
    Field::Sets,
    Field::Reps,
    Field::Rest,
    Field::Technique,
    Field::Notes,
    Field::Load,
];

impl Field {
    fn key(self) -> &'static str {
        match self {
            Field::Plan => "plan",
            Field::WorkoutDay => "workout_day",
            Field::MuscleGroup => "muscle_group",
            Field::Exercise => "exercise",
            Field::Sets => "sets",
            Field::Reps => "reps",
            Field::Rest => "rest",
            Field::Technique => "technique",
            Field::Notes => "notes",
            Field::Load => "load",
        }
    }
}

/// Accepted header spellings per field, highest priority first.
static HEADER_ALIASES: phf::Map<&'static str, &'static [&'static str]> = phf_map! {
    "plan" => &["Ficha", "Planilha", "Sheet"],
    "workout_day" => &["Treino", "Treinos"],
    "muscle_group" => &["Grupo", "Grupo Muscular"],
    "exercise" => &["Exercício", "Exercicio"],
    "sets" => &["Séries", "Series"],
    "reps" => &["Reps", "Repetições", "Repeticoes"],
    "rest" => &["Descanso (s)", "Descanso", "Descanso(s)"],
    "technique" => &["Execução / Técnica", "Execução", "Execucao", "Técnica"],
    "notes" => &["Observações", "Observacoes", "Obs"],
    "load" => &["Carga (kg)", "Carga"],
};

static FOLDED_ALIASES: Lazy<HashMap<Field, Vec<String>>> = Lazy::new(|| {
    ALL_FIELDS
        .iter()
        .map(|&f| {
            let aliases = HEADER_ALIASES
                .get(f.key())
                .map(|list| list.iter().map(|a| fold_header(a)).collect())
                .unwrap_or_default();
            (f, aliases)
        })
        .collect()
});

/// Comparison form of a header: diacritics stripped, whitespace collapsed
/// and dropped around parentheses, lower-cased.
pub fn fold_header(header: &str) -> String {
    let stripped: String = header
        .trim_start_matches('\u{feff}')
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();
    stripped
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace(" (", "(")
        .replace("( ", "(")
        .replace(" )", ")")
        .to_lowercase()
}

/// Trimmed value of the first accepted spelling present in the folded row.
///
/// A matched but blank cell is reported as `None` without falling through
/// to lower-priority spellings.
fn resolve<'a>(folded: &[(String, &'a str)], field: Field) -> Option<&'a str> {
    let aliases = FOLDED_ALIASES.get(&field)?;
    for alias in aliases {
        if let Some(&(_, value)) = folded.iter().find(|(h, _)| h == alias) {
            let value = value.trim();
            return if value.is_empty() { None } else { Some(value) };
        }
    }
    None
}

fn normalize_row(row: &RawRow) -> ExerciseRecord {
    let folded: Vec<(String, &str)> = row
        .iter()
        .map(|(h, v)| (fold_header(h), v.as_str()))
        .collect();
    let text = |field: Field, default: &str| {
        resolve(&folded, field)
            .unwrap_or(default)
            .to_string()
    };
    ExerciseRecord {
        plan: text(Field::Plan, DEFAULT_PLAN),
        workout_day: text(Field::WorkoutDay, DEFAULT_WORKOUT_DAY),
        muscle_group: text(Field::MuscleGroup, DASH),
        exercise_name: text(Field::Exercise, DASH),
        sets: text(Field::Sets, DASH),
        reps: text(Field::Reps, DASH),
        technique: text(Field::Technique, DASH),
        notes: text(Field::Notes, DASH),
        rest_seconds: text(Field::Rest, ""),
        base_load: resolve(&folded, Field::Load)
            .map(Load::parse)
            .unwrap_or_default(),
    }
}

/// Normalize every parsed row, one record per row in input order.
pub fn normalize_rows(rows: &[RawRow]) -> Result<Vec<ExerciseRecord>, SheetError> {
    if rows.is_empty() {
        return Err(SheetError::DataEmpty);
    }
    let records: Vec<ExerciseRecord> = rows.iter().map(normalize_row).collect();
    log::info!("Normalized {} exercise records", records.len());
    Ok(records)
}
