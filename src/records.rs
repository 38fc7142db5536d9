// Entity Records - parsing of user-entered entity rows
// Each row holds seven text fields: mass, x/y position, x/y velocity, x/y acceleration

use log::{debug, warn};
use std::fmt;

use crate::physics_engine::Entity;

pub const ENTITY_FIELDS: usize = 7;

/// Column names in record order
pub const FIELD_NAMES: [&str; ENTITY_FIELDS] = [
    "mass",
    "x position",
    "y position",
    "x velocity",
    "y velocity",
    "x acceleration",
    "y acceleration",
];

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum RecordError {
    /// A field is blank, not a number, or not finite
    Unparseable {
        row: usize,
        field: &'static str,
        text: String,
    },
    /// Mass must be strictly positive
    NonPositiveMass { row: usize, mass: f64 },
    /// More than `ENTITY_FIELDS` fields on the row
    TooManyFields { row: usize, count: usize },
}

impl RecordError {
    pub fn row(&self) -> usize {
        match self {
            RecordError::Unparseable { row, .. }
            | RecordError::NonPositiveMass { row, .. }
            | RecordError::TooManyFields { row, .. } => *row,
        }
    }
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::Unparseable { row, field, text } => {
                write!(f, "could not parse {} in row {}: {:?}", field, row, text)
            }
            RecordError::NonPositiveMass { row, mass } => {
                write!(f, "mass in row {} must be positive, got {}", row, mass)
            }
            RecordError::TooManyFields { row, count } => write!(
                f,
                "row {} has {} fields, expected {}",
                row, count, ENTITY_FIELDS
            ),
        }
    }
}

impl std::error::Error for RecordError {}

// =============================================================================
// PARSING
// =============================================================================

/// Result of turning a grid of rows into entities
#[derive(Debug, Clone, Default)]
pub struct ParsedRecords {
    pub entities: Vec<Entity>,
    pub errors: Vec<RecordError>,
    /// Non-blank rows dropped because the entity limit was reached
    pub truncated: usize,
}

fn is_blank(field: &str) -> bool {
    field.trim().is_empty()
}

fn parse_field(row: usize, column: usize, text: &str) -> Result<f64, RecordError> {
    let trimmed = text.trim();
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(RecordError::Unparseable {
            row,
            field: FIELD_NAMES[column],
            text: trimmed.to_string(),
        }),
    }
}

/// Parse one row into an entity. Returns `Ok(None)` for a wholly blank row.
/// Missing trailing fields count as blank.
pub fn parse_record<S: AsRef<str>>(row: usize, fields: &[S]) -> Result<Option<Entity>, RecordError> {
    if fields.iter().all(|f| is_blank(f.as_ref())) {
        return Ok(None);
    }
    if fields.len() > ENTITY_FIELDS {
        return Err(RecordError::TooManyFields {
            row,
            count: fields.len(),
        });
    }

    let mut values = [0.0; ENTITY_FIELDS];
    for (column, value) in values.iter_mut().enumerate() {
        let text = fields.get(column).map(|f| f.as_ref()).unwrap_or("");
        *value = parse_field(row, column, text)?;
    }

    let mass = values[0];
    if mass <= 0.0 {
        return Err(RecordError::NonPositiveMass { row, mass });
    }

    Ok(Some(Entity::from_fields(values)))
}

/// Build entities from up to `limit` non-blank rows. A bad row is logged,
/// recorded in `errors` and skipped; the remaining rows still load.
pub fn parse_records<S: AsRef<str>>(rows: &[Vec<S>], limit: usize) -> ParsedRecords {
    let mut parsed = ParsedRecords::default();
    let mut accepted_rows = 0;

    for (row_num, row) in rows.iter().enumerate() {
        let fields = row.as_slice();
        if fields.iter().all(|f| is_blank(f.as_ref())) {
            continue;
        }
        if accepted_rows >= limit {
            parsed.truncated += 1;
            continue;
        }
        accepted_rows += 1;

        match parse_record(row_num, fields) {
            Ok(Some(entity)) => parsed.entities.push(entity),
            Ok(None) => {}
            Err(e) => {
                warn!("{} - skipping", e);
                parsed.errors.push(e);
            }
        }
    }

    if parsed.truncated > 0 {
        warn!(
            "entity limit of {} reached, ignored {} more rows",
            limit, parsed.truncated
        );
    }
    debug!(
        "parsed {} entities ({} rows rejected)",
        parsed.entities.len(),
        parsed.errors.len()
    );

    parsed
}

/// Split comma-separated text into rows of fields. Blank lines become blank
/// rows and lines starting with `#` are dropped.
pub fn split_rows(text: &str) -> Vec<Vec<&str>> {
    text.lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .map(|line| line.split(',').collect())
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics_engine::{Point2, Vector2};

    #[test]
    fn test_full_row_parses() {
        let row = ["5.2", "1.3", " -9.1", "14.1", "-23", "-1", "1e0"];
        let e = parse_record(0, &row).unwrap().unwrap();
        assert_eq!(e.mass, 5.2);
        assert_eq!(e.position, Point2::new(1.3, -9.1));
        assert_eq!(e.velocity, Vector2::new(14.1, -23.0));
        assert_eq!(e.acceleration, Vector2::new(-1.0, 1.0));
    }

    #[test]
    fn test_blank_row_is_skipped_silently() {
        let row = ["", "  ", "", "", "", "", ""];
        assert_eq!(parse_record(3, &row), Ok(None));

        let parsed = parse_records(&[row.to_vec()], 18);
        assert!(parsed.entities.is_empty());
        assert!(parsed.errors.is_empty());
    }

    #[test]
    fn test_bad_mass_rejects_whole_row() {
        let rows = vec![
            vec!["10", "0", "0", "0", "0", "0", "0"],
            vec!["heavy", "1", "1", "0", "0", "0", "0"],
        ];
        let parsed = parse_records(&rows, 18);

        assert_eq!(parsed.entities.len(), 1);
        assert_eq!(parsed.entities[0].mass, 10.0);
        assert_eq!(
            parsed.errors,
            vec![RecordError::Unparseable {
                row: 1,
                field: "mass",
                text: "heavy".to_string(),
            }]
        );
    }

    #[test]
    fn test_partially_blank_row_is_rejected() {
        let row = ["1", "2", "3", "", "", "", ""];
        let err = parse_record(7, &row).unwrap_err();
        assert_eq!(err.row(), 7);
        assert!(matches!(err, RecordError::Unparseable { field: "x velocity", .. }));

        let short = ["1", "2"];
        assert!(parse_record(0, &short).is_err());
    }

    #[test]
    fn test_non_finite_and_non_positive_values_are_rejected() {
        let row = ["1", "NaN", "0", "0", "0", "0", "0"];
        assert!(matches!(
            parse_record(0, &row),
            Err(RecordError::Unparseable { field: "x position", .. })
        ));

        let row = ["1", "0", "inf", "0", "0", "0", "0"];
        assert!(parse_record(0, &row).is_err());

        let row = ["0", "0", "0", "0", "0", "0", "0"];
        assert_eq!(
            parse_record(2, &row),
            Err(RecordError::NonPositiveMass { row: 2, mass: 0.0 })
        );
    }

    #[test]
    fn test_too_many_fields() {
        let row = ["1", "0", "0", "0", "0", "0", "0", "9"];
        assert_eq!(
            parse_record(4, &row),
            Err(RecordError::TooManyFields { row: 4, count: 8 })
        );
    }

    #[test]
    fn test_limit_counts_non_blank_rows() {
        let rows = vec![
            vec!["1", "0", "0", "0", "0", "0", "0"],
            vec![""],
            vec!["2", "0", "0", "0", "0", "0", "0"],
            vec!["3", "0", "0", "0", "0", "0", "0"],
        ];
        let parsed = parse_records(&rows, 2);
        assert_eq!(parsed.entities.len(), 2);
        assert_eq!(parsed.entities[1].mass, 2.0);
        assert_eq!(parsed.truncated, 1);
    }

    #[test]
    fn test_split_rows() {
        let text = "# mass,px,py,vx,vy,ax,ay\n10,1,2,0,0,0,0\n\n5, -1, -2, 0, 0, 0, 0\n";
        let rows = split_rows(text);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1], vec![""]);

        let parsed = parse_records(&rows, 18);
        assert_eq!(parsed.entities.len(), 2);
        assert_eq!(parsed.entities[1].position, Point2::new(-1.0, -2.0));
    }
}
