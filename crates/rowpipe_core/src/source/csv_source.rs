//! Header-described CSV reader producing [`NewUser`] values lazily.
//!
//! # Responsibility
//! - Locate `name`, `email`, `age` and optional `user_id` columns by header.
//! - Parse one record per pull, reusing one row buffer.
//!
//! # Invariants
//! - Memory use is bounded by the longest row, not the file size.
//! - After the first error the iterator is fused.

use super::{SourceError, SourceResult};
use crate::model::user::NewUser;
use csv::{ReaderBuilder, StringRecord};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
struct ColumnMap {
    user_id: Option<usize>,
    name: usize,
    email: usize,
    age: usize,
}

impl ColumnMap {
    fn from_headers(headers: &StringRecord) -> SourceResult<Self> {
        let find = |wanted: &str| {
            headers
                .iter()
                .position(|header| header.trim().eq_ignore_ascii_case(wanted))
        };
        Ok(Self {
            user_id: find("user_id"),
            name: find("name").ok_or(SourceError::MissingHeader("name"))?,
            email: find("email").ok_or(SourceError::MissingHeader("email"))?,
            age: find("age").ok_or(SourceError::MissingHeader("age"))?,
        })
    }
}

/// Lazy CSV source of user records.
pub struct CsvUserSource<R: Read> {
    reader: csv::Reader<R>,
    columns: ColumnMap,
    row: StringRecord,
    finished: bool,
}

impl CsvUserSource<File> {
    /// Opens a CSV file from disk.
    pub fn open(path: impl AsRef<Path>) -> SourceResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file)
    }
}

impl<R: Read> CsvUserSource<R> {
    /// Wraps any reader. The header row is read immediately.
    pub fn from_reader(reader: R) -> SourceResult<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let columns = ColumnMap::from_headers(reader.headers()?)?;
        Ok(Self {
            reader,
            columns,
            row: StringRecord::new(),
            finished: false,
        })
    }

    fn read_next(&mut self) -> SourceResult<Option<NewUser>> {
        if !self.reader.read_record(&mut self.row)? {
            return Ok(None);
        }
        let line = self.row.position().map_or(0, |position| position.line());
        parse_user(&self.row, &self.columns, line).map(Some)
    }
}

impl<R: Read> Iterator for CsvUserSource<R> {
    type Item = SourceResult<NewUser>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.read_next() {
            Ok(Some(user)) => Some(Ok(user)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            }
        }
    }
}

fn parse_user(row: &StringRecord, columns: &ColumnMap, line: u64) -> SourceResult<NewUser> {
    let field = |index: usize, name: &'static str| {
        row.get(index).ok_or_else(|| SourceError::InvalidField {
            line,
            field: name,
            message: "missing value".to_string(),
        })
    };

    let user_id = match columns.user_id.and_then(|index| row.get(index)) {
        Some(text) if !text.is_empty() => {
            Some(Uuid::parse_str(text).map_err(|err| SourceError::InvalidField {
                line,
                field: "user_id",
                message: err.to_string(),
            })?)
        }
        _ => None,
    };

    let age_text = field(columns.age, "age")?;
    let age = parse_age(age_text).ok_or_else(|| SourceError::InvalidField {
        line,
        field: "age",
        message: format!("expected a non-negative number, got `{age_text}`"),
    })?;

    Ok(NewUser {
        user_id,
        name: field(columns.name, "name")?.to_string(),
        email: field(columns.email, "email")?.to_string(),
        age,
    })
}

/// Accepts `42` and decimal spellings such as `42.0` or `30.5`.
///
/// Fractions are rounded half away from zero, the way a scale-0 `DECIMAL`
/// column stores them.
fn parse_age(text: &str) -> Option<u32> {
    if let Ok(age) = text.parse::<u32>() {
        return Some(age);
    }
    let value = text.parse::<f64>().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    let rounded = value.round();
    if rounded <= f64::from(u32::MAX) {
        Some(rounded as u32)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_age, CsvUserSource};
    use crate::source::SourceError;
    use uuid::Uuid;

    #[test]
    fn reads_rows_in_order_with_columns_by_header() {
        let input = "email,age,name\nada@example.com,36,Ada\nbob@example.com,41,Bob\n";
        let users: Vec<_> = CsvUserSource::from_reader(input.as_bytes())
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(users.len(), 2);
        assert_eq!(users[0].name, "Ada");
        assert_eq!(users[1].email, "bob@example.com");
        assert_eq!(users[1].age, 41);
        assert!(users.iter().all(|user| user.user_id.is_none()));
    }

    #[test]
    fn keeps_optional_user_id_column() {
        let id = Uuid::new_v4();
        let input = format!("user_id,name,email,age\n{id},Ada,ada@example.com,36\n,Bob,b@x.io,2\n");
        let users: Vec<_> = CsvUserSource::from_reader(input.as_bytes())
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(users[0].user_id, Some(id));
        assert_eq!(users[1].user_id, None);
    }

    #[test]
    fn missing_header_is_rejected_up_front() {
        let err = CsvUserSource::from_reader("name,email\nAda,a@x.io\n".as_bytes())
            .err()
            .unwrap();
        assert!(matches!(err, SourceError::MissingHeader("age")));
    }

    #[test]
    fn bad_age_reports_line_and_fuses() {
        let input = "name,email,age\nAda,a@x.io,36\nBob,b@x.io,-4\nEve,e@x.io,20\n";
        let mut source = CsvUserSource::from_reader(input.as_bytes()).unwrap();

        assert!(source.next().unwrap().is_ok());
        match source.next().unwrap() {
            Err(SourceError::InvalidField { line, field, .. }) => {
                assert_eq!(line, 3);
                assert_eq!(field, "age");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(source.next().is_none());
    }

    #[test]
    fn parse_age_rounds_fractions_half_away_from_zero() {
        assert_eq!(parse_age("67"), Some(67));
        assert_eq!(parse_age("67.0"), Some(67));
        assert_eq!(parse_age("30.5"), Some(31));
        assert_eq!(parse_age("30.49"), Some(30));
        assert_eq!(parse_age("0.4"), Some(0));
        assert_eq!(parse_age("-1"), None);
        assert_eq!(parse_age("-0.4"), None);
        assert_eq!(parse_age("NaN"), None);
        assert_eq!(parse_age("1e10"), None);
        assert_eq!(parse_age("old"), None);
    }

    #[test]
    fn empty_name_and_email_are_passed_through() {
        let input = "name,email,age
Ann,,40
,x@x.io,5
";
        let users: Vec<_> = CsvUserSource::from_reader(input.as_bytes())
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(users[0].email, "");
        assert_eq!(users[1].name, "");
    }
}
