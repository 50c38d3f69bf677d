//! Delimited text (CSV and tab-separated) for office listings.

use super::{undeclared, ContentType, EntityRef, Formatter, FormattingError, Payload};
use crate::kind::EntityKind;

const KINDS: &[EntityKind] = &[EntityKind::Office];
const OFFICE_HEADER: [&str; 4] = ["#Office Name", "Long Name", "Office Type", "Reports To Office"];

/// A delimiter-separated table with a `#`-prefixed header row.
#[derive(Debug, Clone, Copy)]
pub struct Delimited {
    name: &'static str,
    base: &'static str,
    delimiter: u8,
}

impl Delimited {
    pub fn csv_v1() -> Self {
        Self {
            name: "CsvV1",
            base: "text/csv",
            delimiter: b',',
        }
    }

    pub fn tab_v1() -> Self {
        Self {
            name: "TabV1",
            base: "text/tab-separated-values",
            delimiter: b'\t',
        }
    }

    fn error(&self, message: impl ToString) -> FormattingError {
        FormattingError::new(&self.content_type(), EntityKind::Office, message.to_string())
    }
}

impl Formatter for Delimited {
    fn name(&self) -> &'static str {
        self.name
    }

    fn content_type(&self) -> ContentType {
        ContentType::versioned(self.base, "1")
    }

    fn kinds(&self) -> &'static [EntityKind] {
        KINDS
    }

    fn format(&self, payload: &Payload<'_>) -> Result<String, FormattingError> {
        let kind = payload.kind();
        if !self.supports(kind) {
            return Err(undeclared(self, kind));
        }

        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(Vec::new());
        writer.write_record(OFFICE_HEADER).map_err(|e| self.error(e))?;

        for item in payload.items() {
            let EntityRef::Office(office) = item else {
                return Err(undeclared(self, item.kind()));
            };
            writer
                .write_record([
                    office.name.as_str(),
                    office.long_name.as_str(),
                    office.office_type.as_str(),
                    office.reports_to.as_deref().unwrap_or(""),
                ])
                .map_err(|e| self.error(e))?;
        }

        let bytes = writer.into_inner().map_err(|e| self.error(e))?;
        String::from_utf8(bytes).map_err(|e| self.error(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Location, Office};

    fn offices() -> Vec<Office> {
        vec![
            Office {
                name: "SPK".into(),
                long_name: "Sacramento District".into(),
                office_type: "DIS".into(),
                reports_to: Some("SPD".into()),
            },
            Office {
                name: "HQ".into(),
                long_name: "Headquarters, USACE".into(),
                office_type: "HQ".into(),
                reports_to: None,
            },
        ]
    }

    #[test]
    fn csv_rows_follow_header() {
        let offices = offices();
        let out = Delimited::csv_v1().format(&Payload::many(&offices)).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "#Office Name,Long Name,Office Type,Reports To Office");
        assert_eq!(lines[1], "SPK,Sacramento District,DIS,SPD");
        assert_eq!(lines[2], "HQ,\"Headquarters, USACE\",HQ,");
    }

    #[test]
    fn tab_uses_tabs() {
        let offices = offices();
        let out = Delimited::tab_v1().format(&Payload::one(&offices[0])).unwrap();
        assert_eq!(out.lines().nth(1), Some("SPK\tSacramento District\tDIS\tSPD"));
    }

    #[test]
    fn locations_are_not_declared() {
        let locs: Vec<Location> = vec![];
        assert!(Delimited::csv_v1().format(&Payload::many(&locs)).is_err());
        assert!(!Delimited::tab_v1().supports(EntityKind::Location));
    }
}
