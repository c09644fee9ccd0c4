use std::collections::{HashMap, HashSet};
use std::io::Cursor;

use lopdf::content::Content;
use lopdf::Object;
use tracing::debug;

use super::types::{Format, RawValue, Record};
use crate::error::IngestError;

const CSV_MIME: &[&str] = &["text/csv", "application/csv", "text/comma-separated-values"];
const SPREADSHEET_MIME: &[&str] = &[
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-excel",
    "application/vnd.ms-excel.sheet.macroenabled.12",
    "application/vnd.ms-excel.sheet.binary.macroenabled.12",
    "application/vnd.oasis.opendocument.spreadsheet",
];
const PDF_MIME: &[&str] = &["application/pdf"];

const SPREADSHEET_EXT: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

fn from_mime(content_type: &str) -> Option<Format> {
    let lowered = content_type.trim().to_ascii_lowercase();
    let mime = lowered.split(';').next().unwrap_or("").trim();
    if CSV_MIME.contains(&mime) {
        Some(Format::Csv)
    } else if SPREADSHEET_MIME.contains(&mime) {
        Some(Format::Spreadsheet)
    } else if PDF_MIME.contains(&mime) {
        Some(Format::Pdf)
    } else {
        None
    }
}

/// Names may contain `/`, so only the text after the last `.` counts.
fn from_extension(name: &str) -> Option<Format> {
    let lowered = name.trim().to_ascii_lowercase();
    match lowered.rsplit('.').next().unwrap_or("") {
        "csv" => Some(Format::Csv),
        "pdf" => Some(Format::Pdf),
        ext if SPREADSHEET_EXT.contains(&ext) => Some(Format::Spreadsheet),
        _ => None,
    }
}

/// Map a declared content type or a file name/extension to a reader family.
pub fn detect_format(hint: &str) -> Result<Format, IngestError> {
    from_mime(hint)
        .or_else(|| from_extension(hint))
        .ok_or_else(|| IngestError::UnsupportedFormat {
            hint: hint.to_string(),
        })
}

/// Resolve from a file name's extension first, falling back to a declared
/// content type.
pub fn resolve_format(name: &str, content_type: Option<&str>) -> Result<Format, IngestError> {
    if let Some(format) = from_extension(name) {
        return Ok(format);
    }
    match content_type {
        Some(ct) if !ct.trim().is_empty() => detect_format(ct),
        _ => Err(IngestError::UnsupportedFormat {
            hint: name.to_string(),
        }),
    }
}

pub fn read_records(bytes: &[u8], format: Format) -> Result<Vec<Record>, IngestError> {
    let records = match format {
        Format::Csv => read_csv(bytes)?,
        Format::Spreadsheet => read_spreadsheet(bytes)?,
        Format::Pdf => read_pdf(bytes)?,
    };
    debug!(%format, records = records.len(), size = bytes.len(), "source read");
    Ok(records)
}

fn read_csv(bytes: &[u8]) -> Result<Vec<Record>, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| IngestError::read(Format::Csv, format!("header row: {}", e)))?
        .iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
    let mut keys = HeaderKeys::new(headers);

    let mut records = Vec::new();
    for (index, row) in reader.records().enumerate() {
        let row = row.map_err(|e| IngestError::read(Format::Csv, format!("row {}: {}", index + 1, e)))?;
        let mut fields = Vec::with_capacity(row.len());
        for (col, value) in row.iter().enumerate() {
            fields.push((keys.key(col), RawValue::from(value)));
        }
        records.push(Record::Tabular(fields));
    }
    Ok(records)
}

/// Reads only the first sheet by position; later sheets are ignored.
fn read_spreadsheet(bytes: &[u8]) -> Result<Vec<Record>, IngestError> {
    use calamine::{open_workbook_auto_from_rs, Reader};

    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| IngestError::read(Format::Spreadsheet, format!("open workbook: {}", e)))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| IngestError::read(Format::Spreadsheet, "workbook has no sheets"))?
        .map_err(|e| IngestError::read(Format::Spreadsheet, format!("first sheet: {}", e)))?;

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Ok(Vec::new());
    };
    let mut keys = HeaderKeys::new(header_row.iter().map(|cell| cell.to_string()));

    let mut records = Vec::new();
    for row in rows {
        let mut fields = Vec::new();
        for (col, cell) in row.iter().enumerate() {
            if let Some(value) = cell_value(cell) {
                fields.push((keys.key(col), value));
            }
        }
        // Fully blank rows carry nothing.
        if !fields.is_empty() {
            records.push(Record::Tabular(fields));
        }
    }
    Ok(records)
}

fn cell_value(cell: &calamine::Data) -> Option<RawValue> {
    use calamine::Data;

    match cell {
        Data::Empty => None,
        Data::String(s) => Some(RawValue::Text(s.clone())),
        Data::Int(i) => Some(RawValue::Int(*i)),
        Data::Float(f) => Some(RawValue::Float(*f)),
        Data::Bool(b) => Some(RawValue::Bool(*b)),
        other => Some(RawValue::Text(other.to_string())),
    }
}

fn read_pdf(bytes: &[u8]) -> Result<Vec<Record>, IngestError> {
    let document = lopdf::Document::load_mem(bytes)
        .map_err(|e| IngestError::read(Format::Pdf, format!("load document: {}", e)))?;

    let mut lines = PdfLines::default();
    for (page_number, page_id) in document.get_pages() {
        let encodings: HashMap<Vec<u8>, &str> = document
            .get_page_fonts(page_id)
            .into_iter()
            .map(|(name, font)| (name, font.get_font_encoding()))
            .collect();
        let content = document
            .get_page_content(page_id)
            .and_then(|data| Content::decode(&data))
            .map_err(|e| {
                IngestError::read(Format::Pdf, format!("page {} content: {}", page_number, e))
            })?;

        let mut encoding = None;
        for op in &content.operations {
            match op.operator.as_str() {
                "Tf" => {
                    encoding = op
                        .operands
                        .first()
                        .and_then(|font| font.as_name().ok())
                        .and_then(|font| encodings.get(font).copied());
                }
                "Tj" | "TJ" => lines.show(encoding, &op.operands),
                "Td" | "TD" => {
                    // A pure horizontal move stays on the same line.
                    let dy = op.operands.get(1).and_then(|o| o.as_float().ok());
                    if dy.map_or(true, |dy| dy != 0.0) {
                        lines.break_line();
                    }
                }
                "T*" => lines.break_line(),
                "'" | "\"" => {
                    lines.break_line();
                    if let Some(text) = op.operands.last() {
                        lines.show(encoding, std::slice::from_ref(text));
                    }
                }
                "ET" => lines.break_line(),
                _ => {}
            }
        }
        lines.break_line();
    }
    Ok(lines.finish())
}

/// Text lines accumulated while walking content stream operators.
#[derive(Default)]
struct PdfLines {
    lines: Vec<String>,
    current: String,
}

impl PdfLines {
    fn show(&mut self, encoding: Option<&str>, operands: &[Object]) {
        for operand in operands {
            match operand {
                Object::String(bytes, _) => {
                    self.current
                        .push_str(&lopdf::Document::decode_text(encoding, bytes));
                }
                Object::Array(items) => self.show(encoding, items),
                // Large negative kerning inside TJ is a word gap.
                Object::Integer(_) | Object::Real(_) => {
                    if operand.as_float().map_or(false, |k| k < -100.0) {
                        self.current.push(' ');
                    }
                }
                _ => {}
            }
        }
    }

    /// Positioning never yields empty records; only shown text does.
    fn break_line(&mut self) {
        if !self.current.is_empty() {
            self.lines.push(std::mem::take(&mut self.current));
        }
    }

    /// Shown strings may carry their own line breaks, so split once more.
    fn finish(mut self) -> Vec<Record> {
        self.break_line();
        if self.lines.is_empty() {
            return Vec::new();
        }
        text_lines(&self.lines.join("\n"))
    }
}

/// One `TextLine` per line, empty lines included.
pub fn text_lines(text: &str) -> Vec<Record> {
    text.split('\n')
        .map(|line| Record::TextLine(line.strip_suffix('\r').unwrap_or(line).to_string()))
        .collect()
}

/// Unique field names for a header row.
///
/// Blank headers become `__EMPTY`, repeats get `_1`, `_2`, ... and columns
/// past the header get `_<index>`.
struct HeaderKeys {
    keys: Vec<String>,
    seen: HashSet<String>,
}

impl HeaderKeys {
    fn new(headers: impl IntoIterator<Item = String>) -> Self {
        let mut this = Self {
            keys: Vec::new(),
            seen: HashSet::new(),
        };
        for header in headers {
            let base = if header.is_empty() {
                "__EMPTY".to_string()
            } else {
                header
            };
            this.push_unique(base);
        }
        this
    }

    fn key(&mut self, col: usize) -> String {
        while self.keys.len() <= col {
            let base = format!("_{}", self.keys.len());
            self.push_unique(base);
        }
        self.keys[col].clone()
    }

    fn push_unique(&mut self, base: String) {
        let mut candidate = base.clone();
        let mut n = 1;
        while self.seen.contains(&candidate) {
            candidate = format!("{}_{}", base, n);
            n += 1;
        }
        self.seen.insert(candidate.clone());
        self.keys.push(candidate);
    }
}

#[cfg(test)]
mod tests {
    use lopdf::content::Operation;
    use lopdf::{dictionary, Document, Stream};

    use super::*;
    use crate::docs::normalize::normalize_all;

    const TWO_SHEETS: &[u8] = include_bytes!("testdata/two_sheets.xlsx");

    fn read(bytes: &[u8], hint: &str) -> Result<Vec<Record>, IngestError> {
        read_records(bytes, detect_format(hint)?)
    }

    /// A one-page PDF whose content stream is exactly `operations`.
    fn pdf_with(operations: Vec<Operation>) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    fn op(operator: &str, operands: Vec<Object>) -> Operation {
        Operation::new(operator, operands)
    }

    fn show(text: &str) -> Operation {
        op("Tj", vec![Object::string_literal(text)])
    }

    fn lines(records: &[Record]) -> Vec<&str> {
        records
            .iter()
            .map(|r| match r {
                Record::TextLine(line) => line.as_str(),
                Record::Tabular(_) => panic!("expected text lines"),
            })
            .collect()
    }

    fn tabular(pairs: &[(&str, &str)]) -> Record {
        Record::Tabular(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), RawValue::from(*v)))
                .collect(),
        )
    }

    #[test]
    fn detects_by_extension_and_content_type() {
        assert_eq!(detect_format("a.csv").unwrap(), Format::Csv);
        assert_eq!(detect_format(".CSV").unwrap(), Format::Csv);
        assert_eq!(detect_format("Report.XLSX").unwrap(), Format::Spreadsheet);
        assert_eq!(detect_format("old.xls").unwrap(), Format::Spreadsheet);
        assert_eq!(detect_format("scan.pdf").unwrap(), Format::Pdf);
        assert_eq!(detect_format("text/csv; charset=utf-8").unwrap(), Format::Csv);
        assert_eq!(detect_format("application/pdf").unwrap(), Format::Pdf);
        assert_eq!(
            detect_format("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet")
                .unwrap(),
            Format::Spreadsheet
        );
    }

    #[test]
    fn unknown_hints_are_unsupported_and_read_nothing() {
        for hint in ["notes.txt", "image/png", "", "archive.tar.gz", "application/json"] {
            match read(b"name,age\nAnn,30\n", hint) {
                Err(IngestError::UnsupportedFormat { hint: h }) => assert_eq!(h, hint),
                other => panic!("expected UnsupportedFormat for {:?}, got {:?}", hint, other),
            }
        }
    }

    #[test]
    fn name_wins_over_content_type() {
        assert_eq!(
            resolve_format("data.csv", Some("application/vnd.ms-excel")).unwrap(),
            Format::Csv
        );
        assert_eq!(
            resolve_format("upload", Some("application/pdf")).unwrap(),
            Format::Pdf
        );
        assert!(resolve_format("upload", None).is_err());
    }

    #[test]
    fn csv_rows_keyed_by_header_in_order() {
        let records = read(b"name,age\nAnn,30\nBob,25\n", "csv").unwrap();
        assert_eq!(
            records,
            vec![
                tabular(&[("name", "Ann"), ("age", "30")]),
                tabular(&[("name", "Bob"), ("age", "25")]),
            ]
        );
    }

    #[test]
    fn csv_keeps_duplicates_and_handles_ragged_rows() {
        let records = read(b"a,b\n1,1\n1,1\n2\n3,4,5\n", "x.csv").unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(records[0], records[1]);
        assert_eq!(records[2], tabular(&[("a", "2")]));
        assert_eq!(records[3], tabular(&[("a", "3"), ("b", "4"), ("_2", "5")]));
    }

    #[test]
    fn csv_header_names_made_unique() {
        let records = read(b"id,id,,_2\n1,2,3,4,5\n", "csv").unwrap();
        let Record::Tabular(fields) = &records[0] else {
            panic!("expected tabular record");
        };
        let keys: Vec<&str> = fields.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["id", "id_1", "__EMPTY", "_2", "_4"]);
    }

    #[test]
    fn csv_with_header_only_is_empty() {
        assert!(read(b"name,age\n", "csv").unwrap().is_empty());
        assert!(read(b"", "csv").unwrap().is_empty());
    }

    #[test]
    fn csv_invalid_utf8_is_read_error() {
        let err = read(b"name\n\xff\xfe\n", "csv").unwrap_err();
        assert!(matches!(err, IngestError::Read { format: Format::Csv, .. }));
    }

    #[test]
    fn text_lines_keep_empty_lines() {
        assert_eq!(
            text_lines("Total: 42\n"),
            vec![
                Record::TextLine("Total: 42".into()),
                Record::TextLine(String::new()),
            ]
        );
        assert_eq!(
            text_lines("a\r\nb"),
            vec![Record::TextLine("a".into()), Record::TextLine("b".into())]
        );
    }

    #[test]
    fn names_with_slashes_match_by_extension() {
        assert_eq!(resolve_format("2023/24 sales.csv", None).unwrap(), Format::Csv);
        assert_eq!(
            resolve_format("q1/q2 report.pdf", Some("application/octet-stream")).unwrap(),
            Format::Pdf
        );
        assert_eq!(detect_format("2023/24 sales.xlsx").unwrap(), Format::Spreadsheet);
        assert!(resolve_format("2023/24 notes.txt", None).is_err());
    }

    #[test]
    fn spreadsheet_reads_first_sheet_with_header_row() {
        let records = read(TWO_SHEETS, "people.xlsx").unwrap();
        let normalized = normalize_all(&records);
        let rows: Vec<Vec<(&str, &str)>> = normalized
            .iter()
            .map(|r| {
                r.fields()
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.as_str()))
                    .collect()
            })
            .collect();

        assert_eq!(
            rows,
            vec![
                vec![("name", "ANN"), ("__EMPTY", "X"), ("name_1", "ANNIE"), ("age", "30")],
                vec![("name", "BOB"), ("age", "25.5")],
            ]
        );
    }

    #[test]
    fn spreadsheet_omits_blank_cells_and_rows() {
        let records = read(TWO_SHEETS, "application/vnd.ms-excel").unwrap();
        assert_eq!(records.len(), 2);
        let Record::Tabular(fields) = &records[1] else {
            panic!("expected tabular record");
        };
        assert_eq!(fields.len(), 2);
        assert!(records.iter().all(|r| match r {
            Record::Tabular(fields) => fields.iter().all(|(k, _)| k != "other"),
            Record::TextLine(_) => false,
        }));
    }

    #[test]
    fn pdf_positioned_lines_become_separate_records() {
        let bytes = pdf_with(vec![
            op("BT", vec![]),
            op("Tf", vec!["F1".into(), 12.into()]),
            op("Td", vec![100.into(), 700.into()]),
            show("Total: 42"),
            op("Td", vec![0.into(), (-14).into()]),
            show("Second line"),
            op("ET", vec![]),
        ]);
        let records = read(&bytes, "x.pdf").unwrap();
        assert_eq!(lines(&records), vec!["Total: 42", "Second line"]);
    }

    #[test]
    fn pdf_line_operators_and_horizontal_moves() {
        let bytes = pdf_with(vec![
            op("BT", vec![]),
            op("Tf", vec!["F1".into(), 12.into()]),
            op("Td", vec![72.into(), 700.into()]),
            show("Total:"),
            op("Td", vec![40.into(), 0.into()]),
            show(" 42"),
            op("T*", vec![]),
            op(
                "TJ",
                vec![Object::Array(vec![
                    Object::string_literal("Net"),
                    (-250).into(),
                    Object::string_literal("due"),
                ])],
            ),
            op("'", vec![Object::string_literal("Quoted")]),
            op("ET", vec![]),
            op("BT", vec![]),
            op("Tf", vec!["F1".into(), 12.into()]),
            show("Footer"),
            op("ET", vec![]),
        ]);
        let records = read(&bytes, "application/pdf").unwrap();
        assert_eq!(
            lines(&records),
            vec!["Total: 42", "Net due", "Quoted", "Footer"]
        );
    }

    #[test]
    fn pdf_without_text_has_no_records() {
        let bytes = pdf_with(vec![op("BT", vec![]), op("ET", vec![])]);
        assert!(read(&bytes, "empty.pdf").unwrap().is_empty());
    }

    #[test]
    fn malformed_binary_sources_are_read_errors() {
        let err = read(b"definitely not a workbook", "book.xlsx").unwrap_err();
        assert!(matches!(err, IngestError::Read { format: Format::Spreadsheet, .. }));

        let err = read(b"definitely not a pdf", "scan.pdf").unwrap_err();
        assert!(matches!(err, IngestError::Read { format: Format::Pdf, .. }));
    }
}
