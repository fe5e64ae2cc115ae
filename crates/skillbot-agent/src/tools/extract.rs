//! Document text extraction for `read_file`.
//!
//! Office formats are ZIP containers of XML parts; the built-in extractor
//! opens them with `zip` and pulls the text runs out with `regex`. PDFs go
//! through `pdf-extract`.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use regex::Regex;
use tracing::debug;

// ─────────────────────────────────────────────
// DocumentKind
// ─────────────────────────────────────────────

/// Formats that are converted to text instead of read verbatim.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
    Pptx,
    Spreadsheet,
    Csv,
}

impl DocumentKind {
    /// Classify by lowercase extension. `None` means plain text.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "docx" | "doc" => Some(DocumentKind::Docx),
            "pptx" | "ppt" => Some(DocumentKind::Pptx),
            "xlsx" | "xls" => Some(DocumentKind::Spreadsheet),
            "csv" => Some(DocumentKind::Csv),
            _ => None,
        }
    }

    /// Prefix of the `<label> Error: ...` text returned on failure.
    pub fn label(self) -> &'static str {
        match self {
            DocumentKind::Pdf => "PDF",
            DocumentKind::Docx => "Docx",
            DocumentKind::Pptx => "PPTX",
            DocumentKind::Spreadsheet => "Excel",
            DocumentKind::Csv => "CSV",
        }
    }
}

// ─────────────────────────────────────────────
// DocumentExtractor
// ─────────────────────────────────────────────

/// Converts a document into text the model can read.
pub trait DocumentExtractor: Send + Sync {
    fn extract(&self, kind: DocumentKind, path: &Path) -> Result<String>;
}

/// Extractor backed by `pdf-extract` and `zip`.
#[derive(Clone, Debug)]
pub struct BuiltinExtractor {
    /// PDF pages rendered before `[Truncated]`.
    pub max_pages: usize,
    /// Data rows rendered per sheet / CSV file.
    pub max_rows: usize,
}

impl Default for BuiltinExtractor {
    fn default() -> Self {
        Self {
            max_pages: 20,
            max_rows: 50,
        }
    }
}

impl DocumentExtractor for BuiltinExtractor {
    fn extract(&self, kind: DocumentKind, path: &Path) -> Result<String> {
        match kind {
            DocumentKind::Pdf => self.pdf(path),
            DocumentKind::Docx => docx(path),
            DocumentKind::Pptx => pptx(path),
            DocumentKind::Spreadsheet => self.spreadsheet(path),
            DocumentKind::Csv => self.csv(path),
        }
    }
}

impl BuiltinExtractor {
    fn pdf(&self, path: &Path) -> Result<String> {
        let pages = pdf_extract::extract_text_by_pages(path).map_err(|e| anyhow!("{e}"))?;

        let mut text: Vec<String> = pages
            .iter()
            .take(self.max_pages)
            .enumerate()
            .map(|(i, page)| {
                let content = if page.trim().is_empty() {
                    "[Image Page]"
                } else {
                    page.as_str()
                };
                format!("--- Page {} ---\n{}", i + 1, content)
            })
            .collect();

        if pages.len() > self.max_pages {
            text.push("[Truncated]".to_string());
        }
        Ok(text.join("\n"))
    }

    fn spreadsheet(&self, path: &Path) -> Result<String> {
        let mut archive = open_archive(path)?;

        let shared = match read_part(&mut archive, "xl/sharedStrings.xml") {
            Ok(xml) => shared_strings(&xml)?,
            Err(_) => Vec::new(),
        };
        let workbook = read_part(&mut archive, "xl/workbook.xml")?;
        let rels = read_part(&mut archive, "xl/_rels/workbook.xml.rels")?;
        let targets = relationship_targets(&rels)?;

        let sheet_re = Regex::new(r"<sheet\s[^>]*>")?;
        let mut output = Vec::new();
        for tag in sheet_re.find_iter(&workbook) {
            let attrs = attributes(tag.as_str())?;
            let name = attrs.get("name").cloned().unwrap_or_default();
            let Some(target) = attrs.get("r:id").and_then(|id| targets.get(id)) else {
                continue;
            };
            let part = match target.strip_prefix('/') {
                Some(abs) => abs.to_string(),
                None => format!("xl/{target}"),
            };
            let xml = read_part(&mut archive, &part)?;
            let rows = sheet_rows(&xml, &shared)?;
            output.push(format!(
                "--- Sheet: {} ---\n{}",
                name,
                markdown_table(&rows, self.max_rows)
            ));
        }

        Ok(output.join("\n\n"))
    }

    fn csv(&self, path: &Path) -> Result<String> {
        let bytes = std::fs::read(path)?;
        let text = String::from_utf8_lossy(&bytes);
        Ok(markdown_table(&parse_csv(&text), self.max_rows))
    }
}

// ─────────────────────────────────────────────
// Office helpers
// ─────────────────────────────────────────────

fn open_archive(path: &Path) -> Result<zip::ZipArchive<File>> {
    let file = File::open(path)?;
    zip::ZipArchive::new(file).context("not a valid Office Open XML file")
}

fn read_part(archive: &mut zip::ZipArchive<File>, name: &str) -> Result<String> {
    let mut part = archive
        .by_name(name)
        .with_context(|| format!("missing part {name}"))?;
    let mut xml = String::new();
    part.read_to_string(&mut xml)?;
    Ok(xml)
}

fn docx(path: &Path) -> Result<String> {
    let mut archive = open_archive(path)?;
    let xml = read_part(&mut archive, "word/document.xml")?;

    let table_re = Regex::new(r"(?s)<w:tbl>.*?</w:tbl>")?;
    let row_re = Regex::new(r"(?s)<w:tr(?:\s[^>]*)?>.*?</w:tr>")?;
    let cell_re = Regex::new(r"(?s)<w:tc(?:\s[^>]*)?>.*?</w:tc>")?;
    let para_re = Regex::new(r"(?s)<w:p(?:\s[^>]*[^/])?>.*?</w:p>")?;
    let run_re = Regex::new(r"<w:t(?:\s[^>]*)?>([^<]*)</w:t>")?;

    let paragraph_text = |fragment: &str| -> Vec<String> {
        para_re
            .find_iter(fragment)
            .map(|p| joined_runs(&run_re, p.as_str(), ""))
            .collect()
    };

    let body = table_re.replace_all(&xml, "");
    let mut text: Vec<String> = paragraph_text(&body)
        .into_iter()
        .filter(|p| !p.trim().is_empty())
        .collect();

    for table in table_re.find_iter(&xml) {
        for row in row_re.find_iter(table.as_str()) {
            let cells: Vec<String> = cell_re
                .find_iter(row.as_str())
                .map(|c| paragraph_text(c.as_str()).join("\n"))
                .collect();
            text.push(cells.join(" | "));
        }
    }

    Ok(text.join("\n"))
}

fn pptx(path: &Path) -> Result<String> {
    let mut archive = open_archive(path)?;

    let slide_re = Regex::new(r"^ppt/slides/slide(\d+)\.xml$")?;
    let mut slides: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| {
            let num = slide_re.captures(name)?.get(1)?.as_str().parse().ok()?;
            Some((num, name.to_string()))
        })
        .collect();
    slides.sort();

    let para_re = Regex::new(r"(?s)<a:p(?:\s[^>]*[^/])?>.*?</a:p>")?;
    let run_re = Regex::new(r"<a:t(?:\s[^>]*)?>([^<]*)</a:t>")?;

    let mut text = Vec::new();
    for (i, (_, name)) in slides.iter().enumerate() {
        let xml = read_part(&mut archive, name)?;
        let lines: Vec<String> = para_re
            .find_iter(&xml)
            .map(|p| joined_runs(&run_re, p.as_str(), ""))
            .filter(|line| !line.is_empty())
            .collect();
        text.push(format!("--- Slide {} ---\n{}", i + 1, lines.join("\n")));
    }

    Ok(text.join("\n"))
}

/// Concatenate the first capture group of every match, XML-unescaped.
fn joined_runs(run_re: &Regex, fragment: &str, sep: &str) -> String {
    run_re
        .captures_iter(fragment)
        .filter_map(|c| c.get(1))
        .map(|m| unescape_xml(m.as_str()))
        .collect::<Vec<_>>()
        .join(sep)
}

fn unescape_xml(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// `name="value"` pairs of one XML tag.
fn attributes(tag: &str) -> Result<HashMap<String, String>> {
    let attr_re = Regex::new(r#"([\w:]+)="([^"]*)""#)?;
    Ok(attr_re
        .captures_iter(tag)
        .map(|c| (c[1].to_string(), unescape_xml(&c[2])))
        .collect())
}

fn shared_strings(xml: &str) -> Result<Vec<String>> {
    let si_re = Regex::new(r"(?s)<si>(.*?)</si>")?;
    let t_re = Regex::new(r"<t(?:\s[^>]*)?>([^<]*)</t>")?;
    Ok(si_re
        .captures_iter(xml)
        .map(|c| joined_runs(&t_re, &c[1], ""))
        .collect())
}

/// Relationship id → target path.
fn relationship_targets(xml: &str) -> Result<HashMap<String, String>> {
    let rel_re = Regex::new(r"<Relationship\s[^>]*>")?;
    let mut targets = HashMap::new();
    for tag in rel_re.find_iter(xml) {
        let attrs = attributes(tag.as_str())?;
        if let (Some(id), Some(target)) = (attrs.get("Id"), attrs.get("Target")) {
            targets.insert(id.clone(), target.clone());
        }
    }
    Ok(targets)
}

/// Columns in a worksheet (`A` through `XFD`).
const MAX_COLUMNS: usize = 16_384;

/// Zero-based column index of a cell reference such as `"AB12"`.
///
/// `None` for references without letters or past column `XFD`.
fn column_index(reference: &str) -> Option<usize> {
    let mut n = 0usize;
    for b in reference.bytes().take_while(u8::is_ascii_alphabetic) {
        n = n * 26 + (b.to_ascii_uppercase() - b'A' + 1) as usize;
        if n > MAX_COLUMNS {
            return None;
        }
    }
    n.checked_sub(1)
}

fn sheet_rows(xml: &str, shared: &[String]) -> Result<Vec<Vec<String>>> {
    let row_re = Regex::new(r"(?s)<row\b[^>]*?(?:/>|>(.*?)</row>)")?;
    let cell_re = Regex::new(r"(?s)<c\b([^>]*?)(?:/>|>(.*?)</c>)")?;
    let value_re = Regex::new(r"(?s)<v>(.*?)</v>")?;
    let inline_re = Regex::new(r"<t(?:\s[^>]*)?>([^<]*)</t>")?;

    let mut rows = Vec::new();
    for row in row_re.captures_iter(xml) {
        let Some(body) = row.get(1) else {
            rows.push(Vec::new());
            continue;
        };
        let mut cells: Vec<String> = Vec::new();
        for cell in cell_re.captures_iter(body.as_str()) {
            let attrs = attributes(&cell[1])?;
            let inner = cell.get(2).map_or("", |m| m.as_str());
            let raw = value_re
                .captures(inner)
                .and_then(|c| c.get(1))
                .map(|m| unescape_xml(m.as_str()));

            let value = match attrs.get("t").map(String::as_str) {
                Some("s") => raw
                    .and_then(|r| r.trim().parse::<usize>().ok())
                    .and_then(|i| shared.get(i).cloned())
                    .unwrap_or_default(),
                Some("inlineStr") => joined_runs(&inline_re, inner, ""),
                Some("b") => match raw.as_deref() {
                    Some("1") => "True".to_string(),
                    Some(_) => "False".to_string(),
                    None => String::new(),
                },
                _ => raw.unwrap_or_default(),
            };

            let col = match attrs.get("r") {
                Some(r) => column_index(r),
                None => Some(cells.len()),
            };
            let Some(col) = col.filter(|&c| c < MAX_COLUMNS) else {
                debug!("Skipping cell outside the worksheet column range");
                continue;
            };
            if cells.len() <= col {
                cells.resize(col + 1, String::new());
            }
            cells[col] = value;
        }
        rows.push(cells);
    }
    Ok(rows)
}

// ─────────────────────────────────────────────
// Tables
// ─────────────────────────────────────────────

/// Split CSV text into rows, honoring double-quoted fields.
fn parse_csv(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => row.push(std::mem::take(&mut field)),
            '\r' if !in_quotes => {}
            '\n' if !in_quotes => {
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
            }
            _ => field.push(c),
        }
    }
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }
    rows
}

/// Markdown table with the first row as header and at most `max_rows` data rows.
fn markdown_table(rows: &[Vec<String>], max_rows: usize) -> String {
    let Some((header, data)) = rows.split_first() else {
        return String::new();
    };
    let data = &data[..data.len().min(max_rows)];
    let width = std::iter::once(header)
        .chain(data.iter())
        .map(Vec::len)
        .max()
        .unwrap_or(0)
        .max(1);

    let render = |row: &Vec<String>| {
        let cells: Vec<String> = (0..width)
            .map(|i| {
                row.get(i)
                    .map(|c| c.replace(['\n', '\r'], " "))
                    .unwrap_or_default()
            })
            .collect();
        format!("| {} |", cells.join(" | "))
    };

    let mut lines = vec![render(header)];
    lines.push(format!("|{}", "---|".repeat(width)));
    lines.extend(data.iter().map(render));
    lines.join("\n")
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use zip::write::SimpleFileOptions;

    fn write_zip(dir: &Path, name: &str, parts: &[(&str, &str)]) -> PathBuf {
        let path = dir.join(name);
        let mut zip = zip::ZipWriter::new(File::create(&path).unwrap());
        for (part, content) in parts {
            zip.start_file(*part, SimpleFileOptions::default()).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
        path
    }

    #[test]
    fn kind_from_extension() {
        assert_eq!(DocumentKind::from_path(Path::new("a.PDF")), Some(DocumentKind::Pdf));
        assert_eq!(DocumentKind::from_path(Path::new("a.doc")), Some(DocumentKind::Docx));
        assert_eq!(DocumentKind::from_path(Path::new("a.pptx")), Some(DocumentKind::Pptx));
        assert_eq!(
            DocumentKind::from_path(Path::new("a.xls")),
            Some(DocumentKind::Spreadsheet)
        );
        assert_eq!(DocumentKind::from_path(Path::new("a.csv")), Some(DocumentKind::Csv));
        assert_eq!(DocumentKind::from_path(Path::new("a.md")), None);
        assert_eq!(DocumentKind::from_path(Path::new("Makefile")), None);
    }

    #[test]
    fn docx_paragraphs_then_tables() {
        let dir = tempfile::tempdir().unwrap();
        let xml = r#"<w:document><w:body>
            <w:p w:rsidR="1"><w:r><w:t>Hello </w:t></w:r><w:r><w:t xml:space="preserve">world &amp; co</w:t></w:r></w:p>
            <w:p/>
            <w:tbl><w:tr><w:tc><w:p><w:r><w:t>A</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>B</w:t></w:r></w:p></w:tc></w:tr></w:tbl>
            <w:p><w:pPr/><w:r><w:t>Last</w:t></w:r></w:p>
        </w:body></w:document>"#;
        let path = write_zip(dir.path(), "doc.docx", &[("word/document.xml", xml)]);

        let text = BuiltinExtractor::default()
            .extract(DocumentKind::Docx, &path)
            .unwrap();
        assert_eq!(text, "Hello world & co\nLast\nA | B");
    }

    #[test]
    fn pptx_slides_in_numeric_order() {
        let dir = tempfile::tempdir().unwrap();
        let slide = |t: &str| format!("<p:sld><p:sp><a:p><a:r><a:t>{t}</a:t></a:r></a:p></p:sp></p:sld>");
        let s1 = slide("One");
        let s2 = slide("Two");
        let s10 = slide("Ten");
        let path = write_zip(
            dir.path(),
            "deck.pptx",
            &[
                ("ppt/slides/slide10.xml", &s10),
                ("ppt/slides/slide2.xml", &s2),
                ("ppt/slides/slide1.xml", &s1),
            ],
        );

        let text = BuiltinExtractor::default()
            .extract(DocumentKind::Pptx, &path)
            .unwrap();
        assert_eq!(
            text,
            "--- Slide 1 ---\nOne\n--- Slide 2 ---\nTwo\n--- Slide 3 ---\nTen"
        );
    }

    #[test]
    fn xlsx_sheets_as_tables() {
        let dir = tempfile::tempdir().unwrap();
        let workbook = r#"<workbook><sheets><sheet name="Sales" sheetId="1" r:id="rId1"/></sheets></workbook>"#;
        let rels = r#"<Relationships><Relationship Id="rId1" Type="x" Target="worksheets/sheet1.xml"/></Relationships>"#;
        let shared = r#"<sst><si><t>item</t></si><si><t>qty</t></si><si><t>apple</t></si></sst>"#;
        let sheet = r#"<worksheet><sheetData>
            <row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c></row>
            <row r="2"><c r="A2" t="s"><v>2</v></c><c r="C2"><v>3</v></c></row>
        </sheetData></worksheet>"#;
        let path = write_zip(
            dir.path(),
            "book.xlsx",
            &[
                ("xl/workbook.xml", workbook),
                ("xl/_rels/workbook.xml.rels", rels),
                ("xl/sharedStrings.xml", shared),
                ("xl/worksheets/sheet1.xml", sheet),
            ],
        );

        let text = BuiltinExtractor::default()
            .extract(DocumentKind::Spreadsheet, &path)
            .unwrap();
        assert_eq!(
            text,
            "--- Sheet: Sales ---\n| item | qty |  |\n|---|---|---|\n| apple |  | 3 |"
        );
    }

    #[test]
    fn cells_past_last_column_are_skipped() {
        let far = "Z".repeat(40);
        let sheet = format!(
            r#"<worksheet><sheetData>
            <row r="1"><c r="A1"><v>1</v></c><c r="XFE1"><v>2</v></c><c r="{far}1"><v>3</v></c><c r="B1"><v>4</v></c></row>
        </sheetData></worksheet>"#
        );

        let rows = sheet_rows(&sheet, &[]).unwrap();
        assert_eq!(rows, vec![vec!["1".to_string(), "4".to_string()]]);
    }

    #[test]
    fn not_a_zip_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.doc");
        std::fs::write(&path, b"\xd0\xcf\x11\xe0 binary").unwrap();
        assert!(BuiltinExtractor::default()
            .extract(DocumentKind::Docx, &path)
            .is_err());
    }

    #[test]
    fn csv_limits_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        let mut content = String::from("name,note\n");
        for i in 0..60 {
            content.push_str(&format!("row{i},\"a, \"\"quoted\"\" note\"\n"));
        }
        std::fs::write(&path, content).unwrap();

        let text = BuiltinExtractor::default()
            .extract(DocumentKind::Csv, &path)
            .unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 52);
        assert_eq!(lines[0], "| name | note |");
        assert_eq!(lines[2], "| row0 | a, \"quoted\" note |");
        assert_eq!(lines[51], "| row49 | a, \"quoted\" note |");
    }

    #[test]
    fn column_index_letters() {
        assert_eq!(column_index("A1"), Some(0));
        assert_eq!(column_index("Z9"), Some(25));
        assert_eq!(column_index("AA10"), Some(26));
        assert_eq!(column_index("12"), None);
        assert_eq!(column_index("XFD1"), Some(MAX_COLUMNS - 1));
        assert_eq!(column_index("XFE1"), None);
        assert_eq!(column_index(&format!("{}1", "Z".repeat(64))), None);
    }
}
