//! # Spreadsheet Export
//!
//! Records → XLSX workbook. Each sheet gets a styled header row, one row
//! per record and, when any column is summable, a totals row of `SUM`
//! formulas over the data rows.
//!
//! Layout of a sheet with `N` records (1-based spreadsheet rows):
//!
//! ```text
//! row 1          header
//! rows 2..=N+1   records
//! row N+2        totals (=SUM(<col>2:<col>N+1), or =0 when N = 0)
//! ```
//!
//! Image columns hold URLs. Each is fetched through the image store and
//! embedded in its cell; a failed fetch or decode leaves the cell empty
//! and the export carries on.

use chrono::Utc;
use rust_xlsxwriter::{Color, Format, FormatAlign, Image, Workbook, Worksheet};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Cursor;
use tracing::{debug, info, warn};

use super::{Artifact, CancelToken, ExportError, ExportOutcome, artifact_filename};
use crate::config::SheetConfig;
use crate::store::ImageStore;

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Spreadsheet limit on columns per sheet.
const MAX_COLUMNS: usize = 16_384;

/// Header row index (0-based).
const HEADER_ROW: u32 = 0;
const FIRST_DATA_ROW: u32 = 1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    #[default]
    Text,
    Number,
    /// Cell values are image URLs.
    Image,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDef {
    /// Record key this column reads.
    pub key: String,
    pub header: String,
    #[serde(default)]
    pub kind: ColumnKind,
    /// Adds a `SUM` to the totals row.
    #[serde(default)]
    pub summable: bool,
    /// Width in characters.
    #[serde(default)]
    pub width: Option<f64>,
    /// Excel number format, e.g. `"$#,##0.00"`.
    #[serde(default)]
    pub num_format: Option<String>,
}

impl ColumnDef {
    pub fn new(key: impl Into<String>, header: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            key: key.into(),
            header: header.into(),
            kind,
            summable: false,
            width: None,
            num_format: None,
        }
    }

    pub fn summable(mut self) -> Self {
        self.summable = true;
        self
    }

    pub fn with_format(mut self, num_format: impl Into<String>) -> Self {
        self.num_format = Some(num_format.into());
        self
    }
}

/// One cell of a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Bool(bool),
    Empty,
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

pub type Record = HashMap<String, CellValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetSpec {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    #[serde(default)]
    pub rows: Vec<Record>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkbookSpec {
    /// Used for the artifact file name.
    pub subject: String,
    pub sheets: Vec<SheetSpec>,
}

/// `SUM` over one column's data rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateRange {
    pub column: u16,
    /// 0-based row of the first record.
    pub first_row: u32,
    pub row_count: u32,
}

impl AggregateRange {
    /// `=SUM(C2:C4)` for three records in column C, `=0` for none.
    pub fn to_formula(&self) -> String {
        if self.row_count == 0 {
            return "=0".to_string();
        }
        let col = column_name(self.column);
        let first = self.first_row + 1;
        let last = self.first_row + self.row_count;
        format!("=SUM({col}{first}:{col}{last})")
    }
}

/// Where everything lands on a sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetPlan {
    pub header_row: u32,
    pub first_data_row: u32,
    pub row_count: u32,
    /// Present when at least one column is summable.
    pub totals_row: Option<u32>,
    pub aggregates: Vec<AggregateRange>,
}

impl SheetPlan {
    pub fn for_sheet(sheet: &SheetSpec) -> Result<Self, ExportError> {
        if sheet.columns.len() > MAX_COLUMNS {
            return Err(ExportError::Layout(format!(
                "sheet {:?} has {} columns, the limit is {}",
                sheet.name,
                sheet.columns.len(),
                MAX_COLUMNS
            )));
        }
        if let Some(col) = sheet
            .columns
            .iter()
            .find(|c| c.summable && c.kind == ColumnKind::Image)
        {
            return Err(ExportError::Layout(format!(
                "image column {:?} cannot be summed",
                col.key
            )));
        }

        let row_count = sheet.rows.len() as u32;
        let aggregates: Vec<AggregateRange> = sheet
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.summable)
            .map(|(i, _)| AggregateRange {
                column: i as u16,
                first_row: FIRST_DATA_ROW,
                row_count,
            })
            .collect();
        let totals_row = (!aggregates.is_empty()).then_some(FIRST_DATA_ROW + row_count);

        Ok(Self {
            header_row: HEADER_ROW,
            first_data_row: FIRST_DATA_ROW,
            row_count,
            totals_row,
            aggregates,
        })
    }
}

/// 0-based column index → spreadsheet letters (`0` → `A`, `26` → `AA`).
pub fn column_name(column: u16) -> String {
    let mut n = column as u32 + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

/// PNG bytes for every image URL the workbook needs.
type FetchedImages = HashMap<String, Vec<u8>>;

#[derive(Debug, Clone)]
pub struct SheetExporter {
    config: SheetConfig,
}

impl SheetExporter {
    pub fn new(config: SheetConfig) -> Self {
        Self { config }
    }

    /// Fetch images, then build and serialize the workbook.
    pub async fn export(
        &self,
        spec: &WorkbookSpec,
        store: &dyn ImageStore,
        cancel: &CancelToken,
    ) -> Result<ExportOutcome, ExportError> {
        info!(subject = %spec.subject, sheets = spec.sheets.len(), "Starting spreadsheet export");
        let plans = spec
            .sheets
            .iter()
            .map(SheetPlan::for_sheet)
            .collect::<Result<Vec<_>, _>>()?;

        let Some(images) = fetch_images(spec, store, cancel).await else {
            debug!(subject = %spec.subject, "Spreadsheet export cancelled");
            return Ok(ExportOutcome::Cancelled);
        };

        let exporter = self.clone();
        let owned_spec = spec.clone();
        let bytes = tokio::task::spawn_blocking(move || exporter.build(&owned_spec, &plans, &images))
            .await
            .map_err(|e| ExportError::Task(e.to_string()))??;
        if cancel.is_cancelled() {
            debug!(subject = %spec.subject, "Spreadsheet export cancelled before delivery");
            return Ok(ExportOutcome::Cancelled);
        }
        let artifact = Artifact {
            filename: artifact_filename(&spec.subject, Utc::now(), "xlsx"),
            content_type: XLSX_CONTENT_TYPE.to_string(),
            bytes,
        };
        info!(filename = %artifact.filename, bytes = artifact.bytes.len(), "Spreadsheet export finished");
        Ok(ExportOutcome::Completed(artifact))
    }

    fn build(
        &self,
        spec: &WorkbookSpec,
        plans: &[SheetPlan],
        images: &FetchedImages,
    ) -> Result<Vec<u8>, ExportError> {
        let mut workbook = Workbook::new();
        for (sheet, plan) in spec.sheets.iter().zip(plans) {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(&sheet.name)?;
            self.write_sheet(worksheet, sheet, plan, images)?;
        }
        Ok(workbook.save_to_buffer()?)
    }

    fn write_sheet(
        &self,
        worksheet: &mut Worksheet,
        sheet: &SheetSpec,
        plan: &SheetPlan,
        images: &FetchedImages,
    ) -> Result<(), ExportError> {
        let header = Format::new()
            .set_bold()
            .set_background_color(Color::RGB(self.config.header_fill))
            .set_align(FormatAlign::Center);
        let totals = Format::new().set_bold();
        let formats: Vec<Format> = sheet
            .columns
            .iter()
            .map(|c| match &c.num_format {
                Some(f) => Format::new().set_num_format(f),
                None => Format::new(),
            })
            .collect();

        for (c, column) in sheet.columns.iter().enumerate() {
            let col = c as u16;
            worksheet.write_string_with_format(plan.header_row, col, &column.header, &header)?;
            let width = column.width.unwrap_or(match column.kind {
                ColumnKind::Image => self.config.image_column_width,
                _ => (column.header.chars().count() as f64 + 2.0).max(10.0),
            });
            worksheet.set_column_width(col, width)?;
        }

        for (i, record) in sheet.rows.iter().enumerate() {
            let row = plan.first_data_row + i as u32;
            for (c, column) in sheet.columns.iter().enumerate() {
                let col = c as u16;
                let Some(value) = record.get(&column.key) else {
                    continue;
                };
                let format = &formats[c];
                match (column.kind, value) {
                    (_, CellValue::Empty) => {}
                    (ColumnKind::Image, CellValue::Text(url)) => {
                        if self.embed_image(worksheet, row, col, url, images)? {
                            worksheet.set_row_height(row, self.config.image_row_height)?;
                        }
                    }
                    (_, CellValue::Number(n)) => {
                        worksheet.write_number_with_format(row, col, *n, format)?;
                    }
                    (ColumnKind::Number, CellValue::Text(s)) => match s.trim().parse::<f64>() {
                        Ok(n) => {
                            worksheet.write_number_with_format(row, col, n, format)?;
                        }
                        Err(_) => {
                            worksheet.write_string(row, col, s)?;
                        }
                    },
                    (_, CellValue::Text(s)) => {
                        worksheet.write_string_with_format(row, col, s, format)?;
                    }
                    (_, CellValue::Bool(b)) => {
                        worksheet.write_boolean(row, col, *b)?;
                    }
                }
            }
        }

        if let Some(totals_row) = plan.totals_row {
            if let Some(label_col) = sheet.columns.iter().position(|c| !c.summable) {
                worksheet.write_string_with_format(totals_row, label_col as u16, "Total", &totals)?;
            }
            for aggregate in &plan.aggregates {
                let format = formats[aggregate.column as usize].clone().set_bold();
                worksheet.write_formula_with_format(
                    totals_row,
                    aggregate.column,
                    aggregate.to_formula().as_str(),
                    &format,
                )?;
            }
        }

        debug!(sheet = %sheet.name, rows = plan.row_count, "Wrote sheet");
        Ok(())
    }

    /// Place a fetched image in a cell. `false` when it was not available.
    fn embed_image(
        &self,
        worksheet: &mut Worksheet,
        row: u32,
        col: u16,
        url: &str,
        images: &FetchedImages,
    ) -> Result<bool, ExportError> {
        let Some(png) = images.get(url) else {
            return Ok(false);
        };
        let image = match Image::new_from_buffer(png) {
            Ok(image) => image,
            Err(e) => {
                warn!(%url, row, col, error = %e, "Skipping image cell");
                return Ok(false);
            }
        };
        worksheet.insert_image_fit_to_cell(row, col, &image, true)?;
        Ok(true)
    }
}

/// Fetch every image URL referenced by an image column, normalized to PNG.
/// `None` if cancelled.
async fn fetch_images(
    spec: &WorkbookSpec,
    store: &dyn ImageStore,
    cancel: &CancelToken,
) -> Option<FetchedImages> {
    let mut images = FetchedImages::new();
    for sheet in &spec.sheets {
        for column in sheet.columns.iter().filter(|c| c.kind == ColumnKind::Image) {
            for record in &sheet.rows {
                let Some(CellValue::Text(url)) = record.get(&column.key) else {
                    continue;
                };
                if url.is_empty() || images.contains_key(url) {
                    continue;
                }
                match cancel.run(store.fetch(url)).await? {
                    Ok(bytes) => match to_png(&bytes) {
                        Ok(png) => {
                            images.insert(url.clone(), png);
                        }
                        Err(e) => warn!(%url, error = %e, "Failed to decode image"),
                    },
                    Err(e) => warn!(%url, error = %e, "Failed to fetch image"),
                }
            }
        }
    }
    Some(images)
}

fn to_png(bytes: &[u8]) -> Result<Vec<u8>, image::ImageError> {
    let decoded = image::load_from_memory(bytes)?;
    let mut png = Vec::new();
    decoded.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)?;
    Ok(png)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryImageStore;
    use image::{Rgba, RgbaImage};
    use pretty_assertions::assert_eq;
    use std::io::Read;

    fn range(row_count: u32) -> AggregateRange {
        AggregateRange {
            column: 2,
            first_row: FIRST_DATA_ROW,
            row_count,
        }
    }

    fn products(n: usize) -> SheetSpec {
        SheetSpec {
            name: "Products".into(),
            columns: vec![
                ColumnDef::new("name", "Name", ColumnKind::Text),
                ColumnDef::new("photo", "Photo", ColumnKind::Image),
                ColumnDef::new("price", "Price", ColumnKind::Number)
                    .summable()
                    .with_format("$#,##0.00"),
            ],
            rows: (0..n)
                .map(|i| {
                    let mut record = Record::new();
                    record.insert("name".into(), format!("Item {i}").into());
                    record.insert("photo".into(), format!("memory://p{i}.png").into());
                    record.insert("price".into(), (i as f64 + 1.0).into());
                    record
                })
                .collect(),
        }
    }

    #[test]
    fn test_aggregate_formula() {
        assert_eq!(range(0).to_formula(), "=0");
        assert_eq!(range(1).to_formula(), "=SUM(C2:C2)");
        assert_eq!(range(5).to_formula(), "=SUM(C2:C6)");
        assert_eq!(range(100).to_formula(), "=SUM(C2:C101)");
    }

    #[test]
    fn test_plan_three_rows() {
        let plan = SheetPlan::for_sheet(&products(3)).unwrap();
        assert_eq!(plan.totals_row, Some(4));
        assert_eq!(plan.aggregates.len(), 1);
        assert_eq!(plan.aggregates[0].to_formula(), "=SUM(C2:C4)");
    }

    #[test]
    fn test_plan_without_summable_columns() {
        let mut sheet = products(2);
        sheet.columns[2].summable = false;
        let plan = SheetPlan::for_sheet(&sheet).unwrap();
        assert_eq!(plan.totals_row, None);
        assert!(plan.aggregates.is_empty());
    }

    #[test]
    fn test_plan_rejects_summed_images() {
        let mut sheet = products(1);
        sheet.columns[1].summable = true;
        assert!(matches!(SheetPlan::for_sheet(&sheet), Err(ExportError::Layout(_))));
    }

    #[test]
    fn test_column_name() {
        assert_eq!(column_name(0), "A");
        assert_eq!(column_name(25), "Z");
        assert_eq!(column_name(26), "AA");
        assert_eq!(column_name(51), "AZ");
        assert_eq!(column_name(52), "BA");
        assert_eq!(column_name(16_383), "XFD");
    }

    #[test]
    fn test_cell_value_from_json() {
        let record: Record =
            serde_json::from_str(r#"{"a": 1.5, "b": "x", "c": true, "d": null}"#).unwrap();
        assert_eq!(record["a"], CellValue::Number(1.5));
        assert_eq!(record["b"], CellValue::Text("x".into()));
        assert_eq!(record["c"], CellValue::Bool(true));
        assert_eq!(record["d"], CellValue::Empty);
    }

    fn png(color: [u8; 4]) -> Vec<u8> {
        let mut bytes = Vec::new();
        RgbaImage::from_pixel(4, 4, Rgba(color))
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[tokio::test]
    async fn test_export_skips_failed_images() {
        let store = MemoryImageStore::new();
        store.insert("memory://p0.png", png([255, 0, 0, 255])).await;
        store.insert("memory://p1.png", b"not an image".to_vec()).await;
        // p2 is missing entirely

        let spec = WorkbookSpec {
            subject: "catalog".into(),
            sheets: vec![products(3), SheetSpec { name: "Empty".into(), ..products(0) }],
        };
        let outcome = SheetExporter::new(SheetConfig::default())
            .export(&spec, &store, &CancelToken::new())
            .await
            .unwrap();
        let artifact = outcome.artifact().unwrap();
        assert_eq!(artifact.content_type, XLSX_CONTENT_TYPE);
        assert!(artifact.filename.starts_with("catalog_"));
        assert!(artifact.filename.ends_with(".xlsx"));
        assert_eq!(&artifact.bytes[..2], b"PK");
    }

    fn zip_entry(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut entry = archive.by_name(name).unwrap();
        let mut text = String::new();
        entry.read_to_string(&mut text).unwrap();
        text
    }

    #[tokio::test]
    async fn test_totals_row_is_written_to_the_workbook() {
        let spec = WorkbookSpec {
            subject: "catalog".into(),
            sheets: vec![products(3)],
        };
        let artifact = SheetExporter::new(SheetConfig::default())
            .export(&spec, &MemoryImageStore::new(), &CancelToken::new())
            .await
            .unwrap()
            .artifact()
            .unwrap();

        let sheet = zip_entry(&artifact.bytes, "xl/worksheets/sheet1.xml");
        let start = sheet.find(r#"<c r="C5""#).expect("totals cell C5");
        let end = start + sheet[start..].find("</c>").unwrap();
        let cell = &sheet[start..end];
        assert!(cell.contains("<f>SUM(C2:C4)</f>"), "{cell}");
        assert!(cell.contains(r#" s=""#), "totals cell has no format: {cell}");
        assert!(!sheet.contains(r#"<c r="C6""#));

        let styles = zip_entry(&artifact.bytes, "xl/styles.xml");
        assert!(styles.contains("<b/>"));
        let strings = zip_entry(&artifact.bytes, "xl/sharedStrings.xml");
        assert!(strings.contains(">Total<"));
    }

    #[tokio::test]
    async fn test_fetch_images_normalizes_to_png() {
        let store = MemoryImageStore::new();
        store.insert("memory://p0.png", png([0, 255, 0, 255])).await;
        let spec = WorkbookSpec {
            subject: "catalog".into(),
            sheets: vec![products(2)],
        };
        let images = fetch_images(&spec, &store, &CancelToken::new()).await.unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(
            image::guess_format(&images["memory://p0.png"]).unwrap(),
            image::ImageFormat::Png
        );
    }

    #[tokio::test]
    async fn test_export_cancelled() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let spec = WorkbookSpec {
            subject: "catalog".into(),
            sheets: vec![products(2)],
        };
        let outcome = SheetExporter::new(SheetConfig::default())
            .export(&spec, &MemoryImageStore::new(), &cancel)
            .await
            .unwrap();
        assert!(matches!(outcome, ExportOutcome::Cancelled));
    }
}
