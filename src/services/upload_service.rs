use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use calamine::{open_workbook_auto, Data, Reader};
use serde::Serialize;
use serde_json::{Map, Number, Value};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::config::UploadConfig;

pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const TEXT_PREVIEW_CHARS: usize = 1000;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Invalid file format: {0}. Only XLSX/XLS files are accepted")]
    UnsupportedFormat(String),

    #[error("The uploaded file is empty")]
    EmptyFile,

    #[error("Invalid file name")]
    InvalidName,

    #[error("File not found")]
    NotFound,

    #[error("Could not read the spreadsheet: {0}")]
    Spreadsheet(String),

    #[error("File storage error: {0}")]
    Io(#[from] std::io::Error),
}

/// First sheet of a workbook: header names plus one JSON object per data row
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SheetData {
    pub columns: Vec<String>,
    pub rows: Vec<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadSummary {
    pub message: String,
    pub file_name: String,
    pub saved_path: String,
    pub size_kb: f64,
    pub columns: Vec<String>,
    pub sample: Vec<Value>,
    pub total_rows: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoredFile {
    pub name: String,
    pub size_kb: f64,
    /// Unix seconds
    pub modified: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FileView {
    Spreadsheet {
        file_name: String,
        size_kb: f64,
        total_rows: usize,
        columns: Vec<String>,
        rows: Vec<Value>,
        message: String,
    },
    Text {
        file_name: String,
        size_kb: f64,
        preview: String,
        message: String,
    },
}

/// Spreadsheet uploads kept in a flat directory
#[derive(Debug, Clone)]
pub struct UploadService {
    dir: PathBuf,
    preview_rows: usize,
    sample_rows: usize,
}

impl UploadService {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            dir: config.directory.clone(),
            preview_rows: config.preview_rows,
            sample_rows: config.sample_rows,
        }
    }

    pub fn is_spreadsheet(name: &str) -> bool {
        let lower = name.to_ascii_lowercase();
        lower.ends_with(".xlsx") || lower.ends_with(".xls")
    }

    /// Keep only the final path component and replace anything outside
    /// `[A-Za-z0-9_-. ]` with `_`.
    pub fn sanitize_filename(name: &str) -> String {
        let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
        let mut safe: String = base
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ' ') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        while safe.contains("..") {
            safe = safe.replace("..", "_.");
        }
        safe
    }

    fn checked_path(&self, name: &str) -> Result<PathBuf, UploadError> {
        if name.is_empty() || name.contains("..") || name.contains('/') || name.contains('\\') {
            return Err(UploadError::InvalidName);
        }
        Ok(self.dir.join(name))
    }

    pub async fn upload(&self, original_name: &str, bytes: &[u8]) -> Result<UploadSummary, UploadError> {
        if !Self::is_spreadsheet(original_name) {
            return Err(UploadError::UnsupportedFormat(original_name.to_string()));
        }
        if bytes.is_empty() {
            return Err(UploadError::EmptyFile);
        }

        let (file_name, path) = self.save(&Self::sanitize_filename(original_name), bytes).await?;
        info!("Saved upload {} ({} bytes)", path.display(), bytes.len());

        let sheet = read_sheet(path.clone()).await?;
        let total_rows = sheet.rows.len();
        let message = if sheet.rows.is_empty() {
            "File processed, but it is empty".to_string()
        } else {
            "File processed successfully".to_string()
        };

        Ok(UploadSummary {
            message,
            file_name,
            saved_path: path.display().to_string(),
            size_kb: size_kb(bytes.len() as u64),
            sample: sheet.rows.into_iter().take(self.sample_rows).collect(),
            columns: sheet.columns,
            total_rows,
        })
    }

    /// Write `bytes` under `safe_name`, appending `_1`, `_2`, ... to the stem on collision.
    async fn save(&self, safe_name: &str, bytes: &[u8]) -> Result<(String, PathBuf), UploadError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let as_path = Path::new(safe_name);
        let stem = as_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = as_path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        let mut counter = 0;
        loop {
            let candidate = if counter == 0 {
                safe_name.to_string()
            } else {
                format!("{}_{}{}", stem, counter, extension)
            };
            let path = self.dir.join(&candidate);

            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(mut file) => {
                    file.write_all(bytes).await?;
                    file.flush().await?;
                    return Ok((candidate, path));
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => counter += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Stored files, newest first
    pub async fn list(&self) -> Result<Vec<StoredFile>, UploadError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let modified = metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs() as i64)
                .unwrap_or_default();
            files.push(StoredFile {
                name: entry.file_name().to_string_lossy().into_owned(),
                size_kb: size_kb(metadata.len()),
                modified,
            });
        }

        files.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.name.cmp(&b.name)));
        Ok(files)
    }

    pub async fn view(&self, name: &str) -> Result<FileView, UploadError> {
        let path = self.checked_path(name)?;
        let metadata = file_metadata(&path).await?;
        let size_kb = size_kb(metadata.len());

        if Self::is_spreadsheet(name) {
            let sheet = read_sheet(path).await?;
            let total_rows = sheet.rows.len();
            let message = if total_rows > self.preview_rows {
                format!("Showing first {} of {} rows", self.preview_rows, total_rows)
            } else {
                "Showing all rows".to_string()
            };
            return Ok(FileView::Spreadsheet {
                file_name: name.to_string(),
                size_kb,
                total_rows,
                rows: sheet.rows.into_iter().take(self.preview_rows).collect(),
                columns: sheet.columns,
                message,
            });
        }

        let bytes = tokio::fs::read(&path).await?;
        let preview: String = String::from_utf8_lossy(&bytes)
            .chars()
            .take(TEXT_PREVIEW_CHARS)
            .collect();
        Ok(FileView::Text {
            file_name: name.to_string(),
            size_kb,
            preview,
            message: format!("Showing the first {} characters", TEXT_PREVIEW_CHARS),
        })
    }

    pub async fn download(&self, name: &str) -> Result<Vec<u8>, UploadError> {
        let path = self.checked_path(name)?;
        file_metadata(&path).await?;
        Ok(tokio::fs::read(&path).await?)
    }
}

async fn file_metadata(path: &Path) -> Result<std::fs::Metadata, UploadError> {
    match tokio::fs::metadata(path).await {
        Ok(m) if m.is_file() => Ok(m),
        Ok(_) => Err(UploadError::NotFound),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(UploadError::NotFound),
        Err(e) => Err(e.into()),
    }
}

fn size_kb(bytes: u64) -> f64 {
    (bytes as f64 / 1024.0 * 100.0).round() / 100.0
}

/// Parse the first worksheet on the blocking pool.
pub async fn read_sheet(path: PathBuf) -> Result<SheetData, UploadError> {
    tokio::task::spawn_blocking(move || {
        let mut workbook =
            open_workbook_auto(&path).map_err(|e| UploadError::Spreadsheet(e.to_string()))?;
        let range = match workbook.worksheet_range_at(0) {
            Some(range) => range.map_err(|e| UploadError::Spreadsheet(e.to_string()))?,
            None => return Ok(SheetData::default()),
        };
        debug!("Read sheet {:?} from {}", range.get_size(), path.display());
        Ok(build_sheet(range.rows()))
    })
    .await
    .map_err(|e| UploadError::Spreadsheet(e.to_string()))?
}

/// First row names the columns, every following non-blank row becomes a record.
pub fn build_sheet<'a>(mut rows: impl Iterator<Item = &'a [Data]>) -> SheetData {
    let Some(header) = rows.next() else {
        return SheetData::default();
    };

    let mut columns: Vec<String> = Vec::with_capacity(header.len());
    for (index, cell) in header.iter().enumerate() {
        let mut name = match cell {
            Data::Empty => String::new(),
            other => other.to_string().trim().to_string(),
        };
        if name.is_empty() {
            name = format!("column_{}", index + 1);
        }
        let base = name.clone();
        let mut dup = 1;
        while columns.contains(&name) {
            name = format!("{}.{}", base, dup);
            dup += 1;
        }
        columns.push(name);
    }

    let records = rows
        .filter(|row| row.iter().any(|cell| !matches!(cell, Data::Empty)))
        .map(|row| {
            let mut record = Map::new();
            for (index, column) in columns.iter().enumerate() {
                let value = row.get(index).map(cell_value).unwrap_or(Value::Null);
                record.insert(column.clone(), value);
            }
            Value::Object(record)
        })
        .collect();

    SheetData {
        columns,
        rows: records,
    }
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty | Data::Error(_) => Value::Null,
        Data::String(s) => Value::String(s.clone()),
        Data::Bool(b) => Value::Bool(*b),
        Data::Int(i) => Value::from(*i),
        // NaN and infinities have no JSON form
        Data::Float(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| Value::String(d.format("%Y-%m-%dT%H:%M:%S").to_string()))
            .unwrap_or(Value::Null),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::String(s.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn service(dir: &TempDir) -> UploadService {
        UploadService::new(&UploadConfig {
            directory: dir.path().to_path_buf(),
            preview_rows: 50,
            sample_rows: 5,
        })
    }

    #[test]
    fn filenames_are_sanitized() {
        assert_eq!(UploadService::sanitize_filename("relatório (1).xlsx"), "relat_rio _1_.xlsx");
        assert_eq!(UploadService::sanitize_filename("../../etc/passwd.xlsx"), "passwd.xlsx");
        assert_eq!(UploadService::sanitize_filename("C:\\tmp\\a..b.xls"), "a_.b.xls");
    }

    #[test]
    fn header_row_becomes_columns() {
        let rows = vec![
            vec![Data::String("Nome".into()), Data::Empty, Data::String("Nome".into())],
            vec![Data::String("Ana".into()), Data::Float(f64::NAN), Data::Int(3)],
            vec![Data::Empty, Data::Empty, Data::Empty],
            vec![Data::Bool(true)],
        ];
        let sheet = build_sheet(rows.iter().map(Vec::as_slice));

        assert_eq!(sheet.columns, vec!["Nome", "column_2", "Nome.1"]);
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[0], json!({ "Nome": "Ana", "column_2": null, "Nome.1": 3 }));
        assert_eq!(sheet.rows[1], json!({ "Nome": true, "column_2": null, "Nome.1": null }));
    }

    #[tokio::test]
    async fn rejects_non_spreadsheets_and_empty_files() {
        let dir = TempDir::new().unwrap();
        let uploads = service(&dir);

        assert!(matches!(
            uploads.upload("notes.txt", b"hello").await,
            Err(UploadError::UnsupportedFormat(_))
        ));
        assert!(matches!(uploads.upload("data.xlsx", b"").await, Err(UploadError::EmptyFile)));
    }

    #[tokio::test]
    async fn reads_first_sheet_of_a_real_workbook() {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/cidadaos.xlsx");
        let sheet = read_sheet(path).await.unwrap();

        assert_eq!(sheet.columns, vec!["nome", "bairro", "idade"]);
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[0]["nome"], json!("Maria Souza"));
        assert_eq!(sheet.rows[0]["bairro"], json!("Centro"));
        assert_eq!(sheet.rows[0]["idade"].as_f64(), Some(34.0));
        assert_eq!(sheet.rows[1], json!({ "nome": "Joao Lima", "bairro": "Vila Nova", "idade": null }));
    }

    #[tokio::test]
    async fn unreadable_workbook_is_reported_but_kept() {
        let dir = TempDir::new().unwrap();
        let uploads = service(&dir);

        let err = uploads.upload("broken.xlsx", b"not a zip").await.unwrap_err();
        assert!(matches!(err, UploadError::Spreadsheet(_)));
        assert!(dir.path().join("broken.xlsx").exists());
    }

    #[tokio::test]
    async fn collisions_get_numbered_suffixes() {
        let dir = TempDir::new().unwrap();
        let uploads = service(&dir);

        let (first, _) = uploads.save("data.xlsx", b"1").await.unwrap();
        let (second, _) = uploads.save("data.xlsx", b"2").await.unwrap();
        let (third, _) = uploads.save("data.xlsx", b"3").await.unwrap();
        assert_eq!((first.as_str(), second.as_str(), third.as_str()), ("data.xlsx", "data_1.xlsx", "data_2.xlsx"));
        assert_eq!(uploads.list().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn view_guards_names_and_previews_text() {
        let dir = TempDir::new().unwrap();
        let uploads = service(&dir);
        std::fs::write(dir.path().join("notes.txt"), "x".repeat(1500)).unwrap();

        assert!(matches!(uploads.view("../secret").await, Err(UploadError::InvalidName)));
        assert!(matches!(uploads.view("a\\b").await, Err(UploadError::InvalidName)));
        assert!(matches!(uploads.view("missing.xlsx").await, Err(UploadError::NotFound)));

        match uploads.view("notes.txt").await.unwrap() {
            FileView::Text { preview, .. } => assert_eq!(preview.len(), 1000),
            other => panic!("expected text view, got {:?}", other),
        }
        assert_eq!(uploads.download("notes.txt").await.unwrap().len(), 1500);
    }

    #[tokio::test]
    async fn missing_directory_lists_nothing() {
        let dir = TempDir::new().unwrap();
        let uploads = UploadService::new(&UploadConfig {
            directory: dir.path().join("not-created"),
            preview_rows: 50,
            sample_rows: 5,
        });
        assert!(uploads.list().await.unwrap().is_empty());
    }
}
