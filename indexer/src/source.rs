//! Streams documents out of `.json` and `.jsonl` files.

use selfindex::Document;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// The input file itself, or every `.json`/`.jsonl` file under a directory in path order.
pub fn input_files(input: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() && matches!(extension(p), Some("json" | "jsonl")) {
                files.push(p.to_path_buf());
            }
        }
    } else if input.is_file() {
        files.push(input.to_path_buf());
    }
    files
}

fn extension(p: &Path) -> Option<&str> { p.extension().and_then(|s| s.to_str()) }

/// Lazily reads every file in turn. Unreadable files and malformed records are logged and skipped.
pub fn documents(files: Vec<PathBuf>) -> impl Iterator<Item = Document> {
    files.into_iter().flat_map(|file| {
        let docs: Box<dyn Iterator<Item = Document>> = match read_file(&file) {
            Ok(docs) => docs,
            Err(e) => {
                tracing::warn!(file = %file.display(), error = %e, "skipping input file");
                Box::new(std::iter::empty())
            }
        };
        docs
    })
}

fn read_file(file: &Path) -> anyhow::Result<Box<dyn Iterator<Item = Document>>> {
    let reader = BufReader::new(File::open(file)?);
    if extension(file) == Some("jsonl") {
        let name = file.display().to_string();
        let lines = reader.lines().enumerate().filter_map(move |(n, line)| {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    tracing::warn!(file = %name, line = n + 1, error = %e, "read error");
                    return None;
                }
            };
            if line.trim().is_empty() {
                return None;
            }
            match serde_json::from_str::<Document>(&line) {
                Ok(doc) => Some(doc),
                Err(e) => {
                    tracing::warn!(file = %name, line = n + 1, error = %e, "malformed document");
                    None
                }
            }
        });
        return Ok(Box::new(lines));
    }
    let json: serde_json::Value = serde_json::from_reader(reader)?;
    let docs = match json {
        serde_json::Value::Array(arr) => arr.into_iter().map(serde_json::from_value).collect::<Result<Vec<Document>, _>>()?,
        obj @ serde_json::Value::Object(_) => vec![serde_json::from_value(obj)?],
        _ => Vec::new(),
    };
    Ok(Box::new(docs.into_iter()))
}
