//! Station identity of an input file.

use std::{
    collections::HashMap,
    fs::File,
    io::{self, BufRead},
    path::Path,
};

use crate::error::{ParseError, PipelineError};

#[derive(Debug, Clone, Default)]
/// How an input file is mapped to its external station code.
pub enum StationMapping {
    /// The code is the file name with its extension removed.
    #[default]
    FileStem,
    /// Explicit `file name -> station code` table supplied at ingestion time.
    Table(HashMap<String, String>),
}

impl StationMapping {
    /// Loads a mapping table, one `file_name<TAB>station_code` per line.
    pub fn from_file(path: &Path) -> Result<Self, PipelineError> {
        let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
        let reader = io::BufReader::new(file);

        let mut lines = Vec::new();
        for line in reader.lines() {
            lines.push(line.map_err(|e| PipelineError::io(path, e))?);
        }

        Ok(Self::from_lines(lines.iter().map(String::as_str))?)
    }

    pub fn from_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> Result<Self, ParseError> {
        let mut table = HashMap::new();

        for line in lines {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match line.split_once('\t') {
                Some((file_name, code)) if !file_name.trim().is_empty() && !code.trim().is_empty() => {
                    table.insert(file_name.trim().to_string(), code.trim().to_string());
                }
                _ => return Err(ParseError::Mapping(line.to_string())),
            }
        }

        Ok(StationMapping::Table(table))
    }

    /// Resolves the station code for a file, `None` when the table has no entry.
    pub fn station_code(&self, file_path: &Path) -> Option<String> {
        let file_name = file_path.file_name()?.to_str()?;

        match self {
            StationMapping::FileStem => {
                let stem = match file_name.rsplit_once('.') {
                    Some((stem, _)) if !stem.is_empty() => stem,
                    _ => file_name,
                };
                Some(stem.to_string())
            }
            StationMapping::Table(table) => table.get(file_name).cloned(),
        }
    }
}
