//! Tab-delimited flat-file backend (`idmapper-text:`).
//!
//! ```text
//! Entrez Gene<TAB>Ensembl<TAB>HGNC
//! 3643<TAB>ENSG00000171105<TAB>INSR
//! 3645<TAB>ENSG00000110324,ENSG00000281033<TAB>
//! ```
//!
//! The header names one namespace per column, by full name or system code.
//! Every further row is one equivalence group: all identifiers on a row map
//! to each other. A cell may hold several identifiers separated by `,` or `;`.

use crate::memory::MemoryMapper;
use async_trait::async_trait;
use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;
use xrefbridge_kernel::{
    DATA_SOURCE_NAME, DataSource, DataSourceRegistry, Driver, IdMapper, IdMapperError, Xref,
};

/// Scheme served by [`TextDriver`].
pub const TEXT_SCHEME: &str = "idmapper-text";

/// Errors from reading a flat mapping file.
#[derive(Debug, thiserror::Error)]
pub enum TextMapperError {
    #[error("line {0}: I/O error: {1}")]
    Io(usize, String),

    #[error("line {0}: parse error: {1}")]
    Parse(usize, String),

    #[error("corrupted mapping file: {0}")]
    Corrupt(String),
}

impl From<TextMapperError> for IdMapperError {
    fn from(err: TextMapperError) -> Self {
        IdMapperError::Backend(err.to_string())
    }
}

/// Build a mapper named `name` from tab-delimited text.
pub fn read_mapping(
    name: &str,
    reader: impl BufRead,
    registry: &DataSourceRegistry,
) -> Result<MemoryMapper, TextMapperError> {
    let mut lines = reader.lines().enumerate();
    let columns = loop {
        match lines.next() {
            None => return Err(TextMapperError::Parse(1, "missing header row".into())),
            Some((line_no, line)) => {
                let line = line.map_err(|e| TextMapperError::Io(line_no + 1, e.to_string()))?;
                if line.trim().is_empty() {
                    continue;
                }
                break header_columns(line_no + 1, &line, registry)?;
            }
        }
    };

    let mut mapper = MemoryMapper::new(name);
    for ds in &columns {
        mapper.declare_namespace(ds.clone());
    }
    mapper.set_property(DATA_SOURCE_NAME, name);

    let mut rows = 0usize;
    for (line_no, line) in lines {
        let line = line.map_err(|e| TextMapperError::Io(line_no + 1, e.to_string()))?;
        if line.trim().is_empty() {
            continue;
        }
        let cells: Vec<&str> = line.split('\t').collect();
        if cells.len() > columns.len() {
            return Err(TextMapperError::Parse(
                line_no + 1,
                format!("{} cells but only {} columns", cells.len(), columns.len()),
            ));
        }
        let group: Vec<Xref> = cells
            .iter()
            .zip(&columns)
            .flat_map(|(cell, ds)| {
                cell.split([',', ';'])
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(move |id| Xref::new(id, ds.clone()))
            })
            .collect();
        mapper.group(group);
        rows += 1;
    }
    tracing::debug!(mapper = name, rows, columns = columns.len(), "loaded flat mapping file");
    Ok(mapper)
}

/// Read and validate a mapping file from disk.
pub async fn read_mapping_from_path(
    path: impl AsRef<Path>,
    registry: &DataSourceRegistry,
) -> Result<MemoryMapper, TextMapperError> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| TextMapperError::Io(0, format!("{}: {e}", path.display())))?;
    validate_bytes(path, &bytes)?;
    read_mapping(&path.display().to_string(), bytes.as_slice(), registry)
}

fn header_columns(
    line_no: usize,
    line: &str,
    registry: &DataSourceRegistry,
) -> Result<Vec<DataSource>, TextMapperError> {
    line.split('\t')
        .map(str::trim)
        .map(|key| {
            if key.is_empty() {
                return Err(TextMapperError::Parse(line_no, "empty column name".into()));
            }
            registry
                .find(key)
                .or_else(|| registry.get_by_full_name(key))
                .ok_or_else(|| TextMapperError::Parse(line_no, format!("bad column name: {key}")))
        })
        .collect()
}

fn validate_bytes(path: &Path, bytes: &[u8]) -> Result<(), TextMapperError> {
    if bytes.contains(&0) {
        return Err(TextMapperError::Corrupt(format!(
            "{}: contains NUL byte(s)",
            path.display()
        )));
    }
    if std::str::from_utf8(bytes).is_err() {
        return Err(TextMapperError::Corrupt(format!(
            "{}: contains non-UTF-8 byte sequence(s)",
            path.display()
        )));
    }
    Ok(())
}

/// Opens flat mapping files. Accepts a plain path or a `file:` URL.
pub struct TextDriver {
    registry: &'static DataSourceRegistry,
}

impl Default for TextDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl TextDriver {
    /// Driver resolving column names in the process-wide registry.
    pub fn new() -> Self {
        Self::with_registry(DataSourceRegistry::global())
    }

    pub fn with_registry(registry: &'static DataSourceRegistry) -> Self {
        Self { registry }
    }
}

fn location_path(location: &str) -> &str {
    location
        .strip_prefix("file://")
        .or_else(|| location.strip_prefix("file:"))
        .unwrap_or(location)
}

#[async_trait]
impl Driver for TextDriver {
    async fn connect(&self, location: &str) -> xrefbridge_kernel::Result<Arc<dyn IdMapper>> {
        let path = location_path(location);
        let mapper = read_mapping_from_path(path, self.registry)
            .await
            .map_err(|e| match e {
                TextMapperError::Io(_, message) => IdMapperError::connection(location, message),
                other => other.into(),
            })?;
        Ok(Arc::new(mapper))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::io::Write;

    const SAMPLE: &str = "Entrez Gene\tEn\tHGNC\n\
                          3643\tENSG00000171105\tINSR\n\
                          \n\
                          3645\tENSG00000110324; ENSG00000281033\t\n";

    #[tokio::test]
    async fn rows_become_equivalence_groups() {
        let reg = DataSourceRegistry::new();
        let l = reg.register("L", "Entrez Gene").unwrap().as_data_source();
        let en = reg.register("En", "Ensembl").unwrap().as_data_source();

        let mapper = read_mapping("sample", SAMPLE.as_bytes(), &reg).unwrap();
        let hgnc = reg.find("HGNC").expect("header vivifies unknown names");
        assert_eq!(hgnc.system_code(), None);

        let insr = Xref::new("INSR", hgnc.clone());
        assert_eq!(
            mapper.map_id(&insr, &[l.clone()]).await.unwrap(),
            BTreeSet::from([Xref::new("3643", l.clone())])
        );
        assert_eq!(
            mapper.map_id(&Xref::new("3645", l.clone()), &[en.clone()]).await.unwrap(),
            BTreeSet::from([
                Xref::new("ENSG00000110324", en.clone()),
                Xref::new("ENSG00000281033", en.clone()),
            ])
        );
        assert!(
            mapper
                .map_id(&Xref::new("3643", l.clone()), &[])
                .await
                .unwrap()
                .iter()
                .all(|x| x.id() != "3645")
        );

        let caps = mapper.capabilities();
        assert_eq!(caps.supported_sources().len(), 3);
        assert!(caps.is_mapping_supported(&hgnc, &l));
        assert_eq!(caps.property(DATA_SOURCE_NAME), Some("sample"));
    }

    #[test]
    fn malformed_input_is_rejected() {
        let reg = DataSourceRegistry::new();
        assert!(matches!(
            read_mapping("empty", "\n\n".as_bytes(), &reg),
            Err(TextMapperError::Parse(1, _))
        ));
        assert!(matches!(
            read_mapping("gap", "L\t\tEn\n".as_bytes(), &reg),
            Err(TextMapperError::Parse(1, _))
        ));
        assert!(matches!(
            read_mapping("wide", "L\tEn\n1\t2\t3\n".as_bytes(), &reg),
            Err(TextMapperError::Parse(2, _))
        ));
    }

    #[tokio::test]
    async fn corrupt_files_are_rejected() {
        let reg = DataSourceRegistry::new();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"L\tEn\n1\0\t2\n").unwrap();
        let err = read_mapping_from_path(file.path(), &reg).await.unwrap_err();
        assert!(matches!(err, TextMapperError::Corrupt(msg) if msg.contains("NUL")));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0xff, 0xfe, b'\n']).unwrap();
        let err = read_mapping_from_path(file.path(), &reg).await.unwrap_err();
        assert!(matches!(err, TextMapperError::Corrupt(msg) if msg.contains("non-UTF-8")));
    }

    #[tokio::test]
    async fn driver_reports_missing_files_as_connection_errors() {
        let err = TextDriver::new()
            .connect("file:/nonexistent/xrefbridge/mapping.txt")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            IdMapperError::Connection { target, .. } if target == "file:/nonexistent/xrefbridge/mapping.txt"
        ));
    }

    #[test]
    fn file_urls_reduce_to_paths() {
        assert_eq!(location_path("file:///tmp/a.txt"), "/tmp/a.txt");
        assert_eq!(location_path("file:/tmp/a.txt"), "/tmp/a.txt");
        assert_eq!(location_path("/tmp/a.txt"), "/tmp/a.txt");
    }
}
