use csv::{ReaderBuilder, StringRecord};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::LoadError;
use crate::graph::{Graph, GraphBuilder};

/// What to do with a line that has fewer fields than the edge columns need.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum MalformedPolicy {
    #[default]
    Abort,
    Skip,
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub delimiter: u8,
    pub malformed: MalformedPolicy,
    /// Treat the first line as a header and ignore it.
    pub skip_first: bool,
    /// Field positions of the source and target tokens.
    pub columns: (usize, usize),
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            delimiter: b'\t',
            malformed: MalformedPolicy::Abort,
            skip_first: false,
            columns: (0, 1),
        }
    }
}

impl LoadOptions {
    fn required_fields(&self) -> usize {
        self.columns.0.max(self.columns.1) + 1
    }
}

pub fn load_graph(path: impl AsRef<Path>, options: &LoadOptions) -> Result<Graph, LoadError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| LoadError::Input {
        path: path.to_path_buf(),
        source,
    })?;
    let graph = read_edges(file, options, path)?;
    debug!(
        path = %path.display(),
        vertices = graph.num_vertices(),
        edges = graph.num_edges(),
        "loaded edge list"
    );
    Ok(graph)
}

pub fn load_graph_from_reader<R: Read>(reader: R, options: &LoadOptions) -> Result<Graph, LoadError> {
    read_edges(reader, options, &PathBuf::from("<reader>"))
}

fn read_edges<R: Read>(source: R, options: &LoadOptions, path: &Path) -> Result<Graph, LoadError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(options.skip_first)
        .flexible(true)
        .from_reader(source);

    let required = options.required_fields();
    let (src_col, dst_col) = options.columns;
    let mut builder = GraphBuilder::new();
    let mut skipped = 0usize;

    let mut record = StringRecord::new();
    loop {
        match reader.read_record(&mut record) {
            Ok(true) => {}
            Ok(false) => break,
            Err(err) => return Err(classify_csv_error(err, path)),
        }
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        if is_blank(&record) {
            continue;
        }
        if record.len() < required {
            match options.malformed {
                MalformedPolicy::Abort => {
                    return Err(LoadError::MalformedLine {
                        line,
                        expected: required,
                        found: record.len(),
                    });
                }
                MalformedPolicy::Skip => {
                    warn!(line, found = record.len(), "skipping malformed line");
                    skipped += 1;
                    continue;
                }
            }
        }
        builder.add_edge(&record[src_col], &record[dst_col]);
    }

    if skipped > 0 {
        warn!(skipped, "malformed lines were ignored");
    }
    Ok(builder.build())
}

fn is_blank(record: &StringRecord) -> bool {
    record.len() == 1 && record[0].is_empty()
}

fn classify_csv_error(err: csv::Error, path: &Path) -> LoadError {
    let line = err.position().map(|p| p.line()).unwrap_or(0);
    match err.into_kind() {
        csv::ErrorKind::Io(source) => LoadError::Input {
            path: path.to_path_buf(),
            source,
        },
        csv::ErrorKind::Utf8 { err, .. } => LoadError::Parse {
            line,
            message: err.to_string(),
        },
        other => LoadError::Parse {
            line,
            message: format!("{other:?}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(text: &str, options: &LoadOptions) -> Result<Graph, LoadError> {
        load_graph_from_reader(text.as_bytes(), options)
    }

    #[test]
    fn counts_distinct_tokens_and_lines() {
        let g = load("a\tb\nb\tc\na\tc\n", &LoadOptions::default()).unwrap();
        assert_eq!(g.num_vertices(), 3);
        assert_eq!(g.num_edges(), 3);
    }

    #[test]
    fn extra_fields_are_ignored() {
        let g = load("a\tb\t0.5\tx\nb\ta\t1\n", &LoadOptions::default()).unwrap();
        assert_eq!(g.num_vertices(), 2);
        assert_eq!(g.num_edges(), 2);
    }

    #[test]
    fn blank_lines_are_not_edges() {
        let g = load("a\tb\n\n\nb\tc\n", &LoadOptions::default()).unwrap();
        assert_eq!(g.num_edges(), 2);
    }

    #[test]
    fn short_line_aborts_by_default() {
        let err = load("a\tb\nlonely\nb\tc\n", &LoadOptions::default()).unwrap_err();
        match err {
            LoadError::MalformedLine { line, expected, found } => {
                assert_eq!(line, 2);
                assert_eq!(expected, 2);
                assert_eq!(found, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn short_line_is_skipped_when_asked() {
        let options = LoadOptions {
            malformed: MalformedPolicy::Skip,
            ..LoadOptions::default()
        };
        let g = load("a\tb\nlonely\nb\tc\n", &options).unwrap();
        assert_eq!(g.num_edges(), 2);
        assert_eq!(g.num_vertices(), 3);
    }

    #[test]
    fn header_and_custom_columns() {
        let options = LoadOptions {
            delimiter: b',',
            skip_first: true,
            columns: (2, 0),
            ..LoadOptions::default()
        };
        let g = load("to,w,from\nx,1,y\nz,1,y\n", &options).unwrap();
        assert_eq!(g.num_edges(), 2);
        assert_eq!(g.token(0), "y");
        assert_eq!(g.edges().collect::<Vec<_>>(), vec![(0, 1), (0, 2)]);
    }

    #[test]
    fn missing_file_is_an_input_error() {
        let err = load_graph("/definitely/not/here.tsv", &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, LoadError::Input { .. }));
        // the io cause travels as the source, not in the message
        let cause = std::error::Error::source(&err).unwrap().to_string();
        assert!(!err.to_string().contains(&cause));
    }

    #[test]
    fn invalid_utf8_is_a_parse_error() {
        let err = load_graph_from_reader(&b"a\t\xff\n"[..], &LoadOptions::default()).unwrap_err();
        match err {
            LoadError::Parse { line, ref message } => {
                assert_eq!(line, 1);
                assert_eq!(message.to_ascii_lowercase().matches("invalid utf-8:").count(), 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
