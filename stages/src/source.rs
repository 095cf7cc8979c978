//! Stages that produce items without upstream input.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::iter;
use std::path::PathBuf;

use lazypipe::{Flow, Node, SourceNode};

use crate::error::StageError;
use crate::text::Line;

lazypipe::source! {
    /// Yield `item` once.
    pub fn echo<T: Clone>(item: T) -> T {
        iter::once(item)
    }
}

/// Stream the lines of the file at `path`.
///
/// The file is opened on the first pull. Failing to open or read it yields
/// an `Err` item and ends the flow.
pub fn cat(path: impl Into<PathBuf>) -> SourceNode<Line> {
    let path = path.into();
    Node::source("cat", move || -> Flow<Line> {
        let origin = path.display().to_string();
        tracing::debug!(path = %origin, "opening file");
        match File::open(&path) {
            Ok(file) => Box::new(read_lines(BufReader::new(file), origin)),
            Err(err) => Box::new(iter::once(Err(StageError::io(origin, err)))),
        }
    })
}

/// Fetch `url` with a blocking GET and stream the body line by line.
///
/// Non-success statuses are reported as an `Err` item.
pub fn curl(url: impl Into<String>) -> SourceNode<Line> {
    let url = url.into();
    Node::source("curl", move || -> Flow<Line> {
        tracing::debug!(%url, "fetching");
        let response =
            reqwest::blocking::get(url.as_str()).and_then(|response| response.error_for_status());
        match response {
            Ok(response) => {
                tracing::debug!(%url, status = %response.status(), "response received");
                Box::new(read_lines(BufReader::new(response), url.clone()))
            }
            Err(err) => Box::new(iter::once(Err(StageError::http(url.as_str(), err)))),
        }
    })
}

/// Lines of `reader`, stopping after the first read error.
fn read_lines<R: BufRead + 'static>(reader: R, origin: String) -> impl Iterator<Item = Line> {
    let mut failed = false;
    reader.lines().map_while(move |line| {
        if failed {
            return None;
        }
        Some(line.map_err(|err| {
            failed = true;
            StageError::io(origin.as_str(), err)
        }))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_echo_yields_item_once() {
        let node = echo("hello");
        assert_eq!(node.name(), "echo");
        assert_eq!(node.iter().collect::<Vec<_>>(), vec!["hello"]);
        assert_eq!(node.iter().collect::<Vec<_>>(), vec!["hello"]);
    }

    #[test]
    fn test_cat_streams_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "first").unwrap();
        writeln!(file, "second").unwrap();

        let node = cat(file.path());
        assert_eq!(node.name(), "cat");
        let lines: Vec<String> = node.iter().collect::<Result<_, _>>().unwrap();
        assert_eq!(lines, vec!["first", "second"]);
    }

    #[test]
    fn test_cat_missing_file_yields_error() {
        let dir = tempfile::tempdir().unwrap();
        let node = cat(dir.path().join("absent.txt"));
        let items: Vec<Line> = node.iter().collect();
        assert_eq!(items.len(), 1);
        assert!(matches!(&items[0], Err(StageError::Io { .. })));
    }

    #[test]
    fn test_cat_opens_file_lazily() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("late.txt");
        let node = cat(&path);

        std::fs::write(&path, "written after construction\n").unwrap();
        let lines: Vec<String> = node.iter().collect::<Result<_, _>>().unwrap();
        assert_eq!(lines, vec!["written after construction"]);
    }
}
