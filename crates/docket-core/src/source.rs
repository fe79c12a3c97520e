use std::fs;
use std::path::Path;

use anyhow::Context;
use tracing::{debug, info};

use crate::task::TaskRecord;

/// Reads a task batch. A file whose first non-blank byte is `[` is one JSON
/// array; anything else is read as JSON lines, blank lines skipped.
#[tracing::instrument(skip(path), fields(file = %path.display()))]
pub fn load_records(path: &Path) -> anyhow::Result<Vec<TaskRecord>> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;

    let records = if text.trim_start().starts_with('[') {
        debug!("loading json array");
        serde_json::from_str::<Vec<TaskRecord>>(&text)
            .with_context(|| format!("failed parsing {}", path.display()))?
    } else {
        load_jsonl(path, &text)?
    };

    info!(count = records.len(), "loaded task records");
    Ok(records)
}

fn load_jsonl(path: &Path, text: &str) -> anyhow::Result<Vec<TaskRecord>> {
    debug!("loading jsonl");

    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let record: TaskRecord = serde_json::from_str(trimmed)
            .with_context(|| format!("failed parsing {} line {}", path.display(), idx + 1))?;
        out.push(record);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::load_records;
    use crate::task::TaskStatus;

    #[test]
    fn reads_a_json_array() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("tasks.json");
        fs::write(
            &path,
            r##"[
  {"description": "a", "project": "p.md", "status": "Wip",
   "contexts": ["#xdesk"], "dates": {"due": "20240311"}},
  {"description": "b", "project": "p.md", "status": "NoStatus"}
]"##,
        )
        .expect("write");

        let records = load_records(&path).expect("load");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].status, TaskStatus::Wip);
        assert_eq!(
            records[0].dates.as_ref().and_then(|d| d.due.as_deref()),
            Some("20240311")
        );
        assert!(records[1].contexts.is_empty());
        assert!(records[1].dates.is_none());
    }

    #[test]
    fn reads_json_lines_and_skips_blanks() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("tasks.jsonl");
        fs::write(
            &path,
            "{\"description\":\"a\",\"project\":\"p\",\"status\":\"Todo\"}\n\n\
             {\"description\":\"b\",\"project\":\"p\",\"status\":\"Review\"}\n",
        )
        .expect("write");

        let records = load_records(&path).expect("load");
        let names: Vec<&str> = records.iter().map(|r| r.description.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn bad_line_is_reported_with_its_number() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("tasks.jsonl");
        fs::write(
            &path,
            "{\"description\":\"a\",\"project\":\"p\",\"status\":\"Todo\"}\n{oops}\n",
        )
        .expect("write");

        let err = load_records(&path).expect_err("bad line");
        assert!(format!("{err:#}").contains("line 2"));
    }

    #[test]
    fn missing_file_names_the_path() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("absent.json");
        let err = load_records(&path).expect_err("missing");
        assert!(err.to_string().contains("absent.json"));
    }
}
