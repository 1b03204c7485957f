// src/read/tarball.rs

use anyhow::{bail, Context, Result};
use arrow::array::{ArrayRef, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use flate2::read::GzDecoder;
use std::{collections::HashMap, fs::File, io::Read, path::Path, sync::Arc};
use tar::Archive;
use tracing::{info, instrument, warn};

use crate::process::utils::clean_str;

/// One CSV member: header plus rows, all as text.
struct Member {
    name: String,
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// Concatenate every `.csv` member of a `.tar.gz` into one all-Utf8 batch.
///
/// Columns are the union of member headers in order of first appearance;
/// a member lacking a column gets nulls there. Empty members are skipped.
#[instrument(level = "info", skip(path), fields(tarball = %path.as_ref().display()))]
pub fn read_csv_tarball<P: AsRef<Path>>(path: P) -> Result<RecordBatch> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut archive = Archive::new(GzDecoder::new(file));

    let mut members = Vec::new();
    for entry in archive.entries().context("reading tar entries")? {
        let mut entry = entry.context("reading tar entry")?;
        let name = entry.path()?.to_string_lossy().into_owned();
        if !name.to_ascii_lowercase().ends_with(".csv") {
            continue;
        }
        let mut buf = Vec::new();
        entry
            .read_to_end(&mut buf)
            .with_context(|| format!("reading member {}", name))?;
        match parse_member(&name, &buf)? {
            Some(m) => {
                info!(member = %m.name, rows = m.rows.len(), "read member");
                members.push(m);
            }
            None => warn!(member = %name, "skipping empty file"),
        }
    }
    if members.is_empty() {
        bail!("no non-empty CSV members in {}", path.display());
    }
    concat_members(&members)
}

fn parse_member(name: &str, buf: &[u8]) -> Result<Option<Member>> {
    if buf.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(buf);
    let header: Vec<String> = rdr
        .headers()
        .with_context(|| format!("reading header of {}", name))?
        .iter()
        .map(|h| clean_str(h).to_string())
        .collect();
    let mut rows = Vec::new();
    for (idx, rec) in rdr.records().enumerate() {
        let rec = rec.with_context(|| format!("{}: CSV parse error at record {}", name, idx))?;
        rows.push(rec.iter().map(str::to_string).collect());
    }
    Ok(Some(Member {
        name: name.to_string(),
        header,
        rows,
    }))
}

fn concat_members(members: &[Member]) -> Result<RecordBatch> {
    let mut columns: Vec<String> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for m in members {
        for h in &m.header {
            if !index.contains_key(h) {
                index.insert(h.clone(), columns.len());
                columns.push(h.clone());
            }
        }
    }

    let mut values: Vec<Vec<Option<String>>> = vec![Vec::new(); columns.len()];
    for m in members {
        let positions: Vec<usize> = m.header.iter().map(|h| index[h]).collect();
        for row in &m.rows {
            let mut cells: Vec<Option<String>> = vec![None; columns.len()];
            for (pos, cell) in positions.iter().zip(row) {
                cells[*pos] = Some(cell.clone());
            }
            for (col, cell) in values.iter_mut().zip(cells) {
                col.push(cell);
            }
        }
    }

    let schema = Arc::new(Schema::new(
        columns
            .iter()
            .map(|c| Field::new(c, DataType::Utf8, true))
            .collect::<Vec<_>>(),
    ));
    let arrays: Vec<ArrayRef> = values
        .into_iter()
        .map(|col| Arc::new(StringArray::from(col)) as ArrayRef)
        .collect();
    RecordBatch::try_new(schema, arrays).context("building tarball batch")
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Array;
    use flate2::{write::GzEncoder, Compression};
    use tempfile::tempdir;

    fn append(builder: &mut tar::Builder<GzEncoder<File>>, name: &str, body: &str) {
        let mut header = tar::Header::new_gnu();
        header.set_size(body.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, body.as_bytes()).unwrap();
    }

    #[test]
    fn concatenates_members_and_skips_empty() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("daily.tar.gz");
        {
            let enc = GzEncoder::new(File::create(&path)?, Compression::default());
            let mut builder = tar::Builder::new(enc);
            append(&mut builder, "a.csv", "STATION,DATE,SNOW\nS1,2020-01-01,1.0\n");
            append(&mut builder, "empty.csv", "");
            append(&mut builder, "readme.txt", "ignored");
            append(&mut builder, "b.csv", "STATION,DATE,TMAX\nS2,2020-01-02,40\n");
            builder.into_inner()?.finish()?;
        }

        let batch = read_csv_tarball(&path)?;
        assert_eq!(batch.num_rows(), 2);
        let names: Vec<&str> = batch.schema_ref().fields().iter().map(|f| f.name().as_str()).collect();
        assert_eq!(names, vec!["STATION", "DATE", "SNOW", "TMAX"]);

        let tmax = batch
            .column(3)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert!(tmax.is_null(0));
        assert_eq!(tmax.value(1), "40");
        Ok(())
    }
}
