//! Pretty JSON reports (tab indented): the index, the document lengths and
//! the ranked query results.

use crate::index::IndexRead;
use crate::search::{QueryResults, SearchResult};
use anyhow::{Context, Result};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::value::RawValue;
use std::collections::BTreeMap;
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Streams `term -> location -> [positions]` without building a second copy of the index.
struct IndexView<'a, I: ?Sized>(&'a I);

impl<I: IndexRead + ?Sized> Serialize for IndexView<'_, I> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let terms = self.0.terms();
        let mut map = serializer.serialize_map(Some(terms.len()))?;
        for term in &terms {
            map.serialize_entry(term, &self.0.postings(term))?;
        }
        map.end()
    }
}

/// `count` and `score` are emitted as bare number tokens so the score keeps its eight decimals.
#[derive(Serialize)]
struct ResultRecord {
    count: Box<RawValue>,
    score: Box<RawValue>,
    r#where: Box<RawValue>,
}

impl TryFrom<&SearchResult> for ResultRecord {
    type Error = serde_json::Error;

    fn try_from(result: &SearchResult) -> std::result::Result<Self, Self::Error> {
        let f = result.formatted();
        Ok(ResultRecord {
            count: RawValue::from_string(f.count)?,
            score: RawValue::from_string(f.score)?,
            r#where: RawValue::from_string(f.r#where)?,
        })
    }
}

fn to_pretty_writer<W: Write, T: Serialize + ?Sized>(writer: &mut W, value: &T) -> Result<()> {
    let mut ser = serde_json::Serializer::with_formatter(&mut *writer, PrettyFormatter::with_indent(b"\t"));
    value.serialize(&mut ser)?;
    writer.write_all(b"\n")?;
    Ok(())
}

fn save_pretty<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        create_dir_all(dir)?;
    }
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut out = BufWriter::new(file);
    to_pretty_writer(&mut out, value)?;
    out.flush()?;
    Ok(())
}

pub fn write_index<W: Write, I: IndexRead + ?Sized>(writer: &mut W, index: &I) -> Result<()> {
    to_pretty_writer(writer, &IndexView(index))
}

pub fn write_counts<W: Write, I: IndexRead + ?Sized>(writer: &mut W, index: &I) -> Result<()> {
    to_pretty_writer(writer, &index.document_lengths())
}

fn result_records(results: &QueryResults) -> Result<BTreeMap<&str, Vec<ResultRecord>>> {
    let mut out = BTreeMap::new();
    for (query, ranked) in results {
        let records = ranked
            .iter()
            .map(ResultRecord::try_from)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        out.insert(query.as_str(), records);
    }
    Ok(out)
}

pub fn write_results<W: Write>(writer: &mut W, results: &QueryResults) -> Result<()> {
    to_pretty_writer(writer, &result_records(results)?)
}

pub fn save_index<I: IndexRead + ?Sized>(path: &Path, index: &I) -> Result<()> {
    save_pretty(path, &IndexView(index))
}

pub fn save_counts<I: IndexRead + ?Sized>(path: &Path, index: &I) -> Result<()> {
    save_pretty(path, &index.document_lengths())
}

pub fn save_results(path: &Path, results: &QueryResults) -> Result<()> {
    save_pretty(path, &result_records(results)?)
}
