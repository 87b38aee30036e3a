//! Flat-file ingestion: typed records and readers for the five network files.
//!
//! # File format
//!
//! Every file is plain text, one record per line, fields separated by one or
//! more spaces, with a header line that is discarded.  Per-file layouts:
//!
//! | File            | Fields                                                              |
//! |-----------------|---------------------------------------------------------------------|
//! | `nodes.txt`     | `id type x y z` (type 1000 = zone centroid)                         |
//! | `links.txt`     | `id type tail head length ffspd wave capacity lanes` (1000 = connector) |
//! | `static_od.txt` | `… origin destination demand` (trailing three fields significant)   |
//! | `phases.txt`    | `node type seq red yellow green num_moves {in,…} {out,…}`           |
//! | `paths.txt`     | `id num_links proportion link_1 … link_n`                           |
//!
//! The two brace-set fields of a phase record list inbound and outbound link
//! ids, paired positionally into movements; they must not contain spaces.
//!
//! Each record type has a reader generic over `Read` (handy for tests fed
//! from a `Cursor`) plus the directory-level [`read_records_from_dir`] /
//! [`load_graph`] entry points.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use crate::error::{GraphError, GraphResult};
use crate::graph::Graph;

// ── Records ───────────────────────────────────────────────────────────────────

/// One line of `nodes.txt`.
#[derive(Clone, Debug)]
pub struct NodeRecord {
    pub id:   u32,
    pub kind: u32,
    pub x:    f64,
    pub y:    f64,
    pub z:    f64,
}

/// One line of `links.txt`.
#[derive(Clone, Debug)]
pub struct LinkRecord {
    pub id:        u32,
    pub kind:      u32,
    pub tail:      u32,
    pub head:      u32,
    pub length_ft: f64,
    pub ffspd_mph: f64,
    pub wave_mph:  f64,
    pub capacity:  f64,
    pub lanes:     u32,
}

/// One line of `static_od.txt` (trailing three fields).
#[derive(Clone, Debug)]
pub struct OdRecord {
    pub origin:      u32,
    pub destination: u32,
    pub demand:      f64,
}

/// One line of `phases.txt`.
#[derive(Clone, Debug)]
pub struct PhaseRecord {
    pub node:      u32,
    pub kind:      u32,
    pub seq:       u32,
    pub red:       u32,
    pub yellow:    u32,
    pub green:     u32,
    pub num_moves: usize,
    pub in_links:  Vec<u32>,
    pub out_links: Vec<u32>,
}

/// One line of `paths.txt`.
#[derive(Clone, Debug)]
pub struct PathRecord {
    pub id:         u32,
    pub num_links:  usize,
    pub proportion: f64,
    pub links:      Vec<u32>,
}

/// The full ingestion payload consumed by [`Graph::from_records`].
#[derive(Clone, Debug, Default)]
pub struct NetworkRecords {
    pub nodes:  Vec<NodeRecord>,
    pub links:  Vec<LinkRecord>,
    pub od:     Vec<OdRecord>,
    pub phases: Vec<PhaseRecord>,
    pub paths:  Vec<PathRecord>,
}

// ── Entry points ──────────────────────────────────────────────────────────────

/// Read the five standard network files from `dir`.
pub fn read_records_from_dir(dir: &Path) -> GraphResult<NetworkRecords> {
    Ok(NetworkRecords {
        nodes:  read_node_records(File::open(dir.join("nodes.txt"))?)?,
        links:  read_link_records(File::open(dir.join("links.txt"))?)?,
        od:     read_od_records(File::open(dir.join("static_od.txt"))?)?,
        phases: read_phase_records(File::open(dir.join("phases.txt"))?)?,
        paths:  read_path_records(File::open(dir.join("paths.txt"))?)?,
    })
}

/// Read the five network files from `dir` and build the graph.
pub fn load_graph(dir: &Path, name: &str) -> GraphResult<Graph> {
    Graph::from_records(read_records_from_dir(dir)?, name)
}

// ── Per-file readers ──────────────────────────────────────────────────────────

/// Read `nodes.txt` records from any `Read` source.
pub fn read_node_records<R: Read>(src: R) -> GraphResult<Vec<NodeRecord>> {
    records(src, "node", |t| {
        expect_len(t, 5, "node")?;
        Ok(NodeRecord {
            id:   parse(t[0], "node id")?,
            kind: parse(t[1], "node type")?,
            x:    parse(t[2], "node x")?,
            y:    parse(t[3], "node y")?,
            z:    parse(t[4], "node z")?,
        })
    })
}

/// Read `links.txt` records from any `Read` source.
pub fn read_link_records<R: Read>(src: R) -> GraphResult<Vec<LinkRecord>> {
    records(src, "link", |t| {
        expect_len(t, 9, "link")?;
        Ok(LinkRecord {
            id:        parse(t[0], "link id")?,
            kind:      parse(t[1], "link type")?,
            tail:      parse(t[2], "link tail")?,
            head:      parse(t[3], "link head")?,
            length_ft: parse(t[4], "link length")?,
            ffspd_mph: parse(t[5], "link free-flow speed")?,
            wave_mph:  parse(t[6], "link wave speed")?,
            capacity:  parse(t[7], "link capacity")?,
            lanes:     parse(t[8], "link lanes")?,
        })
    })
}

/// Read `static_od.txt` records from any `Read` source.  Only the trailing
/// three fields of each line are significant.
pub fn read_od_records<R: Read>(src: R) -> GraphResult<Vec<OdRecord>> {
    records(src, "O-D", |t| {
        if t.len() < 3 {
            return Err(GraphError::Parse(format!(
                "O-D record has {} fields, expected at least 3",
                t.len()
            )));
        }
        let n = t.len();
        Ok(OdRecord {
            origin:      parse(t[n - 3], "O-D origin")?,
            destination: parse(t[n - 2], "O-D destination")?,
            demand:      parse(t[n - 1], "O-D demand")?,
        })
    })
}

/// Read `phases.txt` records from any `Read` source.
pub fn read_phase_records<R: Read>(src: R) -> GraphResult<Vec<PhaseRecord>> {
    records(src, "phase", |t| {
        expect_len(t, 9, "phase")?;
        Ok(PhaseRecord {
            node:      parse(t[0], "phase node")?,
            kind:      parse(t[1], "phase type")?,
            seq:       parse(t[2], "phase seq")?,
            red:       parse(t[3], "phase red")?,
            yellow:    parse(t[4], "phase yellow")?,
            green:     parse(t[5], "phase green")?,
            num_moves: parse(t[6], "phase num_moves")?,
            in_links:  parse_id_set(t[7])?,
            out_links: parse_id_set(t[8])?,
        })
    })
}

/// Read `paths.txt` records from any `Read` source.  The declared link count
/// is validated against the trailing ids at `Path` construction.
pub fn read_path_records<R: Read>(src: R) -> GraphResult<Vec<PathRecord>> {
    records(src, "path", |t| {
        if t.len() < 3 {
            return Err(GraphError::Parse(format!(
                "path record has {} fields, expected at least 3",
                t.len()
            )));
        }
        Ok(PathRecord {
            id:         parse(t[0], "path id")?,
            num_links:  parse(t[1], "path num_links")?,
            proportion: parse(t[2], "path proportion")?,
            links:      t[3..]
                .iter()
                .map(|tok| parse(tok, "path link id"))
                .collect::<GraphResult<Vec<u32>>>()?,
        })
    })
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Drive the csv reader over `src`, tokenize each data line, and map it
/// through `build`.  Blank lines are skipped; the header line is discarded by
/// the reader.
fn records<R, T, F>(src: R, what: &'static str, build: F) -> GraphResult<Vec<T>>
where
    R: Read,
    F: Fn(&[&str]) -> GraphResult<T>,
{
    // Space-delimited, flexible record lengths.  Runs of spaces produce empty
    // fields, filtered out below.
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b' ')
        .has_headers(true)
        .flexible(true)
        .from_reader(src);

    let mut out = Vec::new();
    for result in reader.records() {
        let record = result
            .map_err(|e| GraphError::Parse(format!("malformed {what} record: {e}")))?;
        let tokens: Vec<&str> = record
            .iter()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .collect();
        if tokens.is_empty() {
            continue;
        }
        out.push(build(&tokens)?);
    }
    Ok(out)
}

fn expect_len(tokens: &[&str], expected: usize, what: &str) -> GraphResult<()> {
    if tokens.len() != expected {
        return Err(GraphError::Parse(format!(
            "{what} record has {} fields, expected {expected}",
            tokens.len()
        )));
    }
    Ok(())
}

fn parse<T>(token: &str, what: &str) -> GraphResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    token
        .parse()
        .map_err(|e| GraphError::Parse(format!("invalid {what} {token:?}: {e}")))
}

/// Parse a brace-set field like `{3,17,42}` into link ids (input order kept).
fn parse_id_set(token: &str) -> GraphResult<Vec<u32>> {
    let inner = token
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .ok_or_else(|| {
            GraphError::Parse(format!("invalid link set {token:?}: expected {{id,…}}"))
        })?;
    inner
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| parse(s.trim(), "link set id"))
        .collect()
}
