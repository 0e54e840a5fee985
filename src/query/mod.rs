// src/query/mod.rs
use crate::frame::{Frame, Value};
use anyhow::{bail, Context, Result};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, Params};
use tracing::warn;

/// Run one parametrized read and materialize the result.
///
/// Everything value-like the caller supplies must arrive through `params`;
/// the SQL text itself is a literal, except identifiers vetted by
/// [`checked_ident`].
pub fn run<P: Params>(conn: &Connection, sql: &str, params: P) -> Result<Frame> {
    let mut stmt = conn
        .prepare(sql)
        .with_context(|| format!("preparing query: {sql}"))?;
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let ncols = columns.len();
    let mut frame = Frame::new(columns);

    let mut rows = stmt.query(params).context("executing query")?;
    while let Some(row) = rows.next()? {
        let mut cells = Vec::with_capacity(ncols);
        for idx in 0..ncols {
            cells.push(match row.get_ref(idx)? {
                ValueRef::Null => Value::Null,
                ValueRef::Integer(i) => Value::Int(i),
                ValueRef::Real(f) => Value::Real(f),
                ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
                ValueRef::Blob(_) => {
                    warn!(column = %frame.columns()[idx], "blob cell in result; treated as NULL");
                    Value::Null
                }
            });
        }
        frame.push_row(cells)?;
    }
    Ok(frame)
}

/// Gate for identifiers that reach SQL text: `candidate` must be one of
/// `allowed`, or the query is refused before it is ever prepared.
pub fn checked_ident<'a>(candidate: &'a str, allowed: &[&str]) -> Result<&'a str> {
    if allowed.contains(&candidate) {
        Ok(candidate)
    } else {
        bail!(
            "column `{}` is not queryable here; allowed: {}",
            candidate,
            allowed.join(", ")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::parse_csv;
    use crate::store::{ensure_store, RefreshPolicy};
    use rusqlite::params;
    use tempfile::tempdir;

    fn mem_with_scores() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE scores (name TEXT, score REAL, note TEXT);
             INSERT INTO scores VALUES ('a', 1.5, NULL), ('b', 2.0, 'x'), ('c', -3.0, 'y');",
        )
        .unwrap();
        conn
    }

    #[test]
    fn materializes_types_and_nulls() {
        let conn = mem_with_scores();
        let frame = run(
            &conn,
            "SELECT name, score, note FROM scores ORDER BY name",
            [],
        )
        .unwrap();
        assert_eq!(frame.columns(), &["name", "score", "note"]);
        assert_eq!(frame.len(), 3);
        assert_eq!(frame.rows()[0][2], Value::Null);
        assert_eq!(frame.rows()[1][1], Value::Real(2.0));
    }

    #[test]
    fn bound_parameters_filter() {
        let conn = mem_with_scores();
        let frame = run(
            &conn,
            "SELECT name FROM scores WHERE score > ?1",
            params![1.6],
        )
        .unwrap();
        assert_eq!(frame.text_column("name").unwrap(), vec!["b"]);
    }

    #[test]
    fn threshold_is_strict() {
        // differential < -249 keeps -250 and excludes -249 itself.
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE album_ranks (clean_name TEXT, differential INTEGER);
             INSERT INTO album_ranks VALUES ('at the edge', -249), ('over it', -250);",
        )
        .unwrap();
        let frame = run(
            &conn,
            "SELECT clean_name FROM album_ranks WHERE differential < ?1",
            params![-249],
        )
        .unwrap();
        assert_eq!(frame.text_column("clean_name").unwrap(), vec!["over it"]);
    }

    #[test]
    fn ident_gate_accepts_only_the_allow_list() {
        let allowed = ["age", "bmi"];
        assert_eq!(checked_ident("bmi", &allowed).unwrap(), "bmi");
        let err = checked_ident("age; DROP TABLE diabetes", &allowed).unwrap_err();
        assert!(err.to_string().contains("not queryable"));
    }

    #[test]
    fn determinism_for_fixed_inputs() {
        let conn = mem_with_scores();
        let sql = "SELECT name, score FROM scores WHERE score > ?1 ORDER BY score DESC";
        let a = run(&conn, sql, params![0.0]).unwrap();
        let b = run(&conn, sql, params![0.0]).unwrap();
        assert_eq!(a.rows(), b.rows());
    }

    /// Ingest → group → threshold, end to end on a temp store.
    #[test]
    fn grouped_having_end_to_end() -> Result<()> {
        let dir = tempdir()?;
        let store = dir.path().join("counts.db");
        let ds = parse_csv(
            "mem://counts.csv",
            b"country,count\nX,100\nX,50\nY,50\n",
        )?;
        ensure_store(&store, &[("tallies", &ds)], RefreshPolicy::OnContentChange)?;

        let conn = crate::store::open(&store)?;
        let frame = run(
            &conn,
            "SELECT country, SUM(\"count\") AS country_count
             FROM tallies
             GROUP BY country
             HAVING country_count > ?1",
            params![99],
        )?;
        assert_eq!(frame.len(), 1);
        assert_eq!(frame.text_column("country")?, vec!["X"]);
        assert_eq!(frame.f64_column("country_count")?, vec![Some(150.0)]);
        Ok(())
    }
}
