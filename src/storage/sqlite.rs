//! SQLite storage backend for metadata statements

use super::traits::{validate, MetadataStore, OpenStore, StoreResult};
use crate::graph::{Iri, MetadataGraph, Term, Triple};
use rusqlite::{params, Connection, Transaction};
use std::path::Path;
use std::sync::Mutex;

/// SQLite-backed metadata store
///
/// One row per statement. Subject and object terms are stored as their
/// JSON encoding so the term kind (IRI, blank node, literal) survives a
/// round-trip; the encoding is deterministic, which lets the primary key
/// deduplicate statements. Thread-safe via internal mutex on the connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    fn init_schema(conn: &Connection) -> StoreResult<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS statements (
                subject TEXT NOT NULL,
                predicate TEXT NOT NULL,
                object TEXT NOT NULL,
                PRIMARY KEY (subject, predicate, object)
            );

            -- Reverse lookup for "which subjects point at this content URI"
            CREATE INDEX IF NOT EXISTS idx_statements_predicate_object
                ON statements(predicate, object);

            -- Blank-node context walks follow statements backwards
            CREATE INDEX IF NOT EXISTS idx_statements_object
                ON statements(object);

            -- Enable WAL mode for concurrent reads during writes
            PRAGMA journal_mode = WAL;
            "#,
        )?;
        Ok(())
    }

    fn encode(term: &Term) -> StoreResult<String> {
        Ok(serde_json::to_string(term)?)
    }

    fn row_to_triple(subject: String, predicate: String, object: String) -> StoreResult<Triple> {
        Ok(Triple {
            subject: serde_json::from_str(&subject)?,
            predicate: Iri::new(predicate),
            object: serde_json::from_str(&object)?,
        })
    }

    fn query_triples(
        conn: &Connection,
        sql: &str,
        args: &[&dyn rusqlite::ToSql],
    ) -> StoreResult<Vec<Triple>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(args, |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut triples = Vec::new();
        for row in rows {
            let (s, p, o) = row?;
            triples.push(Self::row_to_triple(s, p, o)?);
        }
        Ok(triples)
    }

    fn encode_graph(graph: &MetadataGraph) -> StoreResult<Vec<(String, &str, String)>> {
        let mut rows = Vec::with_capacity(graph.len());
        for triple in graph {
            validate(triple)?;
            rows.push((
                Self::encode(&triple.subject)?,
                triple.predicate.as_str(),
                Self::encode(&triple.object)?,
            ));
        }
        Ok(rows)
    }

    fn insert_rows(tx: &Transaction<'_>, rows: &[(String, &str, String)]) -> StoreResult<usize> {
        let mut stmt = tx.prepare(
            "INSERT OR IGNORE INTO statements (subject, predicate, object) VALUES (?1, ?2, ?3)",
        )?;
        let mut added = 0;
        for (subject, predicate, object) in rows {
            added += stmt.execute(params![subject, predicate, object])?;
        }
        Ok(added)
    }
}

impl OpenStore for SqliteStore {
    fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl MetadataStore for SqliteStore {
    fn subjects_with(&self, relation: &Iri, object: &Term) -> StoreResult<Vec<Term>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT DISTINCT subject FROM statements WHERE predicate = ?1 AND object = ?2",
        )?;
        let rows = stmt.query_map(params![relation.as_str(), Self::encode(object)?], |row| {
            row.get::<_, String>(0)
        })?;

        let mut subjects = Vec::new();
        for row in rows {
            subjects.push(serde_json::from_str(&row?)?);
        }
        Ok(subjects)
    }

    fn statements_with_subject(&self, subject: &Term) -> StoreResult<Vec<Triple>> {
        let conn = self.conn.lock().unwrap();
        let encoded = Self::encode(subject)?;
        Self::query_triples(
            &conn,
            "SELECT subject, predicate, object FROM statements WHERE subject = ?1",
            &[&encoded],
        )
    }

    fn statements_with_object(&self, object: &Term) -> StoreResult<Vec<Triple>> {
        let conn = self.conn.lock().unwrap();
        let encoded = Self::encode(object)?;
        Self::query_triples(
            &conn,
            "SELECT subject, predicate, object FROM statements WHERE object = ?1",
            &[&encoded],
        )
    }

    fn delete_statements_with_subject(&self, subject: &Term) -> StoreResult<usize> {
        let conn = self.conn.lock().unwrap();
        let removed = conn.execute(
            "DELETE FROM statements WHERE subject = ?1",
            params![Self::encode(subject)?],
        )?;
        Ok(removed)
    }

    fn add_all(&self, graph: &MetadataGraph) -> StoreResult<usize> {
        let rows = Self::encode_graph(graph)?;

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let added = Self::insert_rows(&tx, &rows)?;
        tx.commit()?;
        Ok(added)
    }

    fn replace_subgraph(
        &self,
        node: &Term,
        subjects: &[Term],
        graph: &MetadataGraph,
    ) -> StoreResult<(usize, usize)> {
        let rows = Self::encode_graph(graph)?;
        let mut doomed = Vec::with_capacity(subjects.len() + 1);
        doomed.push(Self::encode(node)?);
        for subject in subjects {
            doomed.push(Self::encode(subject)?);
        }

        let mut conn = self.conn.lock().unwrap();
        // Dropping the transaction on an early return rolls it back
        let tx = conn.transaction()?;
        let mut removed = 0;
        {
            let mut stmt = tx.prepare("DELETE FROM statements WHERE subject = ?1")?;
            for subject in &doomed {
                removed += stmt.execute(params![subject])?;
            }
        }
        let added = Self::insert_rows(&tx, &rows)?;
        tx.commit()?;
        Ok((removed, added))
    }

    fn len(&self) -> StoreResult<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM statements", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn triples(&self) -> StoreResult<MetadataGraph> {
        let conn = self.conn.lock().unwrap();
        let triples = Self::query_triples(
            &conn,
            "SELECT subject, predicate, object FROM statements",
            &[],
        )?;
        Ok(triples.into_iter().collect())
    }
}
