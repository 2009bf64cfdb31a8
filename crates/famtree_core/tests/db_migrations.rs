use famtree_core::db::migrations::latest_version;
use famtree_core::db::open_db_in_memory;

fn table_columns(conn: &rusqlite::Connection, table: &str) -> Vec<String> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table});"))
        .unwrap();
    let mut rows = stmt.query([]).unwrap();
    let mut columns = Vec::new();
    while let Some(row) = rows.next().unwrap() {
        columns.push(row.get::<_, String>(1).unwrap());
    }
    columns
}

#[test]
fn migration_creates_persons_table_with_expected_columns() {
    let conn = open_db_in_memory().unwrap();

    let columns = table_columns(&conn, "persons");
    for column in [
        "id",
        "name",
        "generation",
        "parent_id",
        "birth_rank",
        "created_at",
    ] {
        assert!(columns.contains(&column.to_string()), "missing {column}");
    }
}

#[test]
fn user_version_matches_latest_migration() {
    let conn = open_db_in_memory().unwrap();
    let version: u32 = conn
        .query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(version, latest_version());
}

#[test]
fn reopening_a_migrated_database_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("family.sqlite3");

    let conn = famtree_core::db::open_db(&path).unwrap();
    conn.execute(
        "INSERT INTO persons (id, name, generation) VALUES ('p1', 'Joseph', 1);",
        [],
    )
    .unwrap();
    drop(conn);

    let reopened = famtree_core::db::open_db(&path).unwrap();
    let count: i64 = reopened
        .query_row("SELECT COUNT(*) FROM persons;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn unique_index_rejects_duplicate_sibling_rank() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO persons (id, name, generation) VALUES ('root', 'Joseph', 1);",
        [],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO persons (id, name, generation, parent_id, birth_rank)
         VALUES ('c1', 'Marie', 2, 'root', 1);",
        [],
    )
    .unwrap();

    let result = conn.execute(
        "INSERT INTO persons (id, name, generation, parent_id, birth_rank)
         VALUES ('c2', 'Jean', 2, 'root', 1);",
        [],
    );
    assert!(result.is_err());
}

#[test]
fn null_birth_ranks_are_not_constrained_by_the_index() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO persons (id, name, generation) VALUES ('root', 'Joseph', 1);",
        [],
    )
    .unwrap();
    for id in ["c1", "c2"] {
        conn.execute(
            "INSERT INTO persons (id, name, generation, parent_id)
             VALUES (?1, 'Enfant', 2, 'root');",
            [id],
        )
        .unwrap();
    }

    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM persons WHERE parent_id = 'root';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(count, 2);
}

#[test]
fn check_constraints_reject_non_positive_tiers() {
    let conn = open_db_in_memory().unwrap();

    let zero_generation = conn.execute(
        "INSERT INTO persons (id, name, generation) VALUES ('p1', 'Joseph', 0);",
        [],
    );
    assert!(zero_generation.is_err());

    let zero_rank = conn.execute(
        "INSERT INTO persons (id, name, generation, parent_id, birth_rank)
         VALUES ('p2', 'Paul', 2, 'p0', 0);",
        [],
    );
    assert!(zero_rank.is_err());
}
