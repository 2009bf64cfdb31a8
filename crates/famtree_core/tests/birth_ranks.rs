use famtree_core::db::open_db_in_memory;
use famtree_core::{
    AddPersonRequest, FamilyService, FamilyServiceError, Person, SqlitePersonRepository,
};

fn setup(conn: &rusqlite::Connection) -> FamilyService<SqlitePersonRepository<'_>> {
    FamilyService::new(SqlitePersonRepository::try_new(conn).unwrap())
}

fn add(
    service: &FamilyService<SqlitePersonRepository<'_>>,
    name: &str,
    parent_id: Option<&str>,
    birth_rank: Option<u32>,
    generation: u32,
) -> Result<Person, FamilyServiceError> {
    service.add_person(AddPersonRequest {
        name: name.to_string(),
        parent_id: parent_id.map(str::to_string),
        birth_rank,
        generation,
    })
}

#[test]
fn occupied_and_next_rank_round_trip() {
    let conn = open_db_in_memory().unwrap();
    let service = setup(&conn);

    let parent = add(&service, "Joseph", None, Some(1), 1).unwrap();
    add(&service, "Paul", Some(&parent.id), Some(3), 2).unwrap();

    let occupied = service.occupied_birth_ranks(&parent.id).unwrap();
    assert_eq!(occupied, vec![3]);

    let next = service.next_birth_rank(&parent.id).unwrap();
    assert!(!occupied.contains(&next));
    assert_eq!(next, 2);
}

#[test]
fn sequential_inserts_then_duplicate_rank_fails() {
    let conn = open_db_in_memory().unwrap();
    let service = setup(&conn);

    let parent = add(&service, "Joseph", None, None, 1).unwrap();
    add(&service, "Marie", Some(&parent.id), Some(1), 2).unwrap();
    add(&service, "Paul", Some(&parent.id), Some(2), 2).unwrap();

    let err = add(&service, "Jean", Some(&parent.id), Some(1), 2).unwrap_err();
    assert!(matches!(
        err,
        FamilyServiceError::DuplicateBirthRank { parent_id, birth_rank: 1 }
            if parent_id == parent.id
    ));

    assert_eq!(service.children_count(&parent.id).unwrap(), 2);
    assert_eq!(service.family_data().unwrap().len(), 3);
}

#[test]
fn duplicate_rank_creates_no_record() {
    let conn = open_db_in_memory().unwrap();
    let service = setup(&conn);

    let parent = add(&service, "Joseph", None, None, 1).unwrap();
    add(&service, "Marie", Some(&parent.id), Some(1), 2).unwrap();
    add(&service, "Jean", Some(&parent.id), Some(1), 2).unwrap_err();

    let names: Vec<String> = service
        .family_data()
        .unwrap()
        .into_iter()
        .map(|person| person.name)
        .collect();
    assert!(!names.contains(&"Jean".to_string()));
}

#[test]
fn next_rank_suggestion_skips_occupied_values() {
    let conn = open_db_in_memory().unwrap();
    let service = setup(&conn);

    let parent = add(&service, "Joseph", None, None, 1).unwrap();
    add(&service, "Marie", Some(&parent.id), Some(1), 2).unwrap();
    add(&service, "Jean", Some(&parent.id), Some(3), 2).unwrap();

    // Two siblings suggest rank 3, which is taken; the suggestion advances.
    let next = service.next_birth_rank(&parent.id).unwrap();
    assert_eq!(next, 4);
    assert!(!service
        .occupied_birth_ranks(&parent.id)
        .unwrap()
        .contains(&next));
}

#[test]
fn next_rank_for_childless_parent_is_one() {
    let conn = open_db_in_memory().unwrap();
    let service = setup(&conn);

    let parent = add(&service, "Joseph", None, None, 1).unwrap();
    assert_eq!(service.next_birth_rank(&parent.id).unwrap(), 1);
    assert!(service.occupied_birth_ranks(&parent.id).unwrap().is_empty());
}

#[test]
fn zero_birth_rank_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let service = setup(&conn);

    let parent = add(&service, "Joseph", None, None, 1).unwrap();
    let err = add(&service, "Paul", Some(&parent.id), Some(0), 2).unwrap_err();
    assert!(matches!(err, FamilyServiceError::InvalidBirthRank(0)));
}

#[test]
fn unranked_siblings_are_not_constrained() {
    let conn = open_db_in_memory().unwrap();
    let service = setup(&conn);

    let parent = add(&service, "Joseph", None, None, 1).unwrap();
    add(&service, "Marie", Some(&parent.id), None, 2).unwrap();
    add(&service, "Paul", Some(&parent.id), None, 2).unwrap();

    assert_eq!(service.children_count(&parent.id).unwrap(), 2);
}

#[test]
fn same_rank_under_different_parents_is_allowed() {
    let conn = open_db_in_memory().unwrap();
    let service = setup(&conn);

    let joseph = add(&service, "Joseph", None, Some(1), 1).unwrap();
    let anne_marie = add(&service, "Anne-Marie", None, Some(2), 1).unwrap();
    add(&service, "Paul", Some(&joseph.id), Some(1), 2).unwrap();
    add(&service, "Luc", Some(&anne_marie.id), Some(1), 2).unwrap();

    assert_eq!(service.children_count(&joseph.id).unwrap(), 1);
    assert_eq!(service.children_count(&anne_marie.id).unwrap(), 1);
}
