//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable that exercises `famtree_core` end to end.
//! - Keep output deterministic for quick local sanity checks.

use famtree_core::db::open_db_in_memory;
use famtree_core::{
    generation_label, AddPersonRequest, FamilyService, FamilyTreeNode, SqlitePersonRepository,
};

fn main() {
    if let Err(err) = run() {
        eprintln!("famtree smoke run failed: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("famtree_core version={}", famtree_core::core_version());

    let log_dir = std::env::temp_dir().join("famtree-logs");
    if let Err(err) = famtree_core::init_logging(
        famtree_core::default_log_level(),
        &log_dir.to_string_lossy(),
    ) {
        eprintln!("logging disabled: {err}");
    }

    let conn = open_db_in_memory()?;
    let repo = SqlitePersonRepository::try_new(&conn)?;
    let service = FamilyService::new(repo);

    let joseph = service.add_person(AddPersonRequest {
        name: "Joseph".to_string(),
        parent_id: None,
        birth_rank: Some(1),
        generation: 1,
    })?;
    service.add_person(AddPersonRequest {
        name: "Anne-Marie".to_string(),
        parent_id: None,
        birth_rank: Some(2),
        generation: 1,
    })?;
    let paul = service.add_person(AddPersonRequest {
        name: "Paul".to_string(),
        parent_id: Some(joseph.id.clone()),
        birth_rank: Some(1),
        generation: 2,
    })?;
    service.add_grandchild("Louise", &paul.id, 1)?;

    for root in service.build_family_tree()? {
        print_node(&root, 0);
    }

    Ok(())
}

fn print_node(node: &FamilyTreeNode, depth: usize) {
    println!(
        "{}{} ({})",
        "  ".repeat(depth),
        node.person.name,
        generation_label(node.person.generation, node.person.birth_rank)
    );
    for child in &node.children_nodes {
        print_node(child, depth + 1);
    }
}
