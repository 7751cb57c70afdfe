//! Public API tests for the sled store

use chrono::{Duration, Local};
use sentinel_core::{CameraSection, NewViolation, Role};
use sentinel_storage::{NewUser, SledStore, StorageError, UserStore, ViolationStore, WorkerFields, WorkerStore};
use std::sync::Arc;

#[tokio::test]
async fn test_concurrent_registration_single_winner() {
    let store = Arc::new(SledStore::temporary().unwrap());
    let mut handles = Vec::new();
    for i in 0..8 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store
                .create_user(NewUser {
                    email: "same@site.com".to_string(),
                    password_hash: format!("hash{}", i),
                    role: Role::Worker,
                })
                .await
        }));
    }

    let mut created = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(StorageError::AlreadyExists(_)) => conflicts += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
    assert_eq!(created, 1);
    assert_eq!(conflicts, 7);
}

#[tokio::test]
async fn test_violations_reflect_inserts_immediately() {
    let store = SledStore::temporary().unwrap();
    assert!(store.list_violations().await.unwrap().is_empty());

    let now = Local::now().naive_local();
    for (i, section) in [CameraSection::Machine, CameraSection::Gate].into_iter().enumerate() {
        store
            .insert_violation(&NewViolation {
                camera_section: section,
                detected_items: vec!["NO-Hardhat".to_string()],
                missing_items: vec!["Hardhat".to_string()],
                timestamp: now + Duration::seconds(i as i64 * 10),
                image_path: Some(format!("violations/{}.jpg", section)),
            })
            .await
            .unwrap();
    }

    let listed = store.list_violations().await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].camera_location, CameraSection::Gate);
    assert!(listed[0].timestamp >= listed[1].timestamp);
    assert_eq!(listed[1].image_path.as_deref(), Some("violations/machine.jpg"));
}

#[tokio::test]
async fn test_workers_listed_in_id_order() {
    let store = SledStore::temporary().unwrap();
    for name in ["Ana", "Ben", "Caro"] {
        store
            .create_worker(WorkerFields {
                name: name.to_string(),
                employee_id: format!("E-{}", name),
                ..Default::default()
            })
            .await
            .unwrap();
    }
    store.delete_worker(2).await.unwrap();

    let names: Vec<String> = store
        .list_workers()
        .await
        .unwrap()
        .into_iter()
        .map(|w| w.fields.name)
        .collect();
    assert_eq!(names, vec!["Ana", "Caro"]);
}
